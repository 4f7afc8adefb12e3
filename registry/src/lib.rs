use std::sync::Arc;

use adapter::{
    database::ConnectionPool,
    mailer::HttpMailer,
    repository::{
        auth::AuthRepositoryImpl, event::EventRepositoryImpl, health::HealthCheckRepositoryImpl,
        registration::RegistrationRepositoryImpl, user::UserRepositoryImpl,
    },
};
use kernel::mailer::Mailer;
use kernel::repository::{
    auth::AuthRepository, event::EventRepository, health::HealthCheckRepository,
    registration::RegistrationRepository, user::UserRepository,
};
use shared::config::{AppConfig, AuthConfig};

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    user_repository: Arc<dyn UserRepository>,
    event_repository: Arc<dyn EventRepository>,
    registration_repository: Arc<dyn RegistrationRepository>,
    mailer: Arc<dyn Mailer>,
    auth_config: Arc<AuthConfig>,
}

/// Individual components for wiring an [`AppRegistry`] by hand.
pub struct RegistryParts {
    pub health_check_repository: Arc<dyn HealthCheckRepository>,
    pub auth_repository: Arc<dyn AuthRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub event_repository: Arc<dyn EventRepository>,
    pub registration_repository: Arc<dyn RegistrationRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub auth_config: AuthConfig,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: &AppConfig) -> Self {
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            app_config.auth.secret.clone(),
            app_config.auth.ttl,
        ));
        Self::from_parts(RegistryParts {
            health_check_repository: Arc::new(HealthCheckRepositoryImpl::new(pool.clone())),
            auth_repository,
            user_repository: Arc::new(UserRepositoryImpl::new(pool.clone())),
            event_repository: Arc::new(EventRepositoryImpl::new(pool.clone())),
            registration_repository: Arc::new(RegistrationRepositoryImpl::new(pool)),
            mailer: Arc::new(HttpMailer::new(app_config.mail.clone())),
            auth_config: app_config.auth.clone(),
        })
    }

    pub fn from_parts(parts: RegistryParts) -> Self {
        Self {
            health_check_repository: parts.health_check_repository,
            auth_repository: parts.auth_repository,
            user_repository: parts.user_repository,
            event_repository: parts.event_repository,
            registration_repository: parts.registration_repository,
            mailer: parts.mailer,
            auth_config: Arc::new(parts.auth_config),
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    pub fn event_repository(&self) -> Arc<dyn EventRepository> {
        self.event_repository.clone()
    }

    pub fn registration_repository(&self) -> Arc<dyn RegistrationRepository> {
        self.registration_repository.clone()
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.mailer.clone()
    }

    pub fn auth_config(&self) -> Arc<AuthConfig> {
        self.auth_config.clone()
    }
}
