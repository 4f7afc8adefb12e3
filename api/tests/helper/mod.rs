use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use kernel::{
    mailer::Mailer,
    model::{
        auth::{AccessToken, Session, SessionUser},
        event::{
            event::{CreateEvent, DeleteEvent, UpdateEvent},
            Event, EventCapacity,
        },
        id::{EventId, RegistrationId, UserId},
        registration::{
            event::{CancelRegistration, CreateRegistration, UpdateRegistrationStatus},
            Registration, RegistrationEvent, RegistrationStatus,
        },
        role::{policy, Role},
        user::{
            event::{CreateUser, UpdateUserPassword, UpdateUserProfile, UpdateUserRole},
            EventCreator, RegistrationUser, User,
        },
    },
    repository::{
        auth::AuthRepository, event::EventRepository, health::HealthCheckRepository,
        registration::RegistrationRepository, user::UserRepository,
    },
};
use registry::{AppRegistry, RegistryParts};
use shared::{
    config::AuthConfig,
    error::{AppError, AppResult},
};
use tower::ServiceExt;

pub const PASSWORD: &str = "pa55word";

#[derive(Default)]
struct Store {
    users: Vec<(User, String)>,
    sessions: HashMap<String, UserId>,
    events: Vec<Event>,
    registrations: Vec<(Registration, EventId)>,
}

type SharedStore = Arc<Mutex<Store>>;

pub struct TestApp {
    router: Router,
    store: SharedStore,
    pub mails: Arc<AtomicUsize>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Vec<String>,
    pub body: serde_json::Value,
}

impl TestResponse {
    pub fn session_token(&self) -> Option<String> {
        self.set_cookie.iter().find_map(|c| {
            let pair = c.split(';').next()?;
            let value = pair.strip_prefix("auth-session=")?;
            (!value.is_empty()).then(|| value.to_string())
        })
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = SharedStore::default();
        let mails = Arc::new(AtomicUsize::new(0));
        let registry = AppRegistry::from_parts(RegistryParts {
            health_check_repository: Arc::new(FakeHealth),
            auth_repository: Arc::new(FakeAuth(store.clone())),
            user_repository: Arc::new(FakeUsers(store.clone())),
            event_repository: Arc::new(FakeEvents(store.clone())),
            registration_repository: Arc::new(FakeRegistrations(store.clone())),
            mailer: Arc::new(CountingMailer(mails.clone())),
            auth_config: AuthConfig {
                ttl: 86_400,
                secret: "test-secret".into(),
                secure_cookie: false,
            },
        });
        let router = Router::new()
            .merge(api::route::api::routes())
            .with_state(registry);
        Self {
            router,
            store,
            mails,
        }
    }

    pub fn add_user(&self, email: &str, role: Role) -> UserId {
        let user = User {
            user_id: UserId::new(),
            user_name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            role,
            phone: None,
            created_at: Utc::now(),
        };
        let user_id = user.user_id;
        self.store
            .lock()
            .unwrap()
            .users
            .push((user, PASSWORD.to_string()));
        user_id
    }

    pub fn add_event(&self, created_by: UserId, capacity: Option<i32>) -> EventId {
        let starts_at = Utc::now() + Duration::days(1);
        let event = Event {
            event_id: EventId::new(),
            title: "Feira".into(),
            location: "Praça".into(),
            starts_at,
            ends_at: starts_at + Duration::hours(2),
            description: String::new(),
            capacity,
            image_url: None,
            created_by: EventCreator {
                user_id: created_by,
                user_name: "creator".into(),
            },
            registered_count: 0,
            created_at: Utc::now(),
        };
        let event_id = event.event_id;
        self.store.lock().unwrap().events.push(event);
        event_id
    }

    pub fn role_of(&self, user_id: UserId) -> Option<Role> {
        let store = self.store.lock().unwrap();
        store
            .users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, _)| u.role)
    }

    pub fn registration_count(&self) -> usize {
        self.store.lock().unwrap().registrations.len()
    }

    pub async fn login(&self, email: &str) -> String {
        let res = self
            .request(
                "POST",
                "/api/login",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.session_token().expect("login sets a session cookie")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("auth-session={token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let set_cookie = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            set_cookie,
            body,
        }
    }
}

struct FakeHealth;

#[async_trait]
impl HealthCheckRepository for FakeHealth {
    async fn check_db(&self) -> bool {
        true
    }
}

struct CountingMailer(Arc<AtomicUsize>);

#[async_trait]
impl Mailer for CountingMailer {
    async fn registration_received(&self, _registration: &Registration) -> AppResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn registration_confirmed(&self, _registration: &Registration) -> AppResult<()> {
        // 送信失敗しても API は成功を返すことを確認するため
        Err(AppError::ExternalServiceError("mail API unavailable".into()))
    }
}

struct FakeAuth(SharedStore);

#[async_trait]
impl AuthRepository for FakeAuth {
    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId> {
        let store = self.0.lock().unwrap();
        store
            .users
            .iter()
            .find(|(u, p)| u.email.eq_ignore_ascii_case(email.trim()) && p == password)
            .map(|(u, _)| u.user_id)
            .ok_or(AppError::InvalidCredentials)
    }

    async fn create_session(&self, user_id: UserId) -> AppResult<Session> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.0
            .lock()
            .unwrap()
            .sessions
            .insert(token.clone(), user_id);
        Ok(Session {
            token: AccessToken(token),
            expires_at: Utc::now() + Duration::hours(24),
        })
    }

    async fn fetch_session_user(&self, token: &AccessToken) -> AppResult<Option<SessionUser>> {
        let store = self.0.lock().unwrap();
        let Some(user_id) = store.sessions.get(token.as_str()) else {
            return Ok(None);
        };
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.user_id == *user_id)
            .map(|(u, _)| SessionUser {
                token: token.clone(),
                expires_at: Utc::now() + Duration::hours(1),
                user: u.clone(),
            }))
    }

    async fn invalidate_session(&self, token: &AccessToken) -> AppResult<()> {
        self.0.lock().unwrap().sessions.remove(token.as_str());
        Ok(())
    }
}

// ロール・重複・定員の判定は adapter の #[sqlx::test] が実 SQL に対して検証する。
// ここのフェイクはハンドラ経路を通すための近似。
struct FakeUsers(SharedStore);

impl FakeUsers {
    fn find(&self, user_id: UserId) -> Option<User> {
        self.0
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, _)| u.clone())
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.find(current_user_id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let store = self.0.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, _)| u.clone()))
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let store = self.0.lock().unwrap();
        Ok(store.users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn create(&self, event: CreateUser) -> AppResult<User> {
        let mut store = self.0.lock().unwrap();
        let email = event.email.trim().to_lowercase();
        if store.users.iter().any(|(u, _)| u.email == email) {
            return Err(AppError::BadRequest("Email já registado".into()));
        }
        let user = User {
            user_id: UserId::new(),
            user_name: event.user_name,
            email,
            role: event.role,
            phone: None,
            created_at: Utc::now(),
        };
        store.users.push((user.clone(), event.password));
        Ok(user)
    }

    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<User> {
        let mut store = self.0.lock().unwrap();
        let (user, _) = store
            .users
            .iter_mut()
            .find(|(u, _)| u.user_id == event.user_id)
            .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;
        if let Some(name) = event.user_name {
            user.user_name = name;
        }
        if let Some(phone) = event.phone {
            user.phone = Some(phone);
        }
        Ok(user.clone())
    }

    async fn update_password(&self, event: UpdateUserPassword) -> AppResult<()> {
        let mut store = self.0.lock().unwrap();
        let (_, password) = store
            .users
            .iter_mut()
            .find(|(u, _)| u.user_id == event.user_id)
            .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;
        if *password != event.current_password {
            return Err(AppError::BadRequest("Senha atual incorreta".into()));
        }
        *password = event.new_password;
        Ok(())
    }

    async fn update_role(&self, event: UpdateUserRole) -> AppResult<()> {
        let actor = self.find(event.requested_by).ok_or(AppError::ForbiddenOperation)?;
        let target = self
            .find(event.user_id)
            .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;
        let is_self = event.user_id == event.requested_by;
        if !actor.role.has_at_least(policy::MANAGE_USERS_ROLE)
            || !actor.role.may_assign(is_self, target.role, event.role)
        {
            return Err(AppError::ForbiddenOperation);
        }
        let mut store = self.0.lock().unwrap();
        if let Some((user, _)) = store.users.iter_mut().find(|(u, _)| u.user_id == event.user_id) {
            user.role = event.role;
        }
        Ok(())
    }
}

struct FakeEvents(SharedStore);

#[async_trait]
impl EventRepository for FakeEvents {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let record = Event {
            event_id: EventId::new(),
            title: event.title,
            location: event.location,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            description: event.description,
            capacity: event.capacity,
            image_url: event.image_url,
            created_by: EventCreator {
                user_id: event.created_by,
                user_name: "creator".into(),
            },
            registered_count: 0,
            created_at: Utc::now(),
        };
        let event_id = record.event_id;
        self.0.lock().unwrap().events.push(record);
        Ok(event_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        Ok(self.0.lock().unwrap().events.clone())
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let store = self.0.lock().unwrap();
        Ok(store.events.iter().find(|e| e.event_id == event_id).cloned())
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        let mut store = self.0.lock().unwrap();
        let record = store
            .events
            .iter_mut()
            .find(|e| e.event_id == event.event_id)
            .ok_or_else(|| AppError::EntityNotFound("Evento não encontrado".into()))?;
        if let Some(title) = event.title {
            record.title = title;
        }
        if let Some(capacity) = event.capacity {
            record.capacity = capacity;
        }
        Ok(())
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        let mut store = self.0.lock().unwrap();
        let before = store.events.len();
        store.events.retain(|e| e.event_id != event.event_id);
        if store.events.len() == before {
            return Err(AppError::EntityNotFound("Evento não encontrado".into()));
        }
        Ok(())
    }

    async fn capacity(&self, event_id: EventId) -> AppResult<EventCapacity> {
        let store = self.0.lock().unwrap();
        let event = store
            .events
            .iter()
            .find(|e| e.event_id == event_id)
            .ok_or_else(|| AppError::EntityNotFound("Evento não encontrado".into()))?;
        let registered = store
            .registrations
            .iter()
            .filter(|(r, id)| *id == event_id && r.status.is_active())
            .count() as i64;
        Ok(EventCapacity {
            event_id,
            capacity: event.effective_capacity(),
            registered,
        })
    }
}

struct FakeRegistrations(SharedStore);

#[async_trait]
impl RegistrationRepository for FakeRegistrations {
    async fn create(&self, event: CreateRegistration) -> AppResult<Registration> {
        let mut store = self.0.lock().unwrap();
        let record = store
            .events
            .iter()
            .find(|e| e.event_id == event.event_id)
            .cloned()
            .ok_or_else(|| AppError::EntityNotFound("Evento não encontrado".into()))?;
        let user = store
            .users
            .iter()
            .find(|(u, _)| u.user_id == event.user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;

        if store
            .registrations
            .iter()
            .any(|(r, id)| *id == event.event_id && r.user.user_id == event.user_id)
        {
            return Err(AppError::BadRequest("Já está inscrito neste evento".into()));
        }
        let active = store
            .registrations
            .iter()
            .filter(|(r, id)| *id == event.event_id && r.status.is_active())
            .count() as i64;
        if active >= i64::from(record.effective_capacity()) {
            return Err(AppError::BadRequest("Evento lotado".into()));
        }

        let registration = Registration {
            registration_id: RegistrationId::new(),
            status: RegistrationStatus::Pending,
            created_at: Utc::now(),
            confirmed_at: None,
            user: RegistrationUser {
                user_id: user.user_id,
                user_name: user.user_name,
                email: user.email,
            },
            event: RegistrationEvent {
                event_id: record.event_id,
                title: record.title,
                location: record.location,
                starts_at: record.starts_at,
            },
        };
        store
            .registrations
            .push((registration.clone(), event.event_id));
        Ok(registration)
    }

    async fn cancel(&self, event: CancelRegistration) -> AppResult<()> {
        let mut store = self.0.lock().unwrap();
        let (registration, _) = store
            .registrations
            .iter_mut()
            .find(|(r, id)| {
                *id == event.event_id && r.user.user_id == event.user_id && r.status.is_active()
            })
            .ok_or_else(|| AppError::EntityNotFound("Inscrição não encontrada".into()))?;
        registration.status = match registration.status {
            RegistrationStatus::Pending => RegistrationStatus::Cancelled,
            _ => RegistrationStatus::Inativo,
        };
        Ok(())
    }

    async fn update_status(&self, event: UpdateRegistrationStatus) -> AppResult<Registration> {
        let mut store = self.0.lock().unwrap();
        let (registration, _) = store
            .registrations
            .iter_mut()
            .find(|(r, _)| r.registration_id == event.registration_id)
            .ok_or_else(|| AppError::EntityNotFound("Inscrição não encontrada".into()))?;
        if !registration.status.can_transition_to(event.status) {
            return Err(AppError::BadRequest("Transição de estado inválida".into()));
        }
        registration.status = event.status;
        if event.status == RegistrationStatus::Confirmed {
            registration.confirmed_at = Some(Utc::now());
        }
        Ok(registration.clone())
    }

    async fn find_by_id(&self, registration_id: RegistrationId) -> AppResult<Option<Registration>> {
        let store = self.0.lock().unwrap();
        Ok(store
            .registrations
            .iter()
            .find(|(r, _)| r.registration_id == registration_id)
            .map(|(r, _)| r.clone()))
    }

    async fn find_all(&self, event_id: Option<EventId>) -> AppResult<Vec<Registration>> {
        let store = self.0.lock().unwrap();
        Ok(store
            .registrations
            .iter()
            .filter(|(_, id)| event_id.map_or(true, |e| e == *id))
            .map(|(r, _)| r.clone())
            .collect())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Registration>> {
        let store = self.0.lock().unwrap();
        Ok(store
            .registrations
            .iter()
            .filter(|(r, _)| r.user.user_id == user_id)
            .map(|(r, _)| r.clone())
            .collect())
    }
}
