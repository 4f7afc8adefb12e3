use std::net::{Ipv4Addr, SocketAddr};

use adapter::database::{connect_database_with, monitor::spawn_health_monitor};
use anyhow::{Context, Result};
use api::route::api;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use kernel::model::{role::Role, user::event::CreateUser};
use registry::AppRegistry;
use shared::{
    config::{AdminSeedConfig, AppConfig},
    env::{which, Environment},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let pool = connect_database_with(&app_config.database)?;
    pool.migrate().await?;

    let registry = AppRegistry::new(pool.clone(), &app_config);
    if let Some(admin) = &app_config.admin {
        ensure_default_admin(&registry, admin).await?;
    }

    let monitor = spawn_health_monitor(pool.clone(), app_config.database.health_check_interval);

    let cors = CorsLayer::new()
        .allow_origin(
            app_config
                .server
                .public_base_url
                .parse::<HeaderValue>()
                .context("PUBLIC_BASE_URL is not a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .merge(api::routes())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(registry);

    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), app_config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(
                error.cause_chain = ?e,error.message = %e, "Unexpected error"
            )
        });

    monitor.abort();
    pool.close().await;
    tracing::info!("database pool closed");
    served
}

// ADMIN_PASSWORD が設定されている場合のみ、管理者ユーザーを作成する
async fn ensure_default_admin(registry: &AppRegistry, admin: &AdminSeedConfig) -> Result<()> {
    let users = registry.user_repository();
    if users.find_by_email(&admin.email).await?.is_some() {
        return Ok(());
    }

    users
        .create(CreateUser::new(
            "Administrador".into(),
            admin.email.clone(),
            admin.password.clone(),
            Role::Admin,
        ))
        .await?;
    tracing::info!(email = %admin.email, "default admin user created");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error.message = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error.message = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
