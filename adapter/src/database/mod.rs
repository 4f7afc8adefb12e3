use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use parking_lot::RwLock;
use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

pub mod model;
pub mod monitor;

struct PoolSettings {
    connect: PgConnectOptions,
    max_connections: u32,
}

impl PoolSettings {
    fn build(&self) -> PgPool {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(self.connect.clone())
    }
}

/// Handle to the PostgreSQL pool, owned by the process entry point and
/// injected into every repository. Clones share the same underlying pool, so
/// a `recycle` is observed by all of them.
#[derive(Clone)]
pub struct ConnectionPool {
    current: Arc<RwLock<PgPool>>,
    settings: Arc<PoolSettings>,
}

impl ConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        let settings = PoolSettings {
            connect: (*pool.connect_options()).clone(),
            max_connections: pool.options().get_max_connections(),
        };
        Self {
            current: Arc::new(RwLock::new(pool)),
            settings: Arc::new(settings),
        }
    }

    pub fn inner(&self) -> PgPool {
        self.current.read().clone()
    }

    pub async fn begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.inner().begin().await.map_err(AppError::TransactionError)
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.inner())
            .await
            .map(|_| ())
    }

    // 新しいプールに差し替え、古いプールは閉じる
    pub async fn recycle(&self) {
        let fresh = self.settings.build();
        let stale = std::mem::replace(&mut *self.current.write(), fresh);
        stale.close().await;
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../migrations")
            .run(&self.inner())
            .await
            .context("failed to run database migrations")
    }

    pub async fn close(&self) {
        self.inner().close().await;
    }
}

pub fn connect_database_with(cfg: &DatabaseConfig) -> anyhow::Result<ConnectionPool> {
    anyhow::ensure!(
        ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| cfg.url.starts_with(scheme)),
        "DATABASE_URL must use the postgres:// or postgresql:// scheme"
    );
    let connect = PgConnectOptions::from_str(&cfg.url).context("invalid DATABASE_URL")?;
    let settings = PoolSettings {
        connect,
        max_connections: cfg.max_connections,
    };
    let pool = settings.build();
    Ok(ConnectionPool {
        current: Arc::new(RwLock::new(pool)),
        settings: Arc::new(settings),
    })
}
