use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::ConnectionPool;

/// Periodically pings the database and recycles the pool after a failed ping.
/// The returned handle is aborted by the entry point on shutdown.
pub fn spawn_health_monitor(pool: ConnectionPool, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初の tick は即時に返るので読み捨てる
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match pool.ping().await {
                Ok(()) => tracing::trace!("database ping ok"),
                Err(e) => {
                    tracing::warn!(error = %e, "database ping failed, recycling connection pool");
                    pool.recycle().await;
                }
            }
        }
    })
}
