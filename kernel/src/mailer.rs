use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::registration::Registration;

/// Outbound notifications about registrations.
///
/// Callers treat delivery as best-effort: an `Err` is logged, never surfaced
/// to the HTTP client.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn registration_received(&self, registration: &Registration) -> AppResult<()>;
    async fn registration_confirmed(&self, registration: &Registration) -> AppResult<()>;
}
