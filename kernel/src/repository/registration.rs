use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::{EventId, RegistrationId, UserId},
    registration::{
        event::{CancelRegistration, CreateRegistration, UpdateRegistrationStatus},
        Registration,
    },
};

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    // イベントへの参加登録（重複・定員チェックを含めて一つのトランザクションで行う）
    async fn create(&self, event: CreateRegistration) -> AppResult<Registration>;
    // 自分の登録をキャンセルする
    async fn cancel(&self, event: CancelRegistration) -> AppResult<()>;
    // 状態遷移を検証したうえでステータスを更新する
    async fn update_status(&self, event: UpdateRegistrationStatus) -> AppResult<Registration>;
    async fn find_by_id(&self, registration_id: RegistrationId) -> AppResult<Option<Registration>>;
    async fn find_all(&self, event_id: Option<EventId>) -> AppResult<Vec<Registration>>;
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Registration>>;
}
