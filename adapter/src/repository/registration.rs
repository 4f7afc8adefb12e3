use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::DEFAULT_EVENT_CAPACITY,
    id::{EventId, RegistrationId, UserId},
    registration::{
        event::{CancelRegistration, CreateRegistration, UpdateRegistrationStatus},
        Registration,
    },
};
use kernel::repository::registration::RegistrationRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::registration::{RegistrationRow, RegistrationStateRow},
    ConnectionPool,
};

const SELECT_REGISTRATIONS: &str = r#"
    SELECT
        r.registration_id,
        r.status,
        r.created_at,
        r.confirmed_at,
        u.user_id,
        u.user_name,
        u.email,
        e.event_id,
        e.title,
        e.location,
        e.starts_at
    FROM registrations AS r
    INNER JOIN users AS u ON r.user_id = u.user_id
    INNER JOIN events AS e ON r.event_id = e.event_id
"#;

#[derive(new)]
pub struct RegistrationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl RegistrationRepository for RegistrationRepositoryImpl {
    async fn create(&self, event: CreateRegistration) -> AppResult<Registration> {
        let mut tx = self.db.begin().await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定のイベントが存在するか（行ロックを取り、同じイベントへの登録を直列化する）
        // - 同じユーザーの有効な登録が既に無いか
        // - 定員に達していないか
        let existing = {
            let capacity: Option<Option<i32>> =
                sqlx::query_scalar("SELECT capacity FROM events WHERE event_id = $1 FOR UPDATE")
                    .bind(event.event_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(AppError::SpecificOperationError)?;
            let Some(capacity) = capacity else {
                return Err(AppError::EntityNotFound("Evento não encontrado".into()));
            };

            let existing = sqlx::query_as::<_, RegistrationStateRow>(
                r#"
                    SELECT registration_id, status
                    FROM registrations
                    WHERE event_id = $1 AND user_id = $2
                "#,
            )
            .bind(event.event_id)
            .bind(event.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            if let Some(row) = &existing {
                if row.status()?.is_active() {
                    return Err(AppError::BadRequest("Já está inscrito neste evento".into()));
                }
            }

            let registered: i64 = sqlx::query_scalar(
                r#"
                    SELECT COUNT(*)
                    FROM registrations
                    WHERE event_id = $1
                      AND status IN ('pending', 'confirmed')
                "#,
            )
            .bind(event.event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let capacity = capacity.unwrap_or(DEFAULT_EVENT_CAPACITY);
            if registered >= i64::from(capacity) {
                return Err(AppError::BadRequest("Evento lotado".into()));
            }

            existing
        };

        // キャンセル済み・無効の登録があれば pending に戻し、無ければ新規作成する
        let registration_id = match existing {
            Some(row) => {
                sqlx::query(
                    r#"
                        UPDATE registrations
                        SET status = 'pending', created_at = NOW(), confirmed_at = NULL
                        WHERE registration_id = $1
                    "#,
                )
                .bind(row.registration_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::SpecificOperationError)?;
                row.registration_id
            }
            None => {
                let registration_id = RegistrationId::new();
                let res = sqlx::query(
                    r#"
                        INSERT INTO registrations (registration_id, event_id, user_id, status)
                        VALUES ($1, $2, $3, 'pending')
                        ON CONFLICT (event_id, user_id) DO NOTHING
                    "#,
                )
                .bind(registration_id)
                .bind(event.event_id)
                .bind(event.user_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::SpecificOperationError)?;

                if res.rows_affected() < 1 {
                    return Err(AppError::BadRequest("Já está inscrito neste evento".into()));
                }
                registration_id
            }
        };

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            %registration_id,
            event_id = %event.event_id,
            user_id = %event.user_id,
            "registration created"
        );
        self.find_by_id(registration_id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound("Inscrição não encontrada".into()))
    }

    async fn cancel(&self, event: CancelRegistration) -> AppResult<()> {
        // pending は cancelled に、confirmed は inativo に遷移させる
        let res = sqlx::query(
            r#"
                UPDATE registrations
                SET status = CASE WHEN status = 'pending' THEN 'cancelled' ELSE 'inativo' END
                WHERE event_id = $1
                  AND user_id = $2
                  AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(event.event_id)
        .bind(event.user_id)
        .execute(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound("Inscrição não encontrada".into()));
        }
        Ok(())
    }

    async fn update_status(&self, event: UpdateRegistrationStatus) -> AppResult<Registration> {
        let mut tx = self.db.begin().await?;

        {
            let current = sqlx::query_as::<_, RegistrationStateRow>(
                r#"
                    SELECT registration_id, status
                    FROM registrations
                    WHERE registration_id = $1
                    FOR UPDATE
                "#,
            )
            .bind(event.registration_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?
            .ok_or_else(|| AppError::EntityNotFound("Inscrição não encontrada".into()))?;

            let from = current.status()?;
            if !from.can_transition_to(event.status) {
                return Err(AppError::BadRequest(format!(
                    "Transição de estado inválida: {from} → {}",
                    event.status
                )));
            }
        }

        sqlx::query(
            r#"
                UPDATE registrations
                SET
                    status = $2,
                    confirmed_at = CASE WHEN $2 = 'confirmed' THEN NOW() ELSE confirmed_at END
                WHERE registration_id = $1
            "#,
        )
        .bind(event.registration_id)
        .bind(event.status.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            registration_id = %event.registration_id,
            status = %event.status,
            requested_by = %event.requested_by,
            "registration status updated"
        );
        self.find_by_id(event.registration_id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound("Inscrição não encontrada".into()))
    }

    async fn find_by_id(&self, registration_id: RegistrationId) -> AppResult<Option<Registration>> {
        let sql = format!("{SELECT_REGISTRATIONS} WHERE r.registration_id = $1");
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration_id)
            .fetch_optional(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?
            .map(Registration::try_from)
            .transpose()
    }

    async fn find_all(&self, event_id: Option<EventId>) -> AppResult<Vec<Registration>> {
        let sql = format!(
            "{SELECT_REGISTRATIONS} WHERE ($1::uuid IS NULL OR r.event_id = $1) ORDER BY r.created_at ASC"
        );
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(event_id)
            .fetch_all(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?
            .into_iter()
            .map(Registration::try_from)
            .collect()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Registration>> {
        let sql = format!("{SELECT_REGISTRATIONS} WHERE r.user_id = $1 ORDER BY e.starts_at ASC");
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?
            .into_iter()
            .map(Registration::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    // 重複登録と定員の規則はここで実 DB に対して検証する。
    // api/tests のフェイクは同じ規則を真似ているだけなので、こちらが正となる。
    use super::*;
    use crate::repository::{event::EventRepositoryImpl, user::UserRepositoryImpl};
    use chrono::{Duration, Utc};
    use kernel::model::{
        event::event::CreateEvent, registration::RegistrationStatus, role::Role,
        user::event::CreateUser,
    };
    use kernel::repository::{event::EventRepository, user::UserRepository};

    async fn fixture(db: &ConnectionPool, capacity: Option<i32>) -> anyhow::Result<(UserId, EventId)> {
        let users = UserRepositoryImpl::new(db.clone());
        let coord = users
            .create(CreateUser::new(
                "Coord".into(),
                "coord@example.com".into(),
                "pa55word".into(),
                Role::Coord,
            ))
            .await?;
        let starts_at = Utc::now() + Duration::days(3);
        let event_id = EventRepositoryImpl::new(db.clone())
            .create(CreateEvent::new(
                "Workshop".into(),
                "Sala 1".into(),
                starts_at,
                starts_at + Duration::hours(1),
                "".into(),
                capacity,
                None,
                coord.user_id,
            ))
            .await?;
        Ok((coord.user_id, event_id))
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn registering_twice_keeps_a_single_active_row(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool.clone());
        let (user_id, event_id) = fixture(&db, None).await?;
        let repo = RegistrationRepositoryImpl::new(db);

        let first = repo.create(CreateRegistration::new(event_id, user_id)).await?;
        assert_eq!(first.status, RegistrationStatus::Pending);

        let second = repo.create(CreateRegistration::new(event_id, user_id)).await;
        assert!(matches!(second, Err(AppError::BadRequest(_))));

        // キャンセル後は同じ行が pending に戻る
        repo.cancel(CancelRegistration::new(event_id, user_id)).await?;
        let again = repo.create(CreateRegistration::new(event_id, user_id)).await?;
        assert_eq!(again.registration_id, first.registration_id);
        assert_eq!(again.status, RegistrationStatus::Pending);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn concurrent_registrations_do_not_duplicate(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool.clone());
        let (user_id, event_id) = fixture(&db, None).await?;
        let repo = std::sync::Arc::new(RegistrationRepositoryImpl::new(db));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(CreateRegistration::new(event_id, user_id)).await
                })
            })
            .collect();
        let mut ok = 0;
        for handle in handles {
            if handle.await?.is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn full_event_rejects_registration(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let (coord_id, event_id) = fixture(&db, Some(1)).await?;
        let other = UserRepositoryImpl::new(db.clone())
            .create(CreateUser::new(
                "User".into(),
                "user@example.com".into(),
                "pa55word".into(),
                Role::User,
            ))
            .await?;
        let repo = RegistrationRepositoryImpl::new(db);

        repo.create(CreateRegistration::new(event_id, coord_id)).await?;
        let res = repo.create(CreateRegistration::new(event_id, other.user_id)).await;
        assert!(matches!(res, Err(AppError::BadRequest(msg)) if msg == "Evento lotado"));
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn status_transitions_are_validated(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let db = ConnectionPool::new(pool);
        let (user_id, event_id) = fixture(&db, None).await?;
        let repo = RegistrationRepositoryImpl::new(db);
        let reg = repo.create(CreateRegistration::new(event_id, user_id)).await?;

        let confirmed = repo
            .update_status(UpdateRegistrationStatus::new(
                reg.registration_id,
                RegistrationStatus::Confirmed,
                user_id,
            ))
            .await?;
        assert_eq!(confirmed.status, RegistrationStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());

        let back = repo
            .update_status(UpdateRegistrationStatus::new(
                reg.registration_id,
                RegistrationStatus::Pending,
                user_id,
            ))
            .await;
        assert!(matches!(back, Err(AppError::BadRequest(_))));

        assert_eq!(repo.find_all(Some(event_id)).await?.len(), 1);
        assert_eq!(repo.find_all(None).await?.len(), 1);
        assert_eq!(repo.find_by_user_id(user_id).await?.len(), 1);
        Ok(())
    }
}
