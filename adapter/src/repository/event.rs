use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event, EventCapacity,
    },
    id::EventId,
};
use kernel::repository::event::EventRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::event::{EventCapacityRow, EventRow, EventScheduleRow},
    ConnectionPool,
};

const SELECT_EVENTS: &str = r#"
    SELECT
        e.event_id,
        e.title,
        e.location,
        e.starts_at,
        e.ends_at,
        e.description,
        e.capacity,
        e.image_url,
        e.created_by,
        u.user_name AS creator_name,
        (
            SELECT COUNT(*)
            FROM registrations AS r
            WHERE r.event_id = e.event_id
              AND r.status IN ('pending', 'confirmed')
        ) AS registered_count,
        e.created_at
    FROM events AS e
    INNER JOIN users AS u ON e.created_by = u.user_id
"#;

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let event_id = EventId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO events
                (event_id, title, location, starts_at, ends_at,
                description, capacity, image_url, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event_id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.description)
        .bind(event.capacity)
        .bind(&event.image_url)
        .bind(event.created_by)
        .execute(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been created".into(),
            ));
        }

        tracing::info!(%event_id, created_by = %event.created_by, "event created");
        Ok(event_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let sql = format!("{SELECT_EVENTS} ORDER BY e.starts_at ASC");
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .fetch_all(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let sql = format!("{SELECT_EVENTS} WHERE e.event_id = $1");
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(event_id)
            .fetch_optional(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Event::from))
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // 部分更新後に開始・終了日時が逆転しないかを確認する
        {
            let current = sqlx::query_as::<_, EventScheduleRow>(
                r#"
                    SELECT starts_at, ends_at
                    FROM events
                    WHERE event_id = $1
                    FOR UPDATE
                "#,
            )
            .bind(event.event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?
            .ok_or_else(|| AppError::EntityNotFound("Evento não encontrado".into()))?;

            let starts_at = event.starts_at.unwrap_or(current.starts_at);
            let ends_at = event.ends_at.unwrap_or(current.ends_at);
            if ends_at < starts_at {
                return Err(AppError::BadRequest(
                    "A data de fim deve ser posterior à data de início".into(),
                ));
            }
        }

        let res = sqlx::query(
            r#"
                UPDATE events
                SET
                    title = COALESCE($2, title),
                    location = COALESCE($3, location),
                    starts_at = COALESCE($4, starts_at),
                    ends_at = COALESCE($5, ends_at),
                    description = COALESCE($6, description),
                    capacity = CASE WHEN $9 THEN $7 ELSE capacity END,
                    image_url = COALESCE($8, image_url),
                    updated_at = NOW()
                WHERE event_id = $1
            "#,
        )
        .bind(event.event_id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.description)
        .bind(event.capacity.flatten())
        .bind(&event.image_url)
        .bind(event.capacity.is_some())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(event_id = %event.event_id, requested_by = %event.requested_by, "event updated");
        Ok(())
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        // 参加登録は外部キーの ON DELETE CASCADE で一緒に削除される
        let res = sqlx::query("DELETE FROM events WHERE event_id = $1")
            .bind(event.event_id)
            .execute(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound("Evento não encontrado".into()));
        }

        tracing::info!(event_id = %event.event_id, requested_by = %event.requested_by, "event deleted");
        Ok(())
    }

    async fn capacity(&self, event_id: EventId) -> AppResult<EventCapacity> {
        sqlx::query_as::<_, EventCapacityRow>(
            r#"
                SELECT
                    e.event_id,
                    e.capacity,
                    (
                        SELECT COUNT(*)
                        FROM registrations AS r
                        WHERE r.event_id = e.event_id
                          AND r.status IN ('pending', 'confirmed')
                    ) AS registered
                FROM events AS e
                WHERE e.event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(EventCapacity::from)
        .ok_or_else(|| AppError::EntityNotFound("Evento não encontrado".into()))
    }
}
