use async_trait::async_trait;
use chrono::{Duration, Utc};
use derive_new::new;
use kernel::model::{
    auth::{AccessToken, Session, SessionUser},
    id::UserId,
};
use kernel::repository::auth::AuthRepository;
use shared::error::{AppError, AppResult};

use crate::{
    credential::{generate_session_token, verify_password},
    database::{
        model::{auth::SessionUserRow, user::UserCredentialRow},
        ConnectionPool,
    },
};

#[derive(new)]
pub struct AuthRepositoryImpl {
    db: ConnectionPool,
    secret: String,
    ttl: u64,
}

#[async_trait]
impl AuthRepository for AuthRepositoryImpl {
    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId> {
        let row = self.find_credential_by_email(email).await?;
        // メールアドレスが存在しない場合もパスワード不一致と同じエラーを返す
        let Some(row) = row else {
            return Err(AppError::InvalidCredentials);
        };
        verify_password(password, &row.password_hash)?;
        Ok(row.user_id)
    }

    async fn create_session(&self, user_id: UserId) -> AppResult<Session> {
        let credential = sqlx::query_as::<_, UserCredentialRow>(
            r#"
                SELECT user_id, email, password_hash
                FROM users
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;

        let now = Utc::now();
        let ttl = i64::try_from(self.ttl)
            .map_err(|_| AppError::ConversionEntityError("AUTH_TOKEN_TTL is too large".into()))?;
        let expires_at = now + Duration::seconds(ttl);
        let token = generate_session_token(
            &self.secret,
            &credential.email,
            &credential.password_hash,
            now,
        )?;

        let res = sqlx::query(
            r#"
                INSERT INTO sessions (token, user_id, valid, expires_at, created_at)
                VALUES ($1, $2, TRUE, $3, $4)
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No session record has been created".into(),
            ));
        }

        tracing::info!(%user_id, %expires_at, "session issued");
        Ok(Session {
            token: AccessToken(token),
            expires_at,
        })
    }

    async fn fetch_session_user(&self, token: &AccessToken) -> AppResult<Option<SessionUser>> {
        sqlx::query_as::<_, SessionUserRow>(
            r#"
                SELECT
                    s.token,
                    s.expires_at,
                    u.user_id,
                    u.user_name,
                    u.email,
                    u.role,
                    u.phone,
                    u.created_at
                FROM sessions AS s
                INNER JOIN users AS u ON s.user_id = u.user_id
                WHERE s.token = $1
                  AND s.valid
                  AND s.expires_at > NOW()
                ORDER BY s.created_at DESC
                LIMIT 1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(SessionUser::try_from)
        .transpose()
    }

    async fn invalidate_session(&self, token: &AccessToken) -> AppResult<()> {
        let res = sqlx::query("UPDATE sessions SET valid = FALSE WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.db.inner())
            .await
            .map_err(AppError::SpecificOperationError)?;
        tracing::debug!(rows = res.rows_affected(), "session invalidated");
        Ok(())
    }
}

impl AuthRepositoryImpl {
    async fn find_credential_by_email(&self, email: &str) -> AppResult<Option<UserCredentialRow>> {
        sqlx::query_as::<_, UserCredentialRow>(
            r#"
                SELECT user_id, email, password_hash
                FROM users
                WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)
    }
}
