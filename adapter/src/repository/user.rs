use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::UserId,
    role::{policy, Role},
    user::{
        event::{CreateUser, UpdateUserPassword, UpdateUserProfile, UpdateUserRole},
        User,
    },
};
use kernel::repository::user::UserRepository;
use shared::error::{AppError, AppResult};
use strum::VariantNames;

use crate::{
    credential::{hash_password, verify_password},
    database::{
        model::user::{UserCredentialRow, UserRow},
        ConnectionPool,
    },
};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role, phone, created_at
                FROM users
                WHERE user_id = $1
            "#,
        )
        .bind(current_user_id)
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role, phone, created_at
                FROM users
                WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role, phone, created_at
                FROM users
                ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn create(&self, event: CreateUser) -> AppResult<User> {
        let user_id = UserId::new();
        let hashed_password = hash_password(&event.password)?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
                INSERT INTO users (user_id, user_name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING user_id, user_name, email, role, phone, created_at
            "#,
        )
        .bind(user_id)
        .bind(event.user_name.trim())
        .bind(normalize_email(&event.email))
        .bind(hashed_password)
        .bind(event.role.as_ref())
        .fetch_one(&self.db.inner())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::BadRequest("Email já registado".into())
            }
            e => AppError::SpecificOperationError(e),
        })?;

        tracing::info!(%user_id, role = %event.role, "user created");
        User::try_from(row)
    }

    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(
            r#"
                UPDATE users
                SET
                    user_name = COALESCE($2, user_name),
                    phone = COALESCE($3, phone),
                    updated_at = NOW()
                WHERE user_id = $1
                RETURNING user_id, user_name, email, role, phone, created_at
            "#,
        )
        .bind(event.user_id)
        .bind(event.user_name)
        .bind(event.phone)
        .fetch_optional(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?
        .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))
        .and_then(User::try_from)
    }

    async fn update_password(&self, event: UpdateUserPassword) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let original = sqlx::query_as::<_, UserCredentialRow>(
            r#"
                SELECT user_id, email, password_hash
                FROM users
                WHERE user_id = $1
                FOR UPDATE
            "#,
        )
        .bind(event.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?
        .ok_or_else(|| AppError::EntityNotFound("Utilizador não encontrado".into()))?;

        // 現在のパスワードが違う場合はセッションを失効させないよう 400 を返す
        verify_password(&event.current_password, &original.password_hash).map_err(|e| match e {
            AppError::InvalidCredentials => AppError::BadRequest("Senha atual incorreta".into()),
            e => e,
        })?;

        let new_hash = hash_password(&event.new_password)?;
        sqlx::query(
            r#"
                UPDATE users
                SET password_hash = $2, updated_at = NOW()
                WHERE user_id = $1
            "#,
        )
        .bind(event.user_id)
        .bind(new_hash)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn update_role(&self, event: UpdateUserRole) -> AppResult<()> {
        // 権限チェックと更新を一つの UPDATE 文で行う。
        // - 実行者の現在のロールが管理権限を満たしていること
        // - 自分より上位のロールは付与できないこと
        // - 自分より上位のユーザーのロールは変更できないこと
        // - 自分自身のロール変更は最上位ロールのみ可能
        let res = sqlx::query(
            r#"
                UPDATE users AS target
                SET role = $3, updated_at = NOW()
                FROM users AS actor
                WHERE target.user_id = $1
                  AND actor.user_id = $2
                  AND array_position($4::text[], actor.role::text) >= array_position($4::text[], $5::text)
                  AND array_position($4::text[], actor.role::text) >= array_position($4::text[], $3::text)
                  AND array_position($4::text[], actor.role::text) >= array_position($4::text[], target.role::text)
                  AND (actor.role = $6 OR actor.user_id <> target.user_id)
            "#,
        )
        .bind(event.user_id)
        .bind(event.requested_by)
        .bind(event.role.as_ref())
        .bind(Role::VARIANTS.iter().map(|r| r.to_string()).collect::<Vec<_>>())
        .bind(policy::MANAGE_USERS_ROLE.as_ref())
        .bind(Role::TOP.as_ref())
        .execute(&self.db.inner())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() > 0 {
            tracing::info!(
                user_id = %event.user_id,
                requested_by = %event.requested_by,
                role = %event.role,
                "user role updated"
            );
            return Ok(());
        }

        match self.find_current_user(event.user_id).await? {
            None => Err(AppError::EntityNotFound("Utilizador não encontrado".into())),
            Some(_) => Err(AppError::ForbiddenOperation),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    // ロール変更の規則は UPDATE 文の中で判定されるため、ここでの検証が正となる
    use super::*;

    async fn create_user(repo: &UserRepositoryImpl, email: &str, role: Role) -> User {
        repo.create(CreateUser::new(
            email.into(),
            email.into(),
            "pa55word".into(),
            role,
        ))
        .await
        .unwrap()
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Foo@Example.COM "), "foo@example.com");
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn duplicate_email_is_rejected(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = UserRepositoryImpl::new(ConnectionPool::new(pool));
        create_user(&repo, "dup@example.com", Role::User).await;

        let res = repo
            .create(CreateUser::new(
                "Other".into(),
                "DUP@example.com".into(),
                "x".into(),
                Role::User,
            ))
            .await;
        assert!(matches!(res, Err(AppError::BadRequest(_))));
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn role_update_rules(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = UserRepositoryImpl::new(ConnectionPool::new(pool));
        let admin = create_user(&repo, "admin@example.com", Role::Admin).await;
        let concelho = create_user(&repo, "concelho@example.com", Role::Concelho).await;
        let coord = create_user(&repo, "coord@example.com", Role::Coord).await;
        let user = create_user(&repo, "user@example.com", Role::User).await;

        // COORD は自分のロールを変更できない
        let res = repo
            .update_role(UpdateUserRole::new(coord.user_id, Role::Admin, coord.user_id))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        // CONCELHO は自分より上位のロールを付与できない
        let res = repo
            .update_role(UpdateUserRole::new(user.user_id, Role::Admin, concelho.user_id))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        repo.update_role(UpdateUserRole::new(user.user_id, Role::Staff, concelho.user_id))
            .await?;
        let updated = repo.find_current_user(user.user_id).await?.unwrap();
        assert_eq!(updated.role, Role::Staff);

        // CONCELHO は ADMIN を降格できない
        let res = repo
            .update_role(UpdateUserRole::new(admin.user_id, Role::User, concelho.user_id))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));
        let unchanged = repo.find_current_user(admin.user_id).await?.unwrap();
        assert_eq!(unchanged.role, Role::Admin);

        // ADMIN は自分自身のロールも変更できる
        repo.update_role(UpdateUserRole::new(admin.user_id, Role::Concelho, admin.user_id))
            .await?;

        let res = repo
            .update_role(UpdateUserRole::new(UserId::new(), Role::User, concelho.user_id))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn password_change_requires_current_password(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = UserRepositoryImpl::new(ConnectionPool::new(pool));
        let user = create_user(&repo, "pw@example.com", Role::User).await;

        let res = repo
            .update_password(UpdateUserPassword::new(
                user.user_id,
                "wrong".into(),
                "new-pass".into(),
            ))
            .await;
        assert!(matches!(res, Err(AppError::BadRequest(_))));

        repo.update_password(UpdateUserPassword::new(
            user.user_id,
            "pa55word".into(),
            "new-pass".into(),
        ))
        .await?;
        Ok(())
    }
}
