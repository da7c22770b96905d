use async_trait::async_trait;
use sqlx::PgPool;

use super::{map_write_error, search_pattern};
use crate::database::{AdminRepository, RepositoryError};
use crate::models::{AdminChanges, AdminUser, NewAdmin, Page};

const ADMIN_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at, deleted_at";

/// 管理员存储库
pub struct AdminOperation {
    db: PgPool,
}

impl AdminOperation {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminRepository for AdminOperation {
    async fn create(&self, admin: NewAdmin) -> Result<AdminUser, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO admin_users (username, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ADMIN_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(&admin.username)
            .bind(&admin.email)
            .bind(&admin.password_hash)
            .bind(admin.role)
            .bind(admin.is_active)
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, RepositoryError> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = $1 AND deleted_at IS NULL"
        );
        let admin = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(admin)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE username = $1 AND deleted_at IS NULL"
        );
        let admin = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(admin)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE email = $1 AND deleted_at IS NULL"
        );
        let admin = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(admin)
    }

    async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<AdminUser>, RepositoryError> {
        let pattern = search.map(search_pattern);
        let condition = "deleted_at IS NULL \
             AND ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1 OR role ILIKE $1)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM admin_users WHERE {condition}"
        ))
        .bind(pattern.as_deref())
        .fetch_one(&self.db)
        .await?;

        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE {condition} \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(pattern.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        Ok(Page { items, total })
    }

    async fn update(
        &self,
        id: i64,
        changes: &AdminChanges,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE admin_users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ADMIN_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .bind(changes.username.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.password_hash.as_deref())
            .bind(changes.role)
            .bind(changes.is_active)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)?;
        Ok(updated)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin_users SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
