use std::sync::Arc;

use crate::config::DefaultAdmin;
use crate::database::AdminRepository;
use crate::error::AppError;
use crate::models::{
    AdminChanges, AdminRole, AdminUpdate, AdminUser, CreateAdmin, NewAdmin, Page, PageRequest,
};
use crate::utils::validation::normalize_email;
use crate::utils::{PasswordVerifier, hash_password};

#[derive(Clone)]
pub struct AdminService {
    repo: Arc<dyn AdminRepository>,
    bcrypt_cost: u32,
    verifier: PasswordVerifier,
}

impl AdminService {
    pub fn new(repo: Arc<dyn AdminRepository>, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            bcrypt_cost,
            verifier: PasswordVerifier::new(bcrypt_cost),
        }
    }

    /// 用户名或邮箱登录；未激活账户在密码校验通过后才被拒绝
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<AdminUser, AppError> {
        let login = login.trim();
        let mut admin = self.repo.find_by_username(login).await?;
        if admin.is_none() && login.contains('@') {
            admin = self.repo.find_by_email(&normalize_email(login)).await?;
        }
        let hash = admin.as_ref().map(|a| a.password_hash.as_str());
        let admin = match (self.verifier.verify(password, hash)?, admin) {
            (true, Some(admin)) => admin,
            _ => return Err(AppError::InvalidCredentials),
        };
        if !admin.is_active {
            return Err(AppError::Forbidden("admin account is inactive".into()));
        }
        Ok(admin)
    }

    pub async fn create(&self, req: CreateAdmin) -> Result<AdminUser, AppError> {
        req.validate()?;
        let username = req.username.trim().to_string();
        let email = normalize_email(&req.email);
        self.ensure_unique(None, Some(&username), Some(&email)).await?;

        let admin = self
            .repo
            .create(NewAdmin {
                username,
                email,
                password_hash: hash_password(&req.password, self.bcrypt_cost)?,
                role: req.role.unwrap_or_default(),
                is_active: req.is_active.unwrap_or(true),
            })
            .await?;

        tracing::info!("Created admin {} ({})", admin.id, admin.role.as_str());
        Ok(admin)
    }

    pub async fn get(&self, id: i64) -> Result<AdminUser, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("admin not found".into()))
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Page<AdminUser>, AppError> {
        Ok(self
            .repo
            .list(page.search.as_deref(), i64::from(page.limit), page.offset())
            .await?)
    }

    pub async fn update(&self, id: i64, req: AdminUpdate) -> Result<AdminUser, AppError> {
        req.validate()?;
        let username = req.username.map(|u| u.trim().to_string());
        let email = req.email.as_deref().map(normalize_email);
        self.ensure_unique(Some(id), username.as_deref(), email.as_deref())
            .await?;

        let password_hash = match req.password {
            Some(password) => Some(hash_password(&password, self.bcrypt_cost)?),
            None => None,
        };
        let changes = AdminChanges {
            username,
            email,
            password_hash,
            role: req.role,
            is_active: req.is_active,
        };

        let admin = self
            .repo
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("admin not found".into()))?;
        tracing::info!("Updated admin {}", admin.id);
        Ok(admin)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.soft_delete(id).await? {
            return Err(AppError::NotFound("admin not found".into()));
        }
        tracing::info!("Soft-deleted admin {}", id);
        Ok(())
    }

    /// 启动时创建默认管理员，已存在则跳过
    pub async fn ensure_default(&self, seed: &DefaultAdmin) -> Result<(), AppError> {
        if self.repo.find_by_username(&seed.username).await?.is_some() {
            tracing::debug!("Default admin {} already exists", seed.username);
            return Ok(());
        }
        let admin = self
            .create(CreateAdmin {
                username: seed.username.clone(),
                email: seed.email.clone(),
                password: seed.password.clone(),
                role: Some(AdminRole::SuperAdmin),
                is_active: Some(true),
            })
            .await?;
        tracing::info!("Seeded default admin {}", admin.username);
        Ok(())
    }

    async fn ensure_unique(
        &self,
        id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(username) = username {
            if let Some(existing) = self.repo.find_by_username(username).await? {
                if Some(existing.id) != id {
                    return Err(AppError::Duplicate("username already registered".into()));
                }
            }
        }
        if let Some(email) = email {
            if let Some(existing) = self.repo.find_by_email(email).await? {
                if Some(existing.id) != id {
                    return Err(AppError::Duplicate("email already registered".into()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn service() -> AdminService {
        AdminService::new(Arc::new(MemoryStore::new()), 4)
    }

    fn create_req(username: &str, email: &str) -> CreateAdmin {
        CreateAdmin {
            username: username.into(),
            email: email.into(),
            password: "admin123".into(),
            role: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn defaults_to_active_moderator() {
        let admin = service()
            .create(create_req("operator", "op@campus.ac.id"))
            .await
            .expect("create");
        assert_eq!(admin.role, AdminRole::Moderator);
        assert!(admin.is_active);
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let service = service();
        let admin = service
            .create(create_req("operator", "op@campus.ac.id"))
            .await
            .expect("create");

        let by_name = service.authenticate("operator", "admin123").await.expect("username");
        let by_email = service
            .authenticate("OP@campus.ac.id", "admin123")
            .await
            .expect("email");
        assert_eq!(by_name.id, admin.id);
        assert_eq!(by_email.id, admin.id);

        assert!(matches!(
            service.authenticate("operator", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("ghost", "admin123").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn inactive_admin_is_refused_after_password_check() {
        let service = service();
        let mut req = create_req("retired", "retired@campus.ac.id");
        req.is_active = Some(false);
        service.create(req).await.expect("create");

        assert!(matches!(
            service.authenticate("retired", "admin123").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.authenticate("retired", "nope").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let service = service();
        service
            .create(create_req("operator", "a@campus.ac.id"))
            .await
            .expect("create");
        let err = service
            .create(create_req("operator", "b@campus.ac.id"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AppError::Duplicate(m) if m.contains("username")));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let service = service();
        let seed = DefaultAdmin {
            username: "admin".into(),
            email: "admin@alumni.local".into(),
            password: "admin123".into(),
        };
        service.ensure_default(&seed).await.expect("seed");
        service.ensure_default(&seed).await.expect("seed again");

        let page = PageRequest {
            page: 1,
            limit: 10,
            search: None,
        };
        let admins = service.list(&page).await.expect("list");
        assert_eq!(admins.total, 1);
        assert_eq!(admins.items[0].role, AdminRole::SuperAdmin);
    }

    #[tokio::test]
    async fn deactivate_and_delete() {
        let service = service();
        let admin = service
            .create(create_req("operator", "op@campus.ac.id"))
            .await
            .expect("create");

        let updated = service
            .update(
                admin.id,
                AdminUpdate {
                    is_active: Some(false),
                    role: Some(AdminRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert!(!updated.is_active);
        assert_eq!(updated.role, AdminRole::Admin);
        assert_eq!(updated.username, "operator");

        service.delete(admin.id).await.expect("delete");
        assert!(matches!(service.get(admin.id).await, Err(AppError::NotFound(_))));
    }
}
