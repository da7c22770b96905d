use std::sync::Arc;

use serde::Serialize;

use super::{AdminService, StudentService};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{AdminUser, Student};
use crate::utils::{Role, generate_token};

/// 登录成功的主体
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Principal {
    Student(Student),
    Admin(AdminUser),
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Principal,
    pub role: Role,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct AuthService {
    students: StudentService,
    admins: AdminService,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(students: StudentService, admins: AdminService, config: Arc<Config>) -> Self {
        Self {
            students,
            admins,
            config,
        }
    }

    pub async fn login_student(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let student = self.students.authenticate(email, password).await.inspect_err(|_| {
            tracing::warn!("Rejected student login");
        })?;
        self.issue_for_student(student, Role::Student)
    }

    /// 只有已毕业的学生可以使用校友登录
    pub async fn login_alumni(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let student = self.students.authenticate(email, password).await.inspect_err(|_| {
            tracing::warn!("Rejected alumni login");
        })?;
        if !student.is_alumni() {
            return Err(AppError::Forbidden(
                "account is not an alumni account".into(),
            ));
        }
        self.issue_for_student(student, Role::Alumni)
    }

    pub async fn login_admin(&self, login: &str, password: &str) -> Result<LoginResponse, AppError> {
        let admin = self.admins.authenticate(login, password).await.inspect_err(|_| {
            tracing::warn!("Rejected admin login");
        })?;
        let (token, expires_at) = generate_token(
            admin.id,
            &admin.email,
            Role::Admin,
            Some(&admin.username),
            &self.config,
        )?;
        tracing::info!("Admin {} logged in", admin.id);
        Ok(LoginResponse {
            token,
            user: Principal::Admin(admin),
            role: Role::Admin,
            expires_at,
        })
    }

    fn issue_for_student(&self, student: Student, role: Role) -> Result<LoginResponse, AppError> {
        let (token, expires_at) = generate_token(student.id, &student.email, role, None, &self.config)?;
        tracing::info!("Student {} logged in as {}", student.id, role.as_str());
        Ok(LoginResponse {
            token,
            user: Principal::Student(student),
            role,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{CreateAdmin, Graduation, RegisterStudent};
    use crate::utils::verify_token;

    fn config() -> Arc<Config> {
        Arc::new(
            Config::from_lookup(|key| match key {
                "JWT_SECRET" => Some("test-secret".into()),
                _ => None,
            })
            .expect("config"),
        )
    }

    fn services() -> (AuthService, StudentService, AdminService, Arc<Config>) {
        let store = Arc::new(MemoryStore::new());
        let students = StudentService::new(store.clone(), 4);
        let admins = AdminService::new(store, 4);
        let config = config();
        let auth = AuthService::new(students.clone(), admins.clone(), config.clone());
        (auth, students, admins, config)
    }

    async fn register(students: &StudentService) -> Student {
        students
            .register(RegisterStudent {
                nim: "2021001".into(),
                name: "John Doe".into(),
                email: "john@test.com".into(),
                password: "password123".into(),
                department: "Informatika".into(),
                entry_year: 2021,
            })
            .await
            .expect("register")
    }

    #[tokio::test]
    async fn student_login_issues_student_token() {
        let (auth, students, _, config) = services();
        let student = register(&students).await;

        let login = auth
            .login_student("john@test.com", "password123")
            .await
            .expect("login");
        assert_eq!(login.role, Role::Student);

        let claims = verify_token(&login.token, &config).expect("claims");
        assert_eq!(claims.user_id, student.id);
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp, login.expires_at);
    }

    #[tokio::test]
    async fn alumni_login_requires_graduation() {
        let (auth, students, _, _) = services();
        let student = register(&students).await;

        let err = auth
            .login_alumni("john@test.com", "password123")
            .await
            .expect_err("not graduated yet");
        assert!(matches!(err, AppError::Forbidden(_)));

        // 密码错误时不暴露账户状态
        let err = auth
            .login_alumni("john@test.com", "bad-password")
            .await
            .expect_err("wrong password");
        assert!(matches!(err, AppError::InvalidCredentials));

        students
            .graduate(
                student.id,
                Graduation {
                    graduation_year: 2024,
                    phone: "081234567890".into(),
                    address: "Jakarta".into(),
                },
            )
            .await
            .expect("graduate");
        let login = auth
            .login_alumni("john@test.com", "password123")
            .await
            .expect("alumni login");
        assert_eq!(login.role, Role::Alumni);
    }

    #[tokio::test]
    async fn admin_token_carries_username() {
        let (auth, _, admins, config) = services();
        admins
            .create(CreateAdmin {
                username: "root".into(),
                email: "root@campus.ac.id".into(),
                password: "admin123".into(),
                role: None,
                is_active: None,
            })
            .await
            .expect("admin");

        let login = auth.login_admin("root", "admin123").await.expect("login");
        let claims = verify_token(&login.token, &config).expect("claims");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.username.as_deref(), Some("root"));

        let body = serde_json::to_value(&login).expect("json");
        assert_eq!(body["role"], "admin");
        assert_eq!(body["user"]["username"], "root");
        assert!(body["user"].get("password_hash").is_none());
    }
}
