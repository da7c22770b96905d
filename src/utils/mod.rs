use std::sync::{Arc, OnceLock};

use axum::Json;
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub mod validation;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 登录用的密码校验。账户不存在时对同等代价的占位哈希做一次校验，
/// 使响应时间不暴露账户是否存在
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    cost: u32,
    placeholder: Arc<OnceLock<String>>,
}

impl PasswordVerifier {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            placeholder: Arc::new(OnceLock::new()),
        }
    }

    pub fn verify(&self, password: &str, hash: Option<&str>) -> Result<bool, bcrypt::BcryptError> {
        match hash {
            Some(hash) => verify_password(password, hash),
            None => {
                verify_password(password, self.placeholder()?)?;
                Ok(false)
            }
        }
    }

    fn placeholder(&self) -> Result<&str, bcrypt::BcryptError> {
        if let Some(hash) = self.placeholder.get() {
            return Ok(hash);
        }
        let hash = hash_password("placeholder-password", self.cost)?;
        Ok(self.placeholder.get_or_init(|| hash))
    }
}

/// 令牌中携带的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "mahasiswa")]
    Student,
    #[serde(rename = "alumni")]
    Alumni,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "mahasiswa",
            Role::Alumni => "alumni",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64, // 学生或管理员ID
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>, // 仅管理员
    pub exp: i64, // 过期时间
    pub iat: i64, // 签发时间
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 管理员可访问任意记录，其余角色只能访问自己的记录
    pub fn can_access(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

pub fn generate_token(
    user_id: i64,
    email: &str,
    role: Role,
    username: Option<&str>,
    config: &Config,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let issued_at = Utc::now().timestamp();
    let expiration = issued_at + config.jwt_expiration().as_secs() as i64;

    let claims = Claims {
        user_id,
        email: email.to_string(),
        role,
        username: username.map(str::to_string),
        exp: expiration,
        iat: issued_at,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_wide = i64::from(limit.max(1));
        PageMeta {
            page,
            limit,
            total,
            total_pages: (total + limit_wide - 1) / limit_wide,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

pub fn success_to_api_response<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        meta: None,
    })
}

pub fn paginated_to_api_response<T: Serialize>(
    message: impl Into<String>,
    data: Vec<T>,
    meta: PageMeta,
) -> Json<ApiResponse<Vec<T>>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        meta: Some(meta),
    })
}

pub fn message_to_api_response(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data: None,
        meta: None,
    })
}

pub fn error_to_api_response(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: false,
        message: message.into(),
        data: None,
        meta: None,
    })
}
