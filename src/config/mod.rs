use std::env;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// 优先使用 DATABASE_URL，否则由各部分构造，用户名和密码不经过 URL 拼接
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url);
        }
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .ssl_mode(PgSslMode::from_str(&self.ssl_mode)?);
        if self.password.is_empty() {
            Ok(options)
        } else {
            Ok(options.password(&self.password))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefaultAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_env: String,
    pub server_host: String,
    pub server_port: u16,
    pub debug: bool,
    pub api_base_uri: String,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub default_admin: Option<DefaultAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let driver = match get("DB_DRIVER", "postgres").to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseDriver::Postgres,
            "memory" => DatabaseDriver::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "DB_DRIVER",
                    value: other.to_string(),
                });
            }
        };

        let ssl_mode = get("DB_SSLMODE", "disable");
        if PgSslMode::from_str(&ssl_mode).is_err() {
            return Err(ConfigError::Invalid {
                key: "DB_SSLMODE",
                value: ssl_mode,
            });
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bcrypt_cost = parse_number::<u32>("BCRYPT_COST", &get("BCRYPT_COST", "12"))?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let default_admin = lookup("DEFAULT_ADMIN_PASSWORD")
            .filter(|v| !v.is_empty())
            .map(|password| DefaultAdmin {
                username: get("DEFAULT_ADMIN_USERNAME", "admin"),
                email: get("DEFAULT_ADMIN_EMAIL", "admin@alumni.local"),
                password,
            });

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let config = Config {
            app_name: get("APP_NAME", "alumni-backend"),
            app_env: get("APP_ENV", "development"),
            server_host: get("APP_HOST", "0.0.0.0"),
            server_port: parse_number("APP_PORT", &get("APP_PORT", "8080"))?,
            debug: parse_bool("APP_DEBUG", &get("APP_DEBUG", "false"))?,
            api_base_uri: get("API_BASE_URI", "/api/v1"),
            database: DatabaseConfig {
                driver,
                url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
                host: get("DB_HOST", "localhost"),
                port: parse_number("DB_PORT", &get("DB_PORT", "5432"))?,
                user: get("DB_USER", "postgres"),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                name: get("DB_NAME", "alumni_db"),
                ssl_mode,
                max_connections: parse_number(
                    "DB_MAX_CONNECTIONS",
                    &get("DB_MAX_CONNECTIONS", "100"),
                )?,
                min_connections: parse_number(
                    "DB_MIN_CONNECTIONS",
                    &get("DB_MIN_CONNECTIONS", "10"),
                )?,
            },
            jwt_secret,
            jwt_expiration_secs: parse_duration_secs("JWT_EXPIRE", &get("JWT_EXPIRE", "24h"))?,
            bcrypt_cost,
            cors_allowed_origins,
            default_admin,
        };

        // 生产环境必须显式配置 CORS 来源
        if config.is_production() && config.allows_any_origin() {
            return Err(ConfigError::Invalid {
                key: "CORS_ALLOWED_ORIGINS",
                value: config.cors_allowed_origins.join(","),
            });
        }
        Ok(config)
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

// "24h" / "30m" / "45s"，不带单位时按小时处理
fn parse_duration_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], c),
        _ => (value, 'h'),
    };
    let amount: u64 = parse_number(key, number)?;
    let secs = match unit {
        'h' => amount * 3600,
        'm' => amount * 60,
        's' => amount,
        _ => {
            return Err(ConfigError::Invalid {
                key,
                value: value.to_string(),
            });
        }
    };
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(secs)
}
