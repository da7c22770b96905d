// 数据库模块
// 存储库接口、Postgres 实现以及内存实现

use std::sync::Arc;

use sqlx::Executor;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::Config;

pub mod memory;
pub mod operations;
pub mod repositories;

pub use memory::MemoryStore;
pub use operations::{AdminOperation, JobHistoryOperation, StudentOperation};
pub use repositories::{AdminRepository, JobHistoryRepository, StudentRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 各服务共享的存储库集合
#[derive(Clone)]
pub struct Repositories {
    pub students: Arc<dyn StudentRepository>,
    pub jobs: Arc<dyn JobHistoryRepository>,
    pub admins: Arc<dyn AdminRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Repositories {
            students: Arc::new(StudentOperation::new(pool.clone())),
            jobs: Arc::new(JobHistoryOperation::new(pool.clone())),
            admins: Arc::new(AdminOperation::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Repositories {
            students: store.clone(),
            jobs: store.clone(),
            admins: store,
        }
    }
}

pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let options = config.database.connect_options()?;
    let application_name = config.app_name.replace('\'', "");
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .after_connect(move |conn, _meta| {
            let statement = format!("SET application_name = '{application_name}';");
            Box::pin(async move {
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
