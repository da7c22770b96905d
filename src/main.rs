use std::net::{IpAddr, SocketAddr};

use alumni_backend::{
    AppState,
    config::{Config, DatabaseDriver},
    database::{self, Repositories},
    routes,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 初始化日志
    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting {} in {} mode", config.app_name, config.app_env);

    // 存储后端
    let repos = match config.database.driver {
        DatabaseDriver::Postgres => {
            let pool = database::connect(&config)
                .await
                .expect("Failed to connect to Postgres");
            database::migrate(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!(
                "Connected to Postgres at {}:{}",
                config.database.host,
                config.database.port
            );
            Repositories::postgres(pool)
        }
        DatabaseDriver::Memory => {
            tracing::warn!("Using in-memory storage, data will be lost on restart");
            Repositories::in_memory()
        }
    };

    let state = AppState::new(config, repos);

    // 默认管理员
    if let Some(seed) = state.config.default_admin.clone() {
        state
            .admins
            .ensure_default(&seed)
            .await
            .expect("Failed to seed default admin");
    }

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );

    let app = routes::router(state);

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
