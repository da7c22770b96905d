use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    config::Config,
    error::AppError,
    middleware::{auth_middleware, handle_panic, log_errors, require_admin, require_alumni_or_admin},
    utils::ApiResponse,
};

pub mod admin;
pub mod alumni;
pub mod auth;
pub mod health;
pub mod mahasiswa;
pub mod pekerjaan;

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    // 公开路由
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/mahasiswa/register", post(auth::register_student))
        .route("/auth/alumni/register", post(auth::register_alumni))
        .route("/auth/mahasiswa/login", post(auth::login_student))
        .route("/auth/alumni/login", post(auth::login_alumni))
        .route("/auth/admin/login", post(auth::login_admin))
        .route("/mahasiswa", post(mahasiswa::create_student));

    // 任意已登录角色，本人校验在 handler 中完成
    let authenticated_routes = Router::new()
        .route("/auth/profile", get(auth::profile))
        .route(
            "/mahasiswa/{id}",
            get(mahasiswa::get_student).put(mahasiswa::update_student),
        );

    let alumni_routes = Router::new()
        .route(
            "/alumni/{id}",
            get(alumni::get_alumni).put(alumni::update_alumni),
        )
        .route("/pekerjaan", post(pekerjaan::create_job))
        .route(
            "/pekerjaan/{id}",
            get(pekerjaan::get_job)
                .put(pekerjaan::update_job)
                .delete(pekerjaan::delete_job),
        )
        .route("/pekerjaan/{id}/complete", post(pekerjaan::complete_job))
        .route("/pekerjaan/{id}/resign", post(pekerjaan::resign_job))
        .route(
            "/pekerjaan/alumni/{alumni_id}",
            get(pekerjaan::list_jobs_by_alumni),
        )
        .route_layer(axum::middleware::from_fn(require_alumni_or_admin));

    let admin_routes = Router::new()
        .route("/mahasiswa", get(mahasiswa::list_students))
        .route(
            "/mahasiswa/{id}",
            axum::routing::delete(mahasiswa::delete_student),
        )
        .route(
            "/alumni",
            post(alumni::graduate_student).get(alumni::list_alumni),
        )
        .route("/alumni/{id}", axum::routing::delete(alumni::delete_alumni))
        .route("/pekerjaan", get(pekerjaan::list_jobs))
        .route("/admins", post(admin::create_admin).get(admin::list_admins))
        .route(
            "/admins/{id}",
            get(admin::get_admin)
                .put(admin::update_admin)
                .delete(admin::delete_admin),
        )
        .route_layer(axum::middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .merge(authenticated_routes)
        .merge(alumni_routes)
        .merge(admin_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);
    let base = config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new()
            .route("/health", get(health::health))
            .nest(base, api)
    };

    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}
