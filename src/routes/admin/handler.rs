use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppError,
    models::{AdminUpdate, AdminUser, CreateAdmin, PageQuery},
    routes::ApiResult,
    utils::{PageMeta, message_to_api_response, paginated_to_api_response, success_to_api_response},
};

#[axum::debug_handler]
pub async fn create_admin(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateAdmin>, AppError>,
) -> ApiResult<AdminUser> {
    let admin = state.admins.create(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response("admin created successfully", admin),
    ))
}

#[axum::debug_handler]
pub async fn list_admins(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> ApiResult<Vec<AdminUser>> {
    let page = query.resolve()?;
    let result = state.admins.list(&page).await?;
    Ok((
        StatusCode::OK,
        paginated_to_api_response(
            "admins retrieved successfully",
            result.items,
            PageMeta::new(page.page, page.limit, result.total),
        ),
    ))
}

#[axum::debug_handler]
pub async fn get_admin(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<AdminUser> {
    let admin = state.admins.get(id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("admin retrieved successfully", admin),
    ))
}

#[axum::debug_handler]
pub async fn update_admin(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<AdminUpdate>, AppError>,
) -> ApiResult<AdminUser> {
    let admin = state.admins.update(id, req).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("admin updated successfully", admin),
    ))
}

#[axum::debug_handler]
pub async fn delete_admin(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<()> {
    state.admins.delete(id).await?;
    Ok((
        StatusCode::OK,
        message_to_api_response("admin deleted successfully"),
    ))
}
