use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppError,
    middleware::ensure_self_or_admin,
    models::{PageQuery, RegisterStudent, Student, StudentStatus, StudentUpdate},
    routes::ApiResult,
    utils::{
        Claims, PageMeta, message_to_api_response, paginated_to_api_response,
        success_to_api_response,
    },
};

#[axum::debug_handler]
pub async fn create_student(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterStudent>, AppError>,
) -> ApiResult<Student> {
    let student = state.students.register(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response("student created successfully", student),
    ))
}

#[axum::debug_handler]
pub async fn list_students(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> ApiResult<Vec<Student>> {
    let page = query.resolve()?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<StudentStatus>)
        .transpose()?;

    let result = state.students.search(&page, status).await?;
    Ok((
        StatusCode::OK,
        paginated_to_api_response(
            "students retrieved successfully",
            result.items,
            PageMeta::new(page.page, page.limit, result.total),
        ),
    ))
}

#[axum::debug_handler]
pub async fn get_student(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<Student> {
    ensure_self_or_admin(&claims, id)?;
    let student = state.students.get(id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("student retrieved successfully", student),
    ))
}

#[axum::debug_handler]
pub async fn update_student(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<StudentUpdate>, AppError>,
) -> ApiResult<Student> {
    ensure_self_or_admin(&claims, id)?;
    let student = state.students.update(id, req).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("student updated successfully", student),
    ))
}

#[axum::debug_handler]
pub async fn delete_student(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<()> {
    state.students.delete(id).await?;
    Ok((
        StatusCode::OK,
        message_to_api_response("student deleted successfully"),
    ))
}
