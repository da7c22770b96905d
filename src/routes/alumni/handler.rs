use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use super::model::GraduateStudentRequest;
use crate::{
    AppState,
    error::AppError,
    middleware::ensure_self_or_admin,
    models::{AlumniUpdate, PageQuery, Student, StudentStatus},
    routes::ApiResult,
    utils::{
        Claims, PageMeta, message_to_api_response, paginated_to_api_response,
        success_to_api_response,
    },
};

/// 管理员将在读学生转为校友
#[axum::debug_handler]
pub async fn graduate_student(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<GraduateStudentRequest>, AppError>,
) -> ApiResult<Student> {
    let alumni = state.students.graduate(req.student_id, req.graduation).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("student graduated successfully", alumni),
    ))
}

#[axum::debug_handler]
pub async fn list_alumni(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> ApiResult<Vec<Student>> {
    let page = query.resolve()?;
    let result = state
        .students
        .search(&page, Some(StudentStatus::Graduated))
        .await?;
    Ok((
        StatusCode::OK,
        paginated_to_api_response(
            "alumni retrieved successfully",
            result.items,
            PageMeta::new(page.page, page.limit, result.total),
        ),
    ))
}

#[axum::debug_handler]
pub async fn get_alumni(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<Student> {
    ensure_self_or_admin(&claims, id)?;
    let alumni = state.students.get_alumni(id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("alumni retrieved successfully", alumni),
    ))
}

#[axum::debug_handler]
pub async fn update_alumni(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<AlumniUpdate>, AppError>,
) -> ApiResult<Student> {
    ensure_self_or_admin(&claims, id)?;
    let alumni = state.students.update_alumni(id, req).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("alumni updated successfully", alumni),
    ))
}

#[axum::debug_handler]
pub async fn delete_alumni(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<()> {
    state.students.get_alumni(id).await?;
    state.students.delete(id).await?;
    Ok((
        StatusCode::OK,
        message_to_api_response("alumni deleted successfully"),
    ))
}
