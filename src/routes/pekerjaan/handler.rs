use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppError,
    middleware::ensure_self_or_admin,
    models::{CreateJobHistory, JobHistory, JobHistoryUpdate, JobStatus, PageQuery},
    routes::ApiResult,
    utils::{
        Claims, PageMeta, message_to_api_response, paginated_to_api_response,
        success_to_api_response,
    },
};

/// 读取工作经历并确认调用者有权访问
async fn owned_job(state: &AppState, claims: &Claims, id: i64) -> Result<JobHistory, AppError> {
    let job = state.jobs.get(id).await?;
    ensure_self_or_admin(claims, job.student_id)?;
    Ok(job)
}

#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateJobHistory>, AppError>,
) -> ApiResult<JobHistory> {
    if !claims.is_admin() {
        let owner = state.jobs.resolve_student(&req.student_ref()?).await?;
        ensure_self_or_admin(&claims, owner.id)?;
    }
    let job = state.jobs.create(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response("job history created successfully", job),
    ))
}

#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, AppError>,
) -> ApiResult<Vec<JobHistory>> {
    let page = query.resolve()?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()?;

    let result = state.jobs.search(&page, status).await?;
    Ok((
        StatusCode::OK,
        paginated_to_api_response(
            "job histories retrieved successfully",
            result.items,
            PageMeta::new(page.page, page.limit, result.total),
        ),
    ))
}

#[axum::debug_handler]
pub async fn list_jobs_by_alumni(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(alumni_id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<Vec<JobHistory>> {
    ensure_self_or_admin(&claims, alumni_id)?;
    let jobs = state.jobs.list_by_student(alumni_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("job histories retrieved successfully", jobs),
    ))
}

#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<JobHistory> {
    let job = owned_job(&state, &claims, id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("job history retrieved successfully", job),
    ))
}

#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<JobHistoryUpdate>, AppError>,
) -> ApiResult<JobHistory> {
    owned_job(&state, &claims, id).await?;
    let job = state.jobs.update(id, req).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("job history updated successfully", job),
    ))
}

#[axum::debug_handler]
pub async fn complete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<JobHistory> {
    owned_job(&state, &claims, id).await?;
    let job = state.jobs.complete(id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("job marked as completed", job),
    ))
}

#[axum::debug_handler]
pub async fn resign_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<JobHistory> {
    owned_job(&state, &claims, id).await?;
    let job = state.jobs.resign(id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response("job marked as resigned", job),
    ))
}

#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> ApiResult<()> {
    owned_job(&state, &claims, id).await?;
    state.jobs.delete(id).await?;
    Ok((
        StatusCode::OK,
        message_to_api_response("job history deleted successfully"),
    ))
}
