use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use super::model::{AdminLoginRequest, LoginRequest, ProfileResponse};
use crate::{
    AppState,
    error::AppError,
    models::{RegisterAlumni, RegisterStudent, Student},
    routes::ApiResult,
    services::LoginResponse,
    utils::{Claims, success_to_api_response},
};

#[axum::debug_handler]
pub async fn register_student(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterStudent>, AppError>,
) -> ApiResult<Student> {
    let student = state.students.register(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response("student registered successfully", student),
    ))
}

#[axum::debug_handler]
pub async fn register_alumni(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterAlumni>, AppError>,
) -> ApiResult<Student> {
    let alumni = state.students.register_alumni(req).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response("alumni registered successfully", alumni),
    ))
}

#[axum::debug_handler]
pub async fn login_student(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> ApiResult<LoginResponse> {
    let login = state.auth.login_student(&req.email, &req.password).await?;
    Ok((StatusCode::OK, success_to_api_response("login successful", login)))
}

#[axum::debug_handler]
pub async fn login_alumni(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> ApiResult<LoginResponse> {
    let login = state.auth.login_alumni(&req.email, &req.password).await?;
    Ok((StatusCode::OK, success_to_api_response("login successful", login)))
}

#[axum::debug_handler]
pub async fn login_admin(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<AdminLoginRequest>, AppError>,
) -> ApiResult<LoginResponse> {
    let login = state.auth.login_admin(&req.username, &req.password).await?;
    Ok((StatusCode::OK, success_to_api_response("login successful", login)))
}

#[axum::debug_handler]
pub async fn profile(Extension(claims): Extension<Claims>) -> ApiResult<ProfileResponse> {
    Ok((
        StatusCode::OK,
        success_to_api_response(
            "profile retrieved successfully",
            ProfileResponse {
                id: claims.user_id,
                email: claims.email,
                role: claims.role,
                username: claims.username,
            },
        ),
    ))
}
