use axum::{Json, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use crate::utils::{ApiResponse, success_to_api_response};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: i64,
}

pub async fn health() -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    (
        StatusCode::OK,
        success_to_api_response(
            "Server is running",
            HealthStatus {
                status: "ok",
                timestamp: Utc::now().timestamp(),
            },
        ),
    )
}
