use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, Role, verify_token},
};

/// 校验 Bearer 令牌并把 Claims 放入请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    let claims = verify_token(bearer.token(), &state.config).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn claims_of(request: &Request) -> Result<&Claims, AppError> {
    request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    if !claims_of(&request)?.is_admin() {
        return Err(AppError::Forbidden("admin access required".into()));
    }
    Ok(next.run(request).await)
}

pub async fn require_alumni_or_admin(request: Request, next: Next) -> Result<Response, AppError> {
    if !matches!(claims_of(&request)?.role, Role::Alumni | Role::Admin) {
        return Err(AppError::Forbidden("alumni or admin access required".into()));
    }
    Ok(next.run(request).await)
}

/// 非管理员只能访问自己的记录
pub fn ensure_self_or_admin(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.can_access(owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "you can only access your own records".into(),
        ))
    }
}
