use crate::AppState;
use crate::api::error::AppError;
use crate::entities::prelude::*;
use crate::models::CurrentUser;
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the session token to a live account and attaches it as
/// [`CurrentUser`]. Tokens of deleted accounts are refused.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = validate_jwt(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = Users::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
    });

    Ok(next.run(req).await)
}

/// Layered inside [`auth_middleware`].
pub async fn admin_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<CurrentUser>() {
        Some(user) if user.is_admin => Ok(next.run(req).await),
        Some(_) => Err(AppError::Forbidden("Admin access required".to_string())),
        None => Err(AppError::Unauthorized("Authentication required".to_string())),
    }
}
