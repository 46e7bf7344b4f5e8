use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::validate_body;
use crate::services::account_service::{AccountService, Registration};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password required"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username, password, and invite code required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username, password, and invite code required"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username, password, and invite code required"))]
    pub invite_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegisteredUser,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Admin session issued", body = LoginResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Not an admin")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_body(&payload)?;

    let (token, user) = AccountService::login_admin(
        &state.db,
        &payload.username,
        &payload.password,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )
    .await?;

    tracing::info!("🔑 Admin {} logged in", user.username);

    Ok(Json(LoginResponse {
        token,
        user: SessionUser {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid username, taken username or bad invite code")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    validate_body(&payload)?;

    let user = AccountService::register(
        &state.db,
        Registration {
            username: payload.username,
            password: payload.password,
            invite_code: payload.invite_code,
        },
    )
    .await?;

    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration successful".to_string(),
        user: RegisteredUser {
            id: user.id,
            username: user.username,
        },
    }))
}
