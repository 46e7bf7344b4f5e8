use crate::AppState;
use crate::api::error::AppError;
use crate::entities::pastes::PasteKind;
use crate::services::account_service::AccountService;
use crate::services::user_service::UserService;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct PublicUser {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct PublicPaste {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PasteKind,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_password: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserPageResponse {
    pub user: PublicUser,
    pub pastes: Vec<PublicPaste>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UnlockRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct UnlockedUser {
    pub id: String,
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct UnlockResponse {
    pub success: bool,
    pub token: String,
    pub user: UnlockedUser,
}

#[utoipa::path(
    get,
    path = "/api/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User page with live pastes", body = UserPageResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user_page(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserPageResponse>, AppError> {
    let (user, live) =
        UserService::public_profile(&state.db, &state.pastes, &username, Utc::now()).await?;

    let pastes = live
        .into_iter()
        .map(|p| PublicPaste {
            has_password: p.has_password(),
            id: p.id,
            name: p.name,
            kind: p.kind,
            size: p.size,
            created_at: p.created_at,
            expires_at: p.expires_at,
        })
        .collect();

    Ok(Json(UserPageResponse {
        user: PublicUser {
            username: user.username,
            created_at: user.created_at,
        },
        pastes,
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/{username}/unlock",
    params(("username" = String, Path, description = "Username")),
    request_body = UnlockRequest,
    responses(
        (status = 200, description = "Session issued for the page owner", body = UnlockResponse),
        (status = 400, description = "Password required"),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn unlock_user_page(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, AppError> {
    let (token, user) = AccountService::unlock(
        &state.db,
        &username,
        &payload.password,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )
    .await?;

    Ok(Json(UnlockResponse {
        success: true,
        token,
        user: UnlockedUser {
            id: user.id,
            username: user.username,
        },
    }))
}
