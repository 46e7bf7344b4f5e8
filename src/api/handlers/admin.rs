use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::SuccessResponse;
use crate::models::{CurrentUser, NumberOrString};
use crate::services::admin_service::{AdminService, InviteCodeSummary, UserSummary};
use crate::services::settings_service::{SettingsService, SettingsUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub reset_password: bool,
    /// Ignored when an admin edits their own account.
    pub is_admin: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateSettingsRequest {
    pub homepage_type: Option<String>,
    pub homepage_user: Option<String>,
    #[schema(value_type = Option<u32>)]
    pub max_expiration_days: Option<NumberOrString>,
    #[schema(value_type = Option<u32>)]
    pub max_file_size_mb: Option<NumberOrString>,
}

#[derive(Serialize, ToSchema)]
pub struct InviteCodeCreated {
    pub code: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateInviteCodeRequest {
    pub disabled: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateInviteCodeResponse {
    pub success: bool,
    pub disabled: bool,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 403, description = "Admin access required")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(AdminService::list_users(&state.db).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and their pastes removed", body = SuccessResponse),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    AdminService::delete_user(&state.db, &state.pastes, &admin, &id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UpdateUserResponse),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, AppError> {
    let new_password = AdminService::update_user(
        &state.db,
        &admin,
        &id,
        payload.reset_password,
        payload.is_admin,
    )
    .await?;

    Ok(Json(UpdateUserResponse {
        success: true,
        new_password,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "All settings as a key/value map")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    Ok(Json(SettingsService::get_all(&state.db).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = SuccessResponse),
        (status = 400, description = "Out-of-range value or unknown homepage user")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    SettingsService::update(
        &state.db,
        SettingsUpdate {
            homepage_type: payload.homepage_type,
            homepage_user: payload.homepage_user,
            max_expiration_days: payload.max_expiration_days,
            max_file_size_mb: payload.max_file_size_mb,
        },
    )
    .await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/api/admin/invite-codes",
    responses(
        (status = 200, description = "Invite code created", body = InviteCodeCreated)
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn create_invite_code(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
) -> Result<Json<InviteCodeCreated>, AppError> {
    let code = AdminService::create_invite_code(&state.db, &admin).await?;
    Ok(Json(InviteCodeCreated { code }))
}

#[utoipa::path(
    get,
    path = "/api/admin/invite-codes",
    responses(
        (status = 200, description = "Invite codes with their usage", body = [InviteCodeSummary])
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn list_invite_codes(
    State(state): State<AppState>,
) -> Result<Json<Vec<InviteCodeSummary>>, AppError> {
    Ok(Json(AdminService::list_invite_codes(&state.db).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/invite-codes/{id}",
    params(("id" = String, Path, description = "Invite code ID")),
    request_body = UpdateInviteCodeRequest,
    responses(
        (status = 200, description = "Invite code updated", body = UpdateInviteCodeResponse),
        (status = 404, description = "Code not found")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn update_invite_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInviteCodeRequest>,
) -> Result<Json<UpdateInviteCodeResponse>, AppError> {
    let disabled = AdminService::set_invite_code_disabled(&state.db, &id, payload.disabled).await?;
    Ok(Json(UpdateInviteCodeResponse {
        success: true,
        disabled,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/invite-codes/{id}",
    params(("id" = String, Path, description = "Invite code ID")),
    responses(
        (status = 200, description = "Invite code deleted", body = SuccessResponse),
        (status = 404, description = "Code not found")
    ),
    security(("jwt" = [])),
    tag = "admin"
)]
pub async fn delete_invite_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    AdminService::delete_invite_code(&state.db, &id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
