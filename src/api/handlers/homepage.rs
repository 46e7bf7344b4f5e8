use crate::AppState;
use crate::api::error::AppError;
use crate::services::user_service::{Homepage, UserService};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HomepageUser {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub paste_count: u64,
}

/// `{"type": "user_list", "users": [..]}` or `{"type": "redirect", "username": ".."}`.
#[derive(Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HomepageResponse {
    UserList { users: Vec<HomepageUser> },
    Redirect { username: String },
}

impl From<Homepage> for HomepageResponse {
    fn from(homepage: Homepage) -> Self {
        match homepage {
            Homepage::UserList(users) => HomepageResponse::UserList {
                users: users
                    .into_iter()
                    .map(|u| HomepageUser {
                        username: u.username,
                        created_at: u.created_at,
                        paste_count: u.paste_count,
                    })
                    .collect(),
            },
            Homepage::Redirect(username) => HomepageResponse::Redirect { username },
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/homepage",
    responses(
        (status = 200, description = "Landing page content", body = HomepageResponse)
    ),
    tag = "users"
)]
pub async fn homepage(State(state): State<AppState>) -> Result<Json<HomepageResponse>, AppError> {
    let homepage = UserService::homepage(&state.db, Utc::now()).await?;
    Ok(Json(homepage.into()))
}
