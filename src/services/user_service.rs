use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::services::paste_service::PasteService;
use crate::services::settings_service::{HOMEPAGE_USER_LIST, HOMEPAGE_USER_PAGE, SettingsService};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// What the public landing page should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Homepage {
    UserList(Vec<UserListing>),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListing {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub paste_count: u64,
}

pub struct UserService;

impl UserService {
    /// A user's public page: the account and its live pastes, newest first.
    pub async fn public_profile(
        db: &DatabaseConnection,
        paste_service: &PasteService,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(users::Model, Vec<pastes::Model>), AppError> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let live = paste_service.list_live_for_owner(&user.id, now).await?;
        Ok((user, live))
    }

    pub async fn homepage(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<Homepage, AppError> {
        let kind = SettingsService::get(db, "homepage_type")
            .await?
            .unwrap_or_else(|| HOMEPAGE_USER_LIST.to_string());

        match kind.as_str() {
            HOMEPAGE_USER_LIST => Ok(Homepage::UserList(Self::list_members(db, now).await?)),
            HOMEPAGE_USER_PAGE => {
                let target = SettingsService::get(db, "homepage_user")
                    .await?
                    .filter(|u| !u.is_empty());
                Ok(match target {
                    Some(username) => Homepage::Redirect(username),
                    None => Homepage::UserList(Vec::new()),
                })
            }
            _ => Ok(Homepage::UserList(Vec::new())),
        }
    }

    /// Non-admin accounts with their live paste counts, newest account first.
    async fn list_members(
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserListing>, AppError> {
        let members = Users::find()
            .filter(users::Column::IsAdmin.eq(false))
            .order_by_desc(users::Column::CreatedAt)
            .all(db)
            .await?;

        let mut out = Vec::with_capacity(members.len());
        for user in members {
            let paste_count = Pastes::find()
                .filter(pastes::Column::UserId.eq(&user.id))
                .filter(
                    Condition::any()
                        .add(pastes::Column::ExpiresAt.is_null())
                        .add(pastes::Column::ExpiresAt.gt(now)),
                )
                .count(db)
                .await?;
            out.push(UserListing {
                username: user.username,
                created_at: user.created_at,
                paste_count,
            });
        }
        Ok(out)
    }
}
