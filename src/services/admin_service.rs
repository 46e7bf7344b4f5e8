use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::CurrentUser;
use crate::services::paste_service::PasteService;
use crate::utils::{password, secrets};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub paste_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InviteCodeSummary {
    pub id: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub disabled: bool,
    /// Username of the admin who created the code.
    pub created_by: String,
    pub use_count: usize,
    /// Usernames registered with this code, most recent first.
    pub used_by: Vec<String>,
}

pub struct AdminService;

impl AdminService {
    pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<UserSummary>, AppError> {
        let users = Users::find()
            .order_by_desc(users::Column::CreatedAt)
            .all(db)
            .await?;

        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let paste_count = Pastes::find()
                .filter(pastes::Column::UserId.eq(&user.id))
                .count(db)
                .await?;
            out.push(UserSummary {
                id: user.id,
                username: user.username,
                is_admin: user.is_admin,
                created_at: user.created_at,
                paste_count,
            });
        }
        Ok(out)
    }

    /// Deletes an account. Backing files go first; the rows follow through
    /// the owner cascade.
    pub async fn delete_user(
        db: &DatabaseConnection,
        paste_service: &PasteService,
        requester: &CurrentUser,
        user_id: &str,
    ) -> Result<(), AppError> {
        if requester.id == user_id {
            return Err(AppError::Validation("Cannot delete yourself".to_string()));
        }

        let user = Users::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let removed = paste_service.purge_owner_files(&user.id).await?;
        Users::delete_by_id(user.id.clone()).exec(db).await?;

        tracing::info!(
            "🗑️  User {} deleted by {} ({} file(s) removed)",
            user.username,
            requester.username,
            removed
        );
        Ok(())
    }

    /// Optionally resets the password and/or toggles admin rights.
    ///
    /// Returns the new plaintext password when one was generated. Admins
    /// cannot change their own admin flag.
    pub async fn update_user(
        db: &DatabaseConnection,
        requester: &CurrentUser,
        user_id: &str,
        reset_password: bool,
        is_admin: Option<bool>,
    ) -> Result<Option<String>, AppError> {
        let user = Users::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut active: users::ActiveModel = user.into();
        let mut changed = false;
        let mut new_password = None;

        if reset_password {
            let generated = secrets::new_memorable_password();
            active.password_hash = Set(password::hash_password(&generated)?);
            new_password = Some(generated);
            changed = true;
        }

        if let Some(flag) = is_admin {
            if requester.id != user_id {
                active.is_admin = Set(flag);
                changed = true;
            }
        }

        if changed {
            active.update(db).await?;
        }
        Ok(new_password)
    }

    pub async fn create_invite_code(
        db: &DatabaseConnection,
        requester: &CurrentUser,
    ) -> Result<String, AppError> {
        let code = secrets::new_memorable_password();

        invite_codes::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            code: Set(code.clone()),
            created_by: Set(requester.id.clone()),
            disabled: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        tracing::info!("🎟️  Invite code created by {}", requester.username);
        Ok(code)
    }

    pub async fn list_invite_codes(
        db: &DatabaseConnection,
    ) -> Result<Vec<InviteCodeSummary>, AppError> {
        let codes = InviteCodes::find()
            .find_also_related(Users)
            .order_by_desc(invite_codes::Column::CreatedAt)
            .all(db)
            .await?;

        let mut out = Vec::with_capacity(codes.len());
        for (code, creator) in codes {
            let used_by: Vec<String> = InviteCodeUses::find()
                .filter(invite_code_uses::Column::InviteCodeId.eq(&code.id))
                .find_also_related(Users)
                .order_by_desc(invite_code_uses::Column::UsedAt)
                .all(db)
                .await?
                .into_iter()
                .filter_map(|(_, user)| user.map(|u| u.username))
                .collect();

            out.push(InviteCodeSummary {
                id: code.id,
                code: code.code,
                created_at: code.created_at,
                disabled: code.disabled,
                created_by: creator.map(|u| u.username).unwrap_or_default(),
                use_count: used_by.len(),
                used_by,
            });
        }
        Ok(out)
    }

    pub async fn set_invite_code_disabled(
        db: &DatabaseConnection,
        code_id: &str,
        disabled: bool,
    ) -> Result<bool, AppError> {
        let code = InviteCodes::find_by_id(code_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Code not found".to_string()))?;

        let mut active: invite_codes::ActiveModel = code.into();
        active.disabled = Set(disabled);
        active.update(db).await?;
        Ok(disabled)
    }

    pub async fn delete_invite_code(db: &DatabaseConnection, code_id: &str) -> Result<(), AppError> {
        let res = InviteCodes::delete_by_id(code_id.to_string())
            .exec(db)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound("Code not found".to_string()));
        }
        Ok(())
    }
}
