use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::entities::pastes::PasteKind;
use crate::models::{CreatedPaste, CurrentUser, NewPaste, PasswordOption, PastePayload, ResolvedSettings};
use crate::services::storage::{StorageError, StorageService};
use crate::utils::{password, secrets};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Owns the `pastes` table and the files backing file pastes.
pub struct PasteService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
}

impl PasteService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>) -> Self {
        Self { db, storage }
    }

    pub fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    /// Persists a new paste.
    ///
    /// Every failure path removes a staged upload before returning, so a
    /// rejected file paste never leaves bytes on disk.
    pub async fn create(
        &self,
        owner_id: &str,
        new: NewPaste,
        limits: &ResolvedSettings,
    ) -> Result<CreatedPaste, AppError> {
        self.create_at(owner_id, new, limits, Utc::now()).await
    }

    pub async fn create_at(
        &self,
        owner_id: &str,
        new: NewPaste,
        limits: &ResolvedSettings,
        now: DateTime<Utc>,
    ) -> Result<CreatedPaste, AppError> {
        let staged_key = new.payload.staged_key().map(str::to_owned);

        match self.insert_paste(owner_id, new, limits, now).await {
            Ok(created) => Ok(created),
            Err(e) => {
                if let Some(key) = staged_key {
                    self.discard_staged(&key).await;
                }
                Err(e)
            }
        }
    }

    /// Removes an upload that never became a paste.
    pub async fn discard_staged(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!("Failed to discard staged upload {}: {}", key, e);
        }
    }

    async fn insert_paste(
        &self,
        owner_id: &str,
        new: NewPaste,
        limits: &ResolvedSettings,
        now: DateTime<Utc>,
    ) -> Result<CreatedPaste, AppError> {
        let kind = new.payload.kind();

        let (content, file_path, original_filename, size) = match new.payload {
            PastePayload::Text(content) => {
                if content.is_empty() {
                    return Err(AppError::Validation(
                        "Content required for text paste".to_string(),
                    ));
                }
                let size = content.len() as i64;
                (Some(content), None, None, size)
            }
            PastePayload::File {
                staged,
                original_filename,
            } => {
                if staged.size as u64 > limits.max_file_size_bytes {
                    return Err(StorageError::TooLarge {
                        limit: limits.max_file_size_bytes,
                    }
                    .into());
                }
                (None, Some(staged.key), Some(original_filename), staged.size)
            }
        };

        let expires_at = compute_expiry(new.expires_in_days, limits.max_expiration_days, now)?;

        let name = new
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name(kind, now));

        let (password_hash, generated_password) = match new.password {
            PasswordOption::None => (None, None),
            PasswordOption::Random => {
                let generated = secrets::new_memorable_password();
                (Some(password::hash_password(&generated)?), Some(generated))
            }
            PasswordOption::Custom(plain) => (Some(password::hash_password(&plain)?), None),
        };

        let id = secrets::new_paste_id();
        let paste = pastes::ActiveModel {
            id: Set(id.clone()),
            user_id: Set(owner_id.to_string()),
            name: Set(name),
            kind: Set(kind),
            content: Set(content),
            file_path: Set(file_path),
            original_filename: Set(original_filename),
            password_hash: Set(password_hash),
            expires_at: Set(expires_at),
            size: Set(size),
            created_at: Set(now),
        };

        let paste = paste.insert(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::Conflict(format!("paste id {} already allocated: {}", id, detail))
            }
            _ => AppError::Database(e),
        })?;

        info!(
            "📝 Paste {} created by {} ({:?}, {} bytes)",
            paste.id, owner_id, paste.kind, paste.size
        );

        Ok(CreatedPaste {
            paste,
            generated_password,
        })
    }

    /// Fetches a live paste. Missing and expired pastes are both `NotFound`.
    pub async fn get(&self, id: &str) -> Result<pastes::Model, AppError> {
        self.get_at(id, Utc::now()).await
    }

    pub async fn get_at(&self, id: &str, now: DateTime<Utc>) -> Result<pastes::Model, AppError> {
        Pastes::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .filter(|p| p.is_live_at(now))
            .ok_or_else(|| AppError::NotFound("Paste not found".to_string()))
    }

    /// Like [`get`](Self::get), joined with the owning user.
    pub async fn get_with_owner(
        &self,
        id: &str,
    ) -> Result<(pastes::Model, users::Model), AppError> {
        let now = Utc::now();
        match Pastes::find_by_id(id.to_string())
            .find_also_related(Users)
            .one(&self.db)
            .await?
        {
            Some((paste, Some(owner))) if paste.is_live_at(now) => Ok((paste, owner)),
            _ => Err(AppError::NotFound("Paste not found".to_string())),
        }
    }

    /// Checks a candidate password against a live paste. Fails closed for
    /// pastes without a password.
    pub async fn verify_password(&self, id: &str, candidate: &str) -> Result<bool, AppError> {
        let paste = self.get(id).await?;
        Ok(check_password(&paste, candidate))
    }

    /// Deletes a paste on behalf of its owner or an admin.
    ///
    /// Expired rows that the sweeper has not reached yet can still be deleted.
    pub async fn delete(&self, id: &str, requester: &CurrentUser) -> Result<(), AppError> {
        let paste = Pastes::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Paste not found".to_string()))?;

        if !requester.can_manage(&paste.user_id) {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        if let Some(key) = &paste.file_path {
            if !self.storage.delete(key).await? {
                debug!("Backing file {} of paste {} was already gone", key, paste.id);
            }
        }

        Pastes::delete_by_id(paste.id.clone()).exec(&self.db).await?;
        info!("🗑️  Paste {} deleted by {}", paste.id, requester.username);
        Ok(())
    }

    /// Pastes whose expiry lies strictly before `now`.
    pub async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<pastes::Model>, DbErr> {
        Pastes::find()
            .filter(pastes::Column::ExpiresAt.is_not_null())
            .filter(pastes::Column::ExpiresAt.lt(now))
            .all(&self.db)
            .await
    }

    /// Best-effort removal used by the sweeper.
    ///
    /// The file is attempted first and its failure only logged; the row is
    /// deleted regardless. Returns whether this call removed the row.
    pub async fn purge(&self, paste: &pastes::Model) -> Result<bool, DbErr> {
        if let Some(key) = &paste.file_path {
            match self.storage.delete(key).await {
                Ok(true) => {}
                Ok(false) => warn!("Backing file {} of paste {} was already gone", key, paste.id),
                Err(e) => warn!("Failed to delete backing file {} of paste {}: {}", key, paste.id, e),
            }
        }

        let res = Pastes::delete_by_id(paste.id.clone()).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    /// Live pastes of one owner, newest first.
    pub async fn list_live_for_owner(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<pastes::Model>, DbErr> {
        Pastes::find()
            .filter(pastes::Column::UserId.eq(owner_id))
            .filter(
                Condition::any()
                    .add(pastes::Column::ExpiresAt.is_null())
                    .add(pastes::Column::ExpiresAt.gt(now)),
            )
            .order_by_desc(pastes::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Removes the backing files of every file paste owned by `owner_id`.
    /// Rows are left for the owner's cascade delete.
    pub async fn purge_owner_files(&self, owner_id: &str) -> Result<usize, DbErr> {
        let files = Pastes::find()
            .filter(pastes::Column::UserId.eq(owner_id))
            .filter(pastes::Column::FilePath.is_not_null())
            .all(&self.db)
            .await?;

        let mut removed = 0;
        for paste in files {
            if let Some(key) = &paste.file_path {
                match self.storage.delete(key).await {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => warn!("Failed to delete backing file {} of paste {}: {}", key, paste.id, e),
                }
            }
        }
        Ok(removed)
    }
}

/// True only when the paste has a password and `candidate` matches it.
pub fn check_password(paste: &pastes::Model, candidate: &str) -> bool {
    match &paste.password_hash {
        Some(hash) => password::verify_password(candidate, hash),
        None => false,
    }
}

/// Turns a requested lifetime in (possibly fractional) days into an expiry.
///
/// No value or a value `<= 0` means the paste never expires.
pub fn compute_expiry(
    days: Option<f64>,
    max_days: u32,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(days) = days else {
        return Ok(None);
    };
    if !days.is_finite() {
        return Err(AppError::Validation("Invalid expiration".to_string()));
    }
    if days <= 0.0 {
        return Ok(None);
    }
    if days > max_days as f64 {
        return Err(AppError::Validation(format!(
            "Expiration cannot exceed {} days",
            max_days
        )));
    }
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    Ok(Some(now + Duration::milliseconds(millis)))
}

/// `"Text Oct 18 09:05"` style label for unnamed pastes.
pub fn default_name(kind: PasteKind, now: DateTime<Utc>) -> String {
    format!("{} {}", kind.label(), now.format("%b %-d %H:%M"))
}
