use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::{NumberOrString, ResolvedSettings};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
pub const DEFAULT_MAX_EXPIRATION_DAYS: u32 = 30;

pub const HOMEPAGE_USER_LIST: &str = "user_list";
pub const HOMEPAGE_USER_PAGE: &str = "user_page";

/// Partial update of the admin-editable settings. Absent fields are untouched.
#[derive(Debug, Default, Clone)]
pub struct SettingsUpdate {
    pub homepage_type: Option<String>,
    pub homepage_user: Option<String>,
    pub max_expiration_days: Option<NumberOrString>,
    pub max_file_size_mb: Option<NumberOrString>,
}

pub struct SettingsService;

impl SettingsService {
    pub async fn get<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<String>, DbErr> {
        Ok(Settings::find_by_id(key.to_string())
            .one(db)
            .await?
            .map(|s| s.value))
    }

    pub async fn get_all<C: ConnectionTrait>(db: &C) -> Result<BTreeMap<String, String>, DbErr> {
        Ok(Settings::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.key, s.value))
            .collect())
    }

    /// Reads the current paste limits. Call once per operation; admins can
    /// change them at any time.
    pub async fn resolve<C: ConnectionTrait>(db: &C) -> Result<ResolvedSettings, DbErr> {
        let rows = Settings::find()
            .filter(settings::Column::Key.is_in(["max_file_size_mb", "max_expiration_days"]))
            .all(db)
            .await?;

        let mut size_mb = None;
        let mut days = None;
        for row in rows {
            match row.key.as_str() {
                "max_file_size_mb" => size_mb = parse_positive::<u64>(&row.value),
                "max_expiration_days" => days = parse_positive::<u32>(&row.value),
                _ => {}
            }
        }

        Ok(ResolvedSettings {
            max_file_size_bytes: size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB) * 1024 * 1024,
            max_expiration_days: days.unwrap_or(DEFAULT_MAX_EXPIRATION_DAYS),
        })
    }

    /// Validates every field first, then writes them in one transaction.
    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        update: SettingsUpdate,
    ) -> Result<(), AppError> {
        let mut writes: Vec<(&str, String)> = Vec::new();

        if let Some(kind) = update.homepage_type.filter(|k| !k.is_empty()) {
            if kind != HOMEPAGE_USER_LIST && kind != HOMEPAGE_USER_PAGE {
                return Err(AppError::Validation("Invalid homepage type".to_string()));
            }
            writes.push(("homepage_type", kind));
        }

        if let Some(username) = update.homepage_user {
            if !username.is_empty() {
                let exists = Users::find()
                    .filter(users::Column::Username.eq(&username))
                    .one(db)
                    .await?
                    .is_some();
                if !exists {
                    return Err(AppError::Validation("User not found".to_string()));
                }
            }
            writes.push(("homepage_user", username));
        }

        if let Some(raw) = update.max_expiration_days {
            let days = whole_number_in(&raw, 1, 365)
                .ok_or_else(|| AppError::Validation("Max expiration must be 1-365 days".to_string()))?;
            writes.push(("max_expiration_days", days.to_string()));
        }

        if let Some(raw) = update.max_file_size_mb {
            let size = whole_number_in(&raw, 1, 100)
                .ok_or_else(|| AppError::Validation("Max file size must be 1-100 MB".to_string()))?;
            writes.push(("max_file_size_mb", size.to_string()));
        }

        let txn = db.begin().await?;
        for (key, value) in writes {
            Self::upsert(&txn, key, value).await?;
        }
        txn.commit().await?;

        tracing::info!("⚙️  Settings updated");
        Ok(())
    }

    async fn upsert<C: ConnectionTrait>(db: &C, key: &str, value: String) -> Result<(), DbErr> {
        match Settings::find_by_id(key.to_string()).one(db).await? {
            Some(existing) => {
                let mut active: settings::ActiveModel = existing.into();
                active.value = Set(value);
                active.update(db).await?;
            }
            None => {
                settings::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value),
                }
                .insert(db)
                .await?;
            }
        }
        Ok(())
    }
}

fn parse_positive<T: std::str::FromStr + PartialOrd + Default>(raw: &str) -> Option<T> {
    raw.trim().parse::<T>().ok().filter(|v| *v > T::default())
}

/// Truncates like an integer parse, then range-checks.
fn whole_number_in(raw: &NumberOrString, min: i64, max: i64) -> Option<i64> {
    let value = raw.to_f64().ok().flatten()?;
    if !value.is_finite() {
        return None;
    }
    let value = value.trunc() as i64;
    (min..=max).contains(&value).then_some(value)
}
