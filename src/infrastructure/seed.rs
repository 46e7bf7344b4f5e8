use crate::entities::{prelude::*, *};
use crate::utils::{password, secrets};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("homepage_type", "user_list"),
    ("homepage_user", ""),
    ("max_expiration_days", "30"),
    ("max_file_size_mb", "10"),
];

pub const ADMIN_USERNAME: &str = "admin";

/// Inserts any missing default setting; existing values are left alone.
pub async fn seed_default_settings(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🌱 Seeding default settings...");

    for (key, value) in DEFAULT_SETTINGS {
        let exists = Settings::find_by_id(key.to_string()).one(db).await?;

        if exists.is_none() {
            let model = settings::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
            };
            model.insert(db).await?;
        }
    }

    Ok(())
}

/// Creates the `admin` account on first start.
///
/// Returns the generated password so the caller can show it once; `None`
/// when the account already exists.
pub async fn bootstrap_admin(db: &DatabaseConnection) -> anyhow::Result<Option<String>> {
    let existing = Users::find()
        .filter(users::Column::Username.eq(ADMIN_USERNAME))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(None);
    }

    let admin_password = secrets::new_memorable_password();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(ADMIN_USERNAME.to_string()),
        password_hash: Set(password::hash_password(&admin_password)?),
        is_admin: Set(true),
        created_at: Set(Utc::now()),
    };
    user.insert(db).await?;

    info!("{}", "=".repeat(50));
    info!("👑 Admin account created:");
    info!("   Username: {}", ADMIN_USERNAME);
    info!("   Password: {}", admin_password);
    info!("{}", "=".repeat(50));

    Ok(Some(admin_password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::run_migrations;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();

        seed_default_settings(&db).await.unwrap();
        let first = bootstrap_admin(&db).await.unwrap();
        seed_default_settings(&db).await.unwrap();
        let second = bootstrap_admin(&db).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(
            Settings::find().all(&db).await.unwrap().len(),
            DEFAULT_SETTINGS.len()
        );

        let admin = Users::find()
            .filter(users::Column::Username.eq(ADMIN_USERNAME))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);
        assert!(password::verify_password(&first.unwrap(), &admin.password_hash));
    }
}
