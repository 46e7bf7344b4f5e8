use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::utils::{auth::create_jwt, password, validation::validate_username};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

pub struct Registration {
    pub username: String,
    pub password: String,
    pub invite_code: String,
}

pub struct AccountService;

impl AccountService {
    /// Creates an account from an enabled invite code.
    ///
    /// The user row and the invite-use audit row are written in one
    /// transaction, so neither exists without the other.
    pub async fn register(
        db: &DatabaseConnection,
        registration: Registration,
    ) -> Result<users::Model, AppError> {
        let Registration {
            username,
            password: plain,
            invite_code,
        } = registration;

        if username.is_empty() || plain.is_empty() || invite_code.is_empty() {
            return Err(AppError::Validation(
                "Username, password, and invite code required".to_string(),
            ));
        }
        validate_username(&username)?;

        let password_hash = password::hash_password(&plain)?;
        let now = Utc::now();

        let txn = db.begin().await?;

        let taken = Users::find()
            .filter(users::Column::Username.eq(&username))
            .one(&txn)
            .await?
            .is_some();
        if taken {
            return Err(AppError::Validation("Username already taken".to_string()));
        }

        let invite = InviteCodes::find()
            .filter(invite_codes::Column::Code.eq(invite_code.trim()))
            .filter(invite_codes::Column::Disabled.eq(false))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid invite code".to_string()))?;

        let user = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(username.clone()),
            password_hash: Set(password_hash),
            is_admin: Set(false),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Validation("Username already taken".to_string())
            }
            _ => AppError::Database(e),
        })?;

        invite_code_uses::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            invite_code_id: Set(invite.id),
            user_id: Set(user.id.clone()),
            used_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!("👤 Registered user {} with invite {}", user.username, invite.code);
        Ok(user)
    }

    /// Admin console login. Non-admin accounts are turned away even with the
    /// right password.
    pub async fn login_admin(
        db: &DatabaseConnection,
        username: &str,
        candidate: &str,
        secret: &str,
        ttl_hours: i64,
    ) -> Result<(String, users::Model), AppError> {
        if username.is_empty() || candidate.is_empty() {
            return Err(AppError::Validation(
                "Username and password required".to_string(),
            ));
        }

        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Admin access only".to_string()));
        }

        if !password::verify_password(candidate, &user.password_hash) {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = create_jwt(&user.id, secret, ttl_hours)?;
        Ok((token, user))
    }

    /// Owner login from a user page.
    pub async fn unlock(
        db: &DatabaseConnection,
        username: &str,
        candidate: &str,
        secret: &str,
        ttl_hours: i64,
    ) -> Result<(String, users::Model), AppError> {
        if candidate.is_empty() {
            return Err(AppError::Validation("Password required".to_string()));
        }

        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !password::verify_password(candidate, &user.password_hash) {
            return Err(AppError::Unauthorized("Invalid password".to_string()));
        }

        let token = create_jwt(&user.id, secret, ttl_hours)?;
        Ok((token, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{database::run_migrations, seed::bootstrap_admin};
    use sea_orm::{Database, PaginatorTrait};

    async fn setup() -> (DatabaseConnection, users::Model) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();
        bootstrap_admin(&db).await.unwrap();
        let admin = Users::find()
            .filter(users::Column::IsAdmin.eq(true))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        (db, admin)
    }

    async fn invite(db: &DatabaseConnection, creator: &str, code: &str, disabled: bool) {
        invite_codes::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            code: Set(code.to_string()),
            created_by: Set(creator.to_string()),
            disabled: Set(disabled),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();
    }

    fn reg(username: &str, code: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "pw".to_string(),
            invite_code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_invite_codes_are_multi_use_and_audited() {
        let (db, admin) = setup().await;
        invite(&db, &admin.id, "ember-quartz", false).await;

        AccountService::register(&db, reg("alice", "ember-quartz"))
            .await
            .unwrap();
        AccountService::register(&db, reg("bob", "ember-quartz"))
            .await
            .unwrap();

        assert_eq!(InviteCodeUses::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_registration_writes_nothing() {
        let (db, admin) = setup().await;
        invite(&db, &admin.id, "off-code", true).await;

        let err = AccountService::register(&db, reg("carol", "off-code"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Invalid invite code"));
        assert!(
            Users::find()
                .filter(users::Column::Username.eq("carol"))
                .one(&db)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(InviteCodeUses::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_reserved_usernames() {
        let (db, admin) = setup().await;
        invite(&db, &admin.id, "a-b", false).await;
        AccountService::register(&db, reg("dave", "a-b")).await.unwrap();

        let dup = AccountService::register(&db, reg("dave", "a-b")).await;
        assert!(matches!(dup, Err(AppError::Validation(msg)) if msg == "Username already taken"));

        let reserved = AccountService::register(&db, reg("Admin", "a-b")).await;
        assert!(matches!(reserved, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_admin_rejects_regular_users() {
        let (db, admin) = setup().await;
        invite(&db, &admin.id, "x-y", false).await;
        AccountService::register(&db, reg("erin", "x-y")).await.unwrap();

        let res = AccountService::login_admin(&db, "erin", "pw", "s", 24).await;
        assert!(matches!(res, Err(AppError::Forbidden(_))));

        let res = AccountService::login_admin(&db, "nobody", "pw", "s", 24).await;
        assert!(matches!(res, Err(AppError::Unauthorized(_))));

        let (token, user) = AccountService::unlock(&db, "erin", "pw", "s", 24)
            .await
            .unwrap();
        assert_eq!(user.username, "erin");
        assert!(!token.is_empty());
    }
}
