use crate::entities::{invite_code_uses, invite_codes, pastes, settings, users};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Statement};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", db_url);

    if let Some(dir) = sqlite_parent_dir(db_url) {
        tokio::fs::create_dir_all(&dir).await?;
    }

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Directory holding a file-backed SQLite database, if any.
fn sqlite_parent_dir(db_url: &str) -> Option<std::path::PathBuf> {
    let path = db_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or("");
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Parents before children for the foreign keys
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "pastes",
            schema
                .create_table_from_entity(pastes::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "settings",
            schema
                .create_table_from_entity(settings::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "invite_codes",
            schema
                .create_table_from_entity(invite_codes::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "invite_code_uses",
            schema
                .create_table_from_entity(invite_code_uses::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        db.execute(builder.build(&stmt)).await?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_pastes_user_id ON pastes(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_pastes_expires_at ON pastes(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_invite_code_uses_code_id ON invite_code_uses(invite_code_id)",
    ];

    for query in indexes {
        if let Err(e) = db
            .execute(Statement::from_string(builder, query.to_owned()))
            .await
        {
            tracing::warn!("   - Index creation warning: {} -> {}", query, e);
        }
    }

    Ok(())
}
