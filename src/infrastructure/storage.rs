use crate::services::storage::LocalStorageService;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(upload_dir: &str) -> anyhow::Result<Arc<LocalStorageService>> {
    tokio::fs::create_dir_all(upload_dir).await?;
    info!("🗄️  Upload directory: {}", upload_dir);
    Ok(Arc::new(LocalStorageService::new(upload_dir)))
}
