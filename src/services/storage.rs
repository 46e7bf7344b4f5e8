use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

const COPY_BUFFER: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file accepted into storage under a server-chosen key.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub key: String,
    pub size: i64,
}

pub struct StoredObject {
    pub reader: Box<dyn AsyncRead + Unpin + Send>,
    pub size: u64,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Streams `reader` into a new object. Anything over `max_size` bytes is
    /// refused and the partial object removed before returning.
    async fn stage_stream<'a>(
        &self,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
        max_size: u64,
        extension: Option<&str>,
    ) -> Result<StagedFile, StorageError>;

    /// `Ok(None)` when the object does not exist.
    async fn open(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Removes an object. `Ok(false)` means it was already gone.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Stores objects as flat files inside one directory.
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn new_key(extension: Option<&str>) -> String {
        let ext: String = extension
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(16)
            .collect::<String>()
            .to_lowercase();

        if ext.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), ext)
        }
    }

    async fn copy_capped<'a>(
        mut reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
        file: &mut fs::File,
        max_size: u64,
    ) -> Result<u64, StorageError> {
        let mut buffer = vec![0u8; COPY_BUFFER];
        let mut total: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > max_size {
                return Err(StorageError::TooLarge { limit: max_size });
            }
            file.write_all(&buffer[..n]).await?;
        }

        file.flush().await?;
        Ok(total)
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn stage_stream<'a>(
        &self,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
        max_size: u64,
        extension: Option<&str>,
    ) -> Result<StagedFile, StorageError> {
        let key = Self::new_key(extension);
        let path = self.path_for(&key)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        match Self::copy_capped(reader, &mut file, max_size).await {
            Ok(size) => Ok(StagedFile {
                key,
                size: size as i64,
            }),
            Err(e) => {
                drop(file);
                if let Err(rm) = fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove partial upload {}: {}", key, rm);
                }
                Err(e)
            }
        }
    }

    async fn open(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.path_for(key)?;
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok(Some(StoredObject {
            reader: Box::new(file),
            size,
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}
