use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::warn;

/// Blob key of the persisted user [`Settings`](crate::settings::Settings).
pub const KEY_SETTINGS: &str = "shortSettings_v1";

/// Blob key of the persisted rolling price history.
pub const KEY_PRICE_HISTORY: &str = "priceHistory_v1";

/// Blob key of the persisted alert acknowledgment set.
pub const KEY_ALERT_ACK: &str = "shortAlertAck_v2";

/// Errors raised while writing a blob. Reads never fail, a missing or unreadable blob is
/// treated as absent.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    #[error("blob store io: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialise blob: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable key → string store with no transactionality.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory [`BlobStore`], used by tests and as a fallback when no state dir is usable.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.blobs.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// [`BlobStore`] keeping one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a crash mid-write
/// leaves the previous blob in place.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open the store, creating `dir` if required.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path(key).ok()?;
        match fs::read_to_string(&path) {
            Ok(blob) => Some(blob),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                warn!(%error, path = %path.display(), "failed to read blob, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
