//! Persistence for the slice of client state that survives a restart.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{AuthState, Cart};

/// Errors reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("State file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("State storage lock poisoned")]
    Poisoned,
}

/// The persisted part of [`ClientState`](super::ClientState).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub auth: AuthState,
    #[serde(default)]
    pub cart: Cart,
}

/// Where persisted state lives.
pub trait StateStorage: Send + Sync {
    /// Load saved state; `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved state cannot be read or parsed.
    fn load(&self) -> Result<Option<PersistedState>, StorageError>;

    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, state: &PersistedState) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error if the saved state cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;
}

/// JSON file storage.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Saved client state");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: Mutex<Option<PersistedState>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        Ok(self.saved.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        *self.saved.lock().map_err(|_| StorageError::Poisoned)? = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.saved.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}
