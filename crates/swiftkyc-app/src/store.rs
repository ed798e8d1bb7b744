//! Durable client storage for the current session id.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use swiftkyc_core::SessionId;
use thiserror::Error;

/// Persists the one session id that survives restarts.
pub trait SessionStore: Send + Sync {
    /// Reads the stored id, if any.
    ///
    /// # Errors
    /// Returns [`StoreError`] when storage exists but cannot be read.
    fn load(&self) -> Result<Option<SessionId>, StoreError>;

    /// Replaces the stored id.
    ///
    /// # Errors
    /// Returns [`StoreError`] when storage cannot be written.
    fn save(&self, session_id: &SessionId) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    swiftkyc_session_id: SessionId,
}

/// JSON-file backed store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store at `path`; the file is created on first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionId>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StoreError::Io(error.to_string())),
        };
        let stored: StoredSession =
            serde_json::from_str(&raw).map_err(|error| StoreError::Corrupt(error.to_string()))?;
        Ok(Some(stored.swiftkyc_session_id))
    }

    fn save(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(&StoredSession {
            swiftkyc_session_id: session_id.clone(),
        })
        .map_err(|error| StoreError::Corrupt(error.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| StoreError::Io(error.to_string()))?;
        }
        std::fs::write(&self.path, body).map_err(|error| StoreError::Io(error.to_string()))
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<SessionId>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `session_id`.
    pub fn with_session(session_id: SessionId) -> Self {
        Self {
            slot: Mutex::new(Some(session_id)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionId>, StoreError> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| StoreError::Io("session store lock poisoned".to_string()))
    }

    fn save(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| StoreError::Io("session store lock poisoned".to_string()))?;
        *slot = Some(session_id.clone());
        Ok(())
    }
}

/// Storage error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("session storage i/o failure: {0}")]
    Io(String),
    /// Stored content is not a valid session record.
    #[error("session storage is corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for session persistence.

    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("swiftkyc-store-{}-{name}", std::process::id()))
            .join("session.json")
    }

    #[test]
    fn file_store_round_trips_and_replaces() {
        let path = scratch_path("round-trip");
        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().expect("missing file is empty"), None);

        store.save(&SessionId::new("S1").expect("id")).expect("save");
        store.save(&SessionId::new("S2").expect("id")).expect("save");
        assert_eq!(
            store.load().expect("load").map(|id| id.as_str().to_string()),
            Some("S2".to_string())
        );

        let raw = std::fs::read_to_string(&path).expect("file exists");
        assert!(raw.contains(swiftkyc_core::SESSION_STORAGE_KEY));
        let _ = std::fs::remove_dir_all(path.parent().expect("scratch dir"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = scratch_path("corrupt");
        std::fs::create_dir_all(path.parent().expect("scratch dir")).expect("mkdir");
        std::fs::write(&path, "not json").expect("write");

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
        let _ = std::fs::remove_dir_all(path.parent().expect("scratch dir"));
    }
}
