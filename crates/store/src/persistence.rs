//! Where the local state record lives
//!
//! The file backend writes pretty JSON through a temp file in the same directory
//! and an atomic rename, copying the previous file to `<name>.backup` first.

use crate::error::{StoreError, StoreResult};
use crate::state::PersistedState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;

/// Storage backend for the state record
pub trait StatePersistence: Send + Sync {
    /// Loads the record, `Ok(None)` when nothing was saved yet
    fn load(&self) -> StoreResult<Option<PersistedState>>;

    /// Replaces the stored record
    fn save(&self, state: &PersistedState) -> StoreResult<()>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStatePersistence {
    path: PathBuf,
}

impl FileStatePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the previous record, refreshed on every save
    pub fn backup_path(&self) -> PathBuf {
        self.sibling("backup")
    }

    /// Where an unreadable record is moved aside
    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling("corrupt")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn set_aside(&self, reason: String) -> StoreError {
        let aside = self.corrupt_path();
        match fs::rename(&self.path, &aside) {
            Ok(()) => log::warn!(
                "State file {} is unreadable ({}), moved to {}",
                self.path.display(),
                reason,
                aside.display()
            ),
            Err(e) => log::error!(
                "State file {} is unreadable ({}) and could not be moved: {}",
                self.path.display(),
                reason,
                e
            ),
        }
        StoreError::Corrupted {
            path: self.path.clone(),
            reason,
        }
    }
}

impl StatePersistence for FileStatePersistence {
    fn load(&self) -> StoreResult<Option<PersistedState>> {
        if !self.path.exists() {
            log::info!("No state file at {}, starting fresh", self.path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Err(self.set_aside("file is empty".to_string()));
        }

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(e) => Err(self.set_aside(e.to_string())),
        }
    }

    fn save(&self, state: &PersistedState) -> StoreResult<()> {
        let persist_err = |source: std::io::Error| StoreError::Persist {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(persist_err)?;

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path()).map_err(persist_err)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let mut temp = NamedTempFile::new_in(&dir).map_err(persist_err)?;
        temp.write_all(json.as_bytes()).map_err(persist_err)?;
        temp.flush().map_err(persist_err)?;
        temp.persist(&self.path).map_err(|e| persist_err(e.error))?;

        log::debug!("State saved to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStatePersistence {
    slot: Arc<Mutex<MemorySlot>>,
}

#[derive(Debug, Default)]
struct MemorySlot {
    state: Option<PersistedState>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStatePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `state`
    pub fn with_state(state: PersistedState) -> Self {
        let persistence = Self::new();
        persistence.lock().state = Some(state);
        persistence
    }

    /// The last saved record
    pub fn stored(&self) -> Option<PersistedState> {
        self.lock().state.clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Makes every following save fail
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatePersistence for MemoryStatePersistence {
    fn load(&self) -> StoreResult<Option<PersistedState>> {
        Ok(self.lock().state.clone())
    }

    fn save(&self, state: &PersistedState) -> StoreResult<()> {
        let mut slot = self.lock();
        if slot.fail_saves {
            return Err(StoreError::Persist {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("save failure injected"),
            });
        }
        slot.state = Some(state.clone());
        slot.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
