//! Persistence of the progress state as a single JSON blob in a key-value store.
//!
//! The blob lives under [`STORAGE_KEY`]. Backends implement [`KeyValueStore`]:
//! - [`FileStore`]: one `<key>.json` file per key in a directory
//! - [`crate::db::SqliteStore`]: a `kv` table in a SQLite database
//! - [`MemoryStore`]: an in-process map, nothing survives the process

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::curriculum::Curriculum;
use crate::types::ProgressState;

/// Fixed key the progress blob is stored under
pub const STORAGE_KEY: &str = "ps_study_progress_v1";

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal string key-value contract, modelled on browser local storage
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Implementations must never leave a partially written value behind.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Any backend chosen at runtime
pub type DynStore = Box<dyn KeyValueStore + Send>;

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Directory-backed store: each key is a `<key>.json` file
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        // Write next to the target and rename over it so readers never see half a blob
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value).map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_error(&path))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

/// In-process store; contents are lost when it is dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far
    #[cfg(test)]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Why a stored blob was rejected
#[derive(Debug, Error)]
enum Rejected {
    #[error("invalid JSON: {0}")]
    Unparseable(#[from] serde_json::Error),

    #[error("week or task count differs from the curriculum")]
    ShapeMismatch,
}

/// Loads and saves the progress state under [`STORAGE_KEY`]
#[derive(Debug)]
pub struct ProgressStore<S> {
    store: S,
    curriculum: Curriculum,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S, curriculum: Curriculum) -> Self {
        Self { store, curriculum }
    }

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[cfg(test)]
    pub fn backend(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Load the stored state.
    ///
    /// A missing blob seeds a fresh state from the curriculum and saves it.
    /// A blob that does not parse, or whose week/task counts differ from the
    /// curriculum, is deleted and the load starts over.
    pub fn load(&mut self) -> Result<ProgressState, StoreError> {
        // One discard is enough: after `remove` the key is empty
        const MAX_ATTEMPTS: usize = 2;

        for _ in 0..MAX_ATTEMPTS {
            let Some(raw) = self.store.get(STORAGE_KEY)? else {
                info!(key = STORAGE_KEY, "No saved progress, starting fresh");
                return self.reseed();
            };

            match self.parse(&raw) {
                Ok(state) => {
                    debug!(
                        weeks = state.weeks.len(),
                        done = state.done_tasks(),
                        "Loaded saved progress"
                    );
                    return Ok(state);
                }
                Err(reason) => {
                    warn!(key = STORAGE_KEY, reason = %reason, "Discarding unreadable progress");
                    self.store.remove(STORAGE_KEY)?;
                }
            }
        }

        // Backend kept the bad blob despite `remove`; overwrite it instead
        self.reseed()
    }

    /// Serialize the full state and overwrite the stored blob
    pub fn save(&mut self, state: &ProgressState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        self.store.set(STORAGE_KEY, &json)?;
        debug!(bytes = json.len(), "Progress saved");
        Ok(())
    }

    fn reseed(&mut self) -> Result<ProgressState, StoreError> {
        let state = self.curriculum.seed();
        self.save(&state)?;
        Ok(state)
    }

    fn parse(&self, raw: &str) -> Result<ProgressState, Rejected> {
        let state: ProgressState = serde_json::from_str(raw)?;
        if !self.curriculum.matches_shape(&state) {
            return Err(Rejected::ShapeMismatch);
        }
        Ok(state)
    }
}
