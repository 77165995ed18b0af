use std::collections::HashMap;

use crate::errors::CoreError;

/// A persistent string key-value store, the local-storage equivalent the
/// ledger keeps its transactions in.
///
/// The ledger only ever uses a single slot, but backends are plain maps so
/// they can be shared with other data.
pub trait KeyValueStore {
    /// Human-readable name of the backend (for logs/errors).
    fn name(&self) -> &str;

    /// Read the value under `key`. `Ok(None)` if the slot was never written.
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), CoreError>;
}

/// In-memory backend. Nothing survives the process; used by tests and by
/// hosts that persist the bytes themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::KeyValueStore;
    use crate::errors::CoreError;

    /// Directory-backed store (native only): one `<key>.json` file per slot.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        dir: PathBuf,
    }

    impl FileStore {
        /// Open a store rooted at `dir`, creating the directory if needed.
        pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
            let dir = dir.into();
            std::fs::create_dir_all(&dir)?;
            Ok(Self { dir })
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }

        /// File backing `key`. Keys are restricted so a slot can never
        /// escape the store directory.
        pub fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
                && !key.starts_with('.');
            if !valid {
                return Err(CoreError::Storage {
                    backend: self.name().to_string(),
                    message: format!("invalid slot key '{key}'"),
                });
            }
            Ok(self.dir.join(format!("{key}.json")))
        }
    }

    impl KeyValueStore for FileStore {
        fn name(&self) -> &str {
            "file"
        }

        fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
            let path = self.path_for(key)?;
            match std::fs::read_to_string(&path) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        /// Writes to a sibling temp file and renames it over the slot, so a
        /// crash mid-write leaves the previous value intact.
        fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
            let path = self.path_for(key)?;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, value)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), CoreError> {
            let path = self.path_for(key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}
