//! Persistent key-value storage for SDK state
//!
//! The SDK only ever keeps one value here, the access token, under a key
//! scoped to the application's client id. `FileStore` mirrors every change
//! to disk before returning, using an atomic temp-file + rename write.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Session-scoped storage owned by the host application.
///
/// `set(key, None)` removes the key.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: Option<&str>) -> Result<()>;
}

/// Key under which `key` is stored for the application `client_id`.
pub fn scoped_key(client_id: &str, key: &str) -> String {
    format!("tuenti_{client_id}_{key}")
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage("store lock poisoned".into()))
}

/// In-process store. Lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut values = lock(&self.values)?;
        match value {
            Some(value) => values.insert(key.to_owned(), value.to_owned()),
            None => values.remove(key),
        };
        Ok(())
    }
}

/// JSON file store, one object of string values.
///
/// The mutex serializes writes; reads are served from the in-memory copy,
/// which only changes once the file write has succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("reading store file: {e}")))?;
            let values: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Storage(format!("parsing store file: {e}")))?;
            info!(path = %path.display(), keys = values.len(), "loaded persistent store");
            values
        } else {
            info!(path = %path.display(), "store file not found, starting empty");
            let values = HashMap::new();
            write_atomic(&path, &values)?;
            values
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.state)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut state = lock(&self.state)?;
        let mut next = state.clone();
        let changed = match value {
            Some(value) => next.insert(key.to_owned(), value.to_owned()).as_deref() != Some(value),
            None => next.remove(key).is_some(),
        };
        if !changed {
            return Ok(());
        }
        write_atomic(&self.path, &next)?;
        *state = next;
        debug!(key, present = value.is_some(), "updated persistent store");
        Ok(())
    }
}

/// Write the map to a uniquely named temp file next to `path` and rename it
/// into place, 0600 on unix since the file holds access tokens.
fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Storage(format!("serializing store: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Storage(format!("creating temp store file: {e}")))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| Error::Storage(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Storage(format!("setting store file permissions: {e}")))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::Storage(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted store");
    Ok(())
}
