//! Key-value storage backends for the persisted session.
//!
//! The session persists exactly two logical keys: the bearer token and the
//! serialized user identity. Backends only move strings; the
//! [`SessionStore`](super::SessionStore) owns the encoding of the user.
//!
//! # File Format
//!
//! ```json
//! {
//!   "token": "eyJhbGciOiJIUzI1NiIs...",
//!   "user": "{\"id\":1,\"username\":\"admin\",...}"
//! }
//! ```

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::ClientError;

/// The two keys a session is allowed to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Token,
    User,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Token => "token",
            StorageKey::User => "user",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "token" => Some(StorageKey::Token),
            "user" => Some(StorageKey::User),
            _ => None,
        }
    }
}

/// Storage backend for persisted session values.
///
/// Implementations use interior mutability so one backend can be shared
/// between the session store and the request pipeline.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: StorageKey) -> Result<Option<String>, ClientError>;

    /// Overwrites any existing value for `key`.
    fn set(&self, key: StorageKey, value: &str) -> Result<(), ClientError>;

    /// Returns `Ok(())` even if nothing was stored.
    fn remove(&self, key: StorageKey) -> Result<(), ClientError>;

    /// Stores token and user together. Either both land or the previous
    /// token is put back.
    fn set_session(&self, token: &str, user_json: &str) -> Result<(), ClientError> {
        let previous = self.get(StorageKey::Token)?;
        self.set(StorageKey::Token, token)?;
        if let Err(e) = self.set(StorageKey::User, user_json) {
            let restored = match previous {
                Some(prev) => self.set(StorageKey::Token, &prev),
                None => self.remove(StorageKey::Token),
            };
            if let Err(restore_err) = restored {
                tracing::warn!(error = %restore_err, "Failed to restore previous session token");
            }
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.remove(StorageKey::Token)?;
        self.remove(StorageKey::User)
    }
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: Mutex<BTreeMap<StorageKey, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: StorageKey) -> Result<Option<String>, ClientError> {
        Ok(self.values.lock().get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), ClientError> {
        self.values.lock().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), ClientError> {
        self.values.lock().remove(&key);
        Ok(())
    }

    fn set_session(&self, token: &str, user_json: &str) -> Result<(), ClientError> {
        let mut values = self.values.lock();
        values.insert(StorageKey::Token, token.to_string());
        values.insert(StorageKey::User, user_json.to_string());
        Ok(())
    }
}

/// JSON-file storage with owner-only permissions on Unix.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written session behind.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    cache: Mutex<BTreeMap<StorageKey, String>>,
}

impl FileSessionStorage {
    /// Default location: `<config dir>/vortexia/session.json`
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("vortexia").join("session.json")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".vortexia").join("session.json")
        } else {
            PathBuf::from(".vortexia").join("session.json")
        }
    }

    /// Open the storage file, reading any values already on disk.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let cache = Self::read_file(&path)?;
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<BTreeMap<StorageKey, String>, ClientError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ClientError::Storage(format!("cannot read {}: {}", path.display(), e))
        })?;

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, String> = serde_json::from_str(&contents).map_err(|e| {
            ClientError::Storage(format!(
                "corrupted session file {}: {}. Delete it and log in again.",
                path.display(),
                e
            ))
        })?;

        let values = raw
            .into_iter()
            .filter_map(|(k, v)| match StorageKey::from_name(&k) {
                Some(key) => Some((key, v)),
                None => {
                    tracing::debug!(key = %k, "Ignoring unknown session key");
                    None
                }
            })
            .collect();

        Ok(values)
    }

    fn write_file(&self, values: &BTreeMap<StorageKey, String>) -> Result<(), ClientError> {
        if values.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| {
                    ClientError::Storage(format!("cannot remove {}: {}", self.path.display(), e))
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ClientError::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let document: BTreeMap<&str, &str> = values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let contents = serde_json::to_string_pretty(&document)?;

        let tmp_path = self.path.with_extension("json.tmp");
        create_private(&tmp_path)
            .and_then(|mut file| {
                file.write_all(contents.as_bytes())?;
                file.sync_all()
            })
            .map_err(|e| {
                ClientError::Storage(format!("cannot write {}: {}", tmp_path.display(), e))
            })?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            ClientError::Storage(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: StorageKey) -> Result<Option<String>, ClientError> {
        Ok(self.cache.lock().get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), ClientError> {
        let mut cache = self.cache.lock();
        let mut next = cache.clone();
        next.insert(key, value.to_string());
        self.write_file(&next)?;
        *cache = next;
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), ClientError> {
        let mut cache = self.cache.lock();
        if !cache.contains_key(&key) {
            return Ok(());
        }
        let mut next = cache.clone();
        next.remove(&key);
        self.write_file(&next)?;
        *cache = next;
        Ok(())
    }

    fn set_session(&self, token: &str, user_json: &str) -> Result<(), ClientError> {
        let mut cache = self.cache.lock();
        let mut next = cache.clone();
        next.insert(StorageKey::Token, token.to_string());
        next.insert(StorageKey::User, user_json.to_string());
        self.write_file(&next)?;
        *cache = next;
        Ok(())
    }
}

/// Create a fresh file that is owner-only from the moment it exists.
fn create_private(path: &Path) -> io::Result<fs::File> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
