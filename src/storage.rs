//! Durable key/value storage with JSON values.
//!
//! Keys:
//!   - `institutional_branding`
//!   - `local_user_profile`
//!   - `archive_<userId>`
//!   - `quiz_progress_<worksheetId>`
//!   - `quiz_history_<worksheetId>`
//!
//! Reads and writes are synchronous and unbuffered. The file store keeps one
//! `<key>.json` file per key; writes go through a temp file + rename so a
//! crash never leaves a half-written value behind.

use std::{
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
};
#[cfg(test)]
use std::{collections::HashMap, sync::RwLock};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::StudioError;

pub const BRANDING_KEY: &str = "institutional_branding";
pub const PROFILE_KEY: &str = "local_user_profile";

pub fn archive_key(user_id: &str) -> String {
  format!("archive_{user_id}")
}

pub fn quiz_progress_key(worksheet_id: &str) -> String {
  format!("quiz_progress_{worksheet_id}")
}

pub fn quiz_history_key(worksheet_id: &str) -> String {
  format!("quiz_history_{worksheet_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("io error on {key}: {source}")]
  Io { key: String, source: std::io::Error },
  #[error("serialization error on {key}: {source}")]
  Serde { key: String, source: serde_json::Error },
  #[error("storage lock poisoned")]
  Poisoned,
}

impl From<StorageError> for StudioError {
  fn from(e: StorageError) -> Self {
    StudioError::Storage(e.to_string())
  }
}

pub trait KvStore: Send + Sync {
  fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError>;
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value. Corrupt values are logged and treated as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StorageError> {
  let Some(raw) = store.get_raw(key)? else {
    return Ok(None);
  };
  match serde_json::from_str::<T>(&raw) {
    Ok(v) => Ok(Some(v)),
    Err(e) => {
      warn!(target: "storage", %key, error = %e, "Discarding unreadable stored value");
      Ok(None)
    }
  }
}

pub fn save_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError> {
  let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde { key: key.to_string(), source })?;
  store.put_raw(key, &raw)
}

/// Injective file stem for a key: `[A-Za-z0-9_-]` pass through, every other
/// byte becomes `%XX`, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
  let mut out = String::with_capacity(key.len());
  for b in key.bytes() {
    if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
      out.push(b as char);
    } else {
      out.push_str(&format!("%{b:02X}"));
    }
  }
  out
}

/// One JSON file per key under a data directory.
pub struct FileStore {
  root: PathBuf,
}

impl FileStore {
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let root = root.into();
    fs::create_dir_all(&root).map_err(|source| StorageError::Io { key: root.display().to_string(), source })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.root.join(format!("{}.json", encode_key(key)))
  }
}

impl KvStore for FileStore {
  fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(source) => Err(StorageError::Io { key: key.to_string(), source }),
    }
  }

  fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let path = self.path_for(key);
    let tmp = path.with_extension("json.tmp");
    let io = |source| StorageError::Io { key: key.to_string(), source };
    fs::write(&tmp, value).map_err(io)?;
    fs::rename(&tmp, &path).map_err(io)?;
    debug!(target: "storage", %key, bytes = value.len(), "Stored value");
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    match fs::remove_file(self.path_for(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(source) => Err(StorageError::Io { key: key.to_string(), source }),
    }
  }
}

/// Process-local store backing the test fixtures.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  values: RwLock<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl KvStore for MemoryStore {
  fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
    let values = self.values.read().map_err(|_| StorageError::Poisoned)?;
    Ok(values.get(key).cloned())
  }

  fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut values = self.values.write().map_err(|_| StorageError::Poisoned)?;
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut values = self.values.write().map_err(|_| StorageError::Poisoned)?;
    values.remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("studio-store-{}", uuid::Uuid::new_v4()))
  }

  #[test]
  fn file_store_round_trips_and_removes() {
    let dir = scratch_dir();
    let store = FileStore::open(&dir).unwrap();
    assert_eq!(store.get_raw("archive_u1").unwrap(), None);

    save_json(&store, "archive_u1", &vec![1, 2, 3]).unwrap();
    let back: Option<Vec<i32>> = load_json(&store, "archive_u1").unwrap();
    assert_eq!(back, Some(vec![1, 2, 3]));

    store.remove("archive_u1").unwrap();
    store.remove("archive_u1").unwrap();
    assert_eq!(store.get_raw("archive_u1").unwrap(), None);
    let _ = fs::remove_dir_all(dir);
  }

  #[test]
  fn distinct_keys_never_share_a_file() {
    let dir = scratch_dir();
    let store = FileStore::open(&dir).unwrap();
    save_json(&store, &archive_key("team.a"), &vec!["secret-doc"]).unwrap();

    let other: Option<Vec<String>> = load_json(&store, &archive_key("team_a")).unwrap();
    assert_eq!(other, None);
    let same: Option<Vec<String>> = load_json(&store, &archive_key("team.a")).unwrap();
    assert_eq!(same, Some(vec!["secret-doc".to_string()]));

    assert_eq!(encode_key("archive_../etc"), "archive_%2E%2E%2Fetc");
    assert_ne!(encode_key("a%2Eb"), encode_key("a.b"));
    let _ = fs::remove_dir_all(dir);
  }

  #[test]
  fn corrupt_values_read_as_absent() {
    let store = MemoryStore::new();
    store.put_raw(BRANDING_KEY, "{not json").unwrap();
    let v: Option<serde_json::Value> = load_json(&store, BRANDING_KEY).unwrap();
    assert!(v.is_none());
  }

  #[test]
  fn keys_follow_storage_layout() {
    assert_eq!(archive_key("abc"), "archive_abc");
    assert_eq!(quiz_progress_key("w1"), "quiz_progress_w1");
    assert_eq!(quiz_history_key("w1"), "quiz_history_w1");
  }
}
