//! Object storage for shared artifacts and logos.
//!
//! `LocalObjectStore` writes into a directory that the router serves under
//! `/files`, and hands back an absolute public URL.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{StudioError, StudioResult};
use crate::util::sanitize_key;

/// Object names come from document titles; keep file names well under OS limits.
const MAX_STEM_CHARS: usize = 64;

#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Store `bytes` and return a public URL.
  async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> StudioResult<String>;
}

pub struct LocalObjectStore {
  root: PathBuf,
  public_base: String,
}

impl LocalObjectStore {
  pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
    Self { root: root.into(), public_base: public_base.trim_end_matches('/').to_string() }
  }
}

fn extension_for(content_type: &str) -> &'static str {
  match content_type {
    "image/png" => "png",
    "image/jpeg" => "jpg",
    "image/svg+xml" => "svg",
    "image/webp" => "webp",
    "text/markdown" => "md",
    "application/pdf" => "pdf",
    "application/json" => "json",
    _ => "bin",
  }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
  #[instrument(level = "info", skip(self, bytes), fields(%name, size = bytes.len(), %content_type))]
  async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> StudioResult<String> {
    if bytes.is_empty() {
      return Err(StudioError::Upload("refusing to store an empty object".into()));
    }
    tokio::fs::create_dir_all(&self.root)
      .await
      .map_err(|e| StudioError::Upload(format!("cannot prepare object directory: {e}")))?;

    // unique prefix so repeated shares never overwrite each other
    let stem: String = sanitize_key(name).chars().take(MAX_STEM_CHARS).collect();
    let file_name = format!("{}-{}.{}", Uuid::new_v4().simple(), stem, extension_for(content_type));
    tokio::fs::write(self.root.join(&file_name), &bytes)
      .await
      .map_err(|e| StudioError::Upload(e.to_string()))?;

    let url = format!("{}/files/{}", self.public_base, file_name);
    info!(target: "studio", %url, "Object stored");
    Ok(url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn stores_file_and_returns_public_url() {
    let dir = std::env::temp_dir().join(format!("studio-objects-{}", Uuid::new_v4()));
    let store = LocalObjectStore::new(&dir, "http://localhost:3000/");
    let url = store.put("My Quiz", b"# Quiz".to_vec(), "text/markdown").await.unwrap();
    assert!(url.starts_with("http://localhost:3000/files/"));
    assert!(url.ends_with("-My_Quiz.md"));

    let file_name = url.rsplit('/').next().unwrap();
    assert_eq!(std::fs::read(dir.join(file_name)).unwrap(), b"# Quiz");

    let long_title = "Unit 4 review ".repeat(40);
    let url = store.put(&long_title, b"# Review".to_vec(), "text/markdown").await.unwrap();
    let file_name = url.rsplit('/').next().unwrap();
    assert!(file_name.len() <= 32 + 1 + MAX_STEM_CHARS + 3);
    assert!(dir.join(file_name).exists());

    let err = store.put("empty", vec![], "image/png").await.unwrap_err();
    assert!(matches!(err, StudioError::Upload(_)));
    let _ = std::fs::remove_dir_all(dir);
  }
}
