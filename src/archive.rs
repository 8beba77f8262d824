//! Archive store: per-workspace list of generated documents, newest-first,
//! capped at `ARCHIVE_CAP` entries.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::GeneratedDocument;
use crate::error::{StudioError, StudioResult};
use crate::storage::{archive_key, load_json, save_json, KvStore};

pub const ARCHIVE_CAP: usize = 100;

/// Prepend `new_items` (in their given order) ahead of `existing`, keeping at most `cap`.
pub fn prepend_capped<T>(existing: Vec<T>, new_items: Vec<T>, cap: usize) -> Vec<T> {
  let mut out = new_items;
  out.extend(existing);
  out.truncate(cap);
  out
}

#[derive(Clone)]
pub struct ArchiveStore {
  store: Arc<dyn KvStore>,
  // serializes read-modify-write cycles inside this process
  write_lock: Arc<Mutex<()>>,
}

impl ArchiveStore {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self { store, write_lock: Arc::new(Mutex::new(())) }
  }

  #[instrument(level = "debug", skip(self), fields(%workspace))]
  pub fn load(&self, workspace: &str) -> StudioResult<Vec<GeneratedDocument>> {
    Ok(load_json(self.store.as_ref(), &archive_key(workspace))?.unwrap_or_default())
  }

  /// Prepend `docs` and write back. Returns the retained archive.
  #[instrument(level = "info", skip(self, docs), fields(%workspace, added = docs.len()))]
  pub async fn append(&self, workspace: &str, docs: Vec<GeneratedDocument>) -> StudioResult<Vec<GeneratedDocument>> {
    let _guard = self.write_lock.lock().await;
    let before = self.load(workspace)?;
    let previous = before.len();
    let merged = prepend_capped(before, docs, ARCHIVE_CAP);
    save_json(self.store.as_ref(), &archive_key(workspace), &merged)?;
    info!(target: "archive", %workspace, previous, retained = merged.len(), "Archive updated");
    Ok(merged)
  }

  pub fn get(&self, workspace: &str, id: &str) -> StudioResult<GeneratedDocument> {
    self
      .load(workspace)?
      .into_iter()
      .find(|d| d.id == id)
      .ok_or_else(|| StudioError::NotFound(format!("document {id}")))
  }

  /// Replace a stored document in place, keeping its position.
  #[instrument(level = "debug", skip(self, doc), fields(%workspace, id = %doc.id))]
  pub async fn update(&self, workspace: &str, doc: GeneratedDocument) -> StudioResult<()> {
    let _guard = self.write_lock.lock().await;
    let mut docs = self.load(workspace)?;
    let slot = docs
      .iter_mut()
      .find(|d| d.id == doc.id)
      .ok_or_else(|| StudioError::NotFound(format!("document {}", doc.id)))?;
    *slot = doc;
    save_json(self.store.as_ref(), &archive_key(workspace), &docs)?;
    Ok(())
  }

  #[instrument(level = "info", skip(self), fields(%workspace, %id))]
  pub async fn remove(&self, workspace: &str, id: &str) -> StudioResult<()> {
    let _guard = self.write_lock.lock().await;
    let mut docs = self.load(workspace)?;
    let before = docs.len();
    docs.retain(|d| d.id != id);
    if docs.len() == before {
      return Err(StudioError::NotFound(format!("document {id}")));
    }
    save_json(self.store.as_ref(), &archive_key(workspace), &docs)?;
    Ok(())
  }

  /// Newest `savedAt` in the archive, if any.
  pub fn newest_saved_at(&self, workspace: &str) -> StudioResult<Option<i64>> {
    Ok(self.load(workspace)?.iter().map(|d| d.saved_at).max())
  }
}
