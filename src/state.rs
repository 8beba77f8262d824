//! Application state: the explicit context handed to every handler.
//!
//! This module owns:
//!   - the durable KV store and the archive built on it
//!   - object storage for shares and logos
//!   - the optional generation backend (absent without an API key)
//!   - branding (loaded at startup, persisted on every change)
//!   - per-workspace intent queues and in-flight generation tokens
//!   - the last credential check result

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::archive::ArchiveStore;
use crate::backend::GenerationBackend;
use crate::branding::{apply_patch, load_branding, load_or_create_profile, save_branding};
use crate::config::{load_config_from_env, StudioConfig};
use crate::domain::{BrandingConfig, BrandingPatch, UserProfile};
use crate::error::{BackendError, StudioError, StudioResult};
use crate::gemini::GeminiClient;
use crate::intents::IntentQueue;
use crate::objects::{LocalObjectStore, ObjectStore};
use crate::storage::{FileStore, KvStore};
use crate::util::now_millis;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CredentialStatus {
  Unknown,
  Connected { checked_at: i64 },
  Missing { checked_at: i64 },
  Unreachable { checked_at: i64, message: String },
}

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn KvStore>,
  pub archive: ArchiveStore,
  pub objects: Arc<dyn ObjectStore>,
  /// Directory behind `/files`; the local object store writes here.
  pub files_dir: PathBuf,
  pub backend: Option<Arc<dyn GenerationBackend>>,
  pub config: StudioConfig,
  pub profile: UserProfile,
  pub branding: Arc<RwLock<BrandingConfig>>,
  pub queues: Arc<RwLock<HashMap<String, IntentQueue>>>,
  inflight: Arc<Mutex<HashMap<String, (Uuid, CancellationToken)>>>,
  credentials: Arc<RwLock<CredentialStatus>>,
}

impl AppState {
  /// Build state from env: config, data dir, object dir, backend client.
  #[instrument(level = "info", skip_all)]
  pub fn from_env(port: u16) -> StudioResult<Self> {
    let config = load_config_from_env();
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into());
    let public_base = std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

    let files_dir = PathBuf::from(&data_dir).join("files");
    let kv = FileStore::open(PathBuf::from(&data_dir).join("kv"))?;
    info!(target: "storage", root = %kv.root().display(), "Key/value store opened");
    let store: Arc<dyn KvStore> = Arc::new(kv);
    let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(files_dir.clone(), &public_base));

    let timeout = std::time::Duration::from_secs(config.request_timeout_secs);
    let backend: Option<Arc<dyn GenerationBackend>> = match GeminiClient::from_env(timeout) {
      Some(client) => {
        info!(target: "studio", base_url = %client.base_url, model = %client.model, "Generation backend enabled.");
        Some(Arc::new(client))
      }
      None => {
        warn!(target: "studio", "Generation backend disabled (no GEMINI_API_KEY). Generation requests will ask for credentials.");
        None
      }
    };
    info!(target: "studio", %data_dir, %public_base, "Storage ready");

    Self::with_parts(store, objects, files_dir, backend, config)
  }

  /// Assemble state from explicit parts; loads branding and the workspace profile.
  pub fn with_parts(
    store: Arc<dyn KvStore>,
    objects: Arc<dyn ObjectStore>,
    files_dir: PathBuf,
    backend: Option<Arc<dyn GenerationBackend>>,
    config: StudioConfig,
  ) -> StudioResult<Self> {
    let branding = load_branding(store.as_ref())?;
    let profile = load_or_create_profile(store.as_ref())?;
    info!(target: "studio", workspace = %profile.id, institution = %branding.institution_name, "Workspace loaded");
    Ok(Self {
      archive: ArchiveStore::new(store.clone()),
      store,
      objects,
      files_dir,
      backend,
      config,
      profile,
      branding: Arc::new(RwLock::new(branding)),
      queues: Arc::new(RwLock::new(HashMap::new())),
      inflight: Arc::new(Mutex::new(HashMap::new())),
      credentials: Arc::new(RwLock::new(CredentialStatus::Unknown)),
    })
  }

  /// The backend, or `CredentialMissing` so callers can prompt for a key.
  pub fn backend(&self) -> StudioResult<Arc<dyn GenerationBackend>> {
    self.backend.clone().ok_or(StudioError::CredentialMissing)
  }

  pub async fn branding_snapshot(&self) -> BrandingConfig {
    self.branding.read().await.clone()
  }

  /// Merge, persist, then publish the new branding.
  #[instrument(level = "info", skip_all)]
  pub async fn update_branding(&self, patch: BrandingPatch) -> StudioResult<BrandingConfig> {
    let mut guard = self.branding.write().await;
    let next = apply_patch(&guard, patch)?;
    save_branding(self.store.as_ref(), &next)?;
    *guard = next.clone();
    info!(target: "studio", institution = %next.institution_name, "Branding saved");
    Ok(next)
  }

  /// Run `f` against the workspace queue, creating a default queue on first use.
  pub async fn with_queue<R>(&self, workspace: &str, f: impl FnOnce(&mut IntentQueue) -> R) -> R {
    let mut queues = self.queues.write().await;
    let queue = queues.entry(workspace.to_string()).or_insert_with(IntentQueue::new);
    f(queue)
  }

  /// Register a new generation for `workspace`, cancelling any previous one.
  pub async fn begin_generation(&self, workspace: &str) -> (Uuid, CancellationToken) {
    let id = Uuid::new_v4();
    let token = CancellationToken::new();
    let mut inflight = self.inflight.lock().await;
    if let Some((old_id, old)) = inflight.insert(workspace.to_string(), (id, token.clone())) {
      warn!(target: "generation", %workspace, previous = %old_id, "Superseding in-flight generation");
      old.cancel();
    }
    (id, token)
  }

  pub async fn finish_generation(&self, workspace: &str, id: Uuid) {
    let mut inflight = self.inflight.lock().await;
    if inflight.get(workspace).map(|(current, _)| *current == id).unwrap_or(false) {
      inflight.remove(workspace);
    }
  }

  /// Cancel the in-flight generation for `workspace`. Returns whether one existed.
  pub async fn cancel_generation(&self, workspace: &str) -> bool {
    match self.inflight.lock().await.remove(workspace) {
      Some((id, token)) => {
        token.cancel();
        info!(target: "generation", %workspace, generation = %id, "Generation cancelled");
        true
      }
      None => false,
    }
  }

  pub async fn credential_status(&self) -> CredentialStatus {
    self.credentials.read().await.clone()
  }

  /// One credential check; the periodic task calls this on a timer.
  #[instrument(level = "debug", skip(self))]
  pub async fn refresh_credentials(&self) -> CredentialStatus {
    let checked_at = now_millis();
    let status = match &self.backend {
      None => CredentialStatus::Missing { checked_at },
      Some(backend) => match backend.check_credentials().await {
        Ok(()) => CredentialStatus::Connected { checked_at },
        Err(BackendError::Credential(_)) => CredentialStatus::Missing { checked_at },
        Err(e) => CredentialStatus::Unreachable { checked_at, message: e.to_string() },
      },
    };
    let mut current = self.credentials.write().await;
    if std::mem::discriminant(&*current) != std::mem::discriminant(&status) {
      info!(target: "studio", status = ?status, "Credential status changed");
    }
    *current = status.clone();
    status
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::storage::MemoryStore;

  pub fn memory_state(backend: Option<Arc<dyn GenerationBackend>>) -> AppState {
    let dir = std::env::temp_dir().join(format!("studio-state-{}", Uuid::new_v4()));
    AppState::with_parts(
      Arc::new(MemoryStore::new()),
      Arc::new(LocalObjectStore::new(dir.clone(), "http://test.local")),
      dir,
      backend,
      StudioConfig::default(),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn missing_backend_reports_credentials_missing() {
    let state = memory_state(None);
    assert!(matches!(state.backend(), Err(StudioError::CredentialMissing)));
    assert!(matches!(state.refresh_credentials().await, CredentialStatus::Missing { .. }));
  }

  #[tokio::test]
  async fn new_generation_supersedes_previous() {
    let state = memory_state(None);
    let (first_id, first) = state.begin_generation("ws").await;
    let (second_id, second) = state.begin_generation("ws").await;
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());

    // a stale finish must not drop the newer registration
    state.finish_generation("ws", first_id).await;
    assert!(state.cancel_generation("ws").await);
    assert!(second.is_cancelled());
    state.finish_generation("ws", second_id).await;
    assert!(!state.cancel_generation("ws").await);
  }

  #[tokio::test]
  async fn branding_updates_persist() {
    let state = memory_state(None);
    let patch = BrandingPatch { instructor_name: Some("Ms. Rivera".into()), ..Default::default() };
    state.update_branding(patch).await.unwrap();
    assert_eq!(load_branding(state.store.as_ref()).unwrap().instructor_name, "Ms. Rivera");
    assert_eq!(state.branding_snapshot().await.instructor_name, "Ms. Rivera");
  }
}
