//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - running a generation batch for a workspace queue
//!   - curriculum mapping into the queue
//!   - applying renderer edits and writing them back to the archive
//!   - export / share / logo upload
//!   - practice session operations

use base64::Engine as _;
use tracing::{info, instrument};

use crate::curriculum::{map_curriculum, CurriculumSource};
use crate::domain::{BrandingConfig, BrandingPatch, DocumentIntent, GeneratedDocument, QuizAttempt};
use crate::error::{StudioError, StudioResult};
use crate::generator::{generate_suite, validate_params, SuiteContext};
use crate::protocol::{GenerateIn, GenerateOut, LogoIn, PracticeOut, SubmitOut, ViewMode};
use crate::practice::PracticeSession;
use crate::renderer::{render_markdown, share_document, DocumentEdit, DocumentEditor};
use crate::state::AppState;

/// Decoded logo size; its base64 form stays well under the router body limit.
const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

#[instrument(level = "info", skip(state, body), fields(%workspace, topic_len = body.params.topic.len()))]
pub async fn run_generation(state: &AppState, workspace: &str, body: GenerateIn) -> StudioResult<GenerateOut> {
  validate_params(&body.params)?;
  let intents = state
    .with_queue(workspace, |q| {
      if let Some(intents) = body.intents {
        q.replace_all(intents);
      }
      q.ensure_ready().map(|_| q.intents().to_vec())
    })
    .await?;

  let backend = state.backend()?;
  let branding = state.branding_snapshot().await.fields();
  let (generation, token) = state.begin_generation(workspace).await;
  let ctx = SuiteContext {
    backend: backend.as_ref(),
    prompts: &state.config.prompts,
    archive: &state.archive,
    branding,
    workspace,
  };

  let result = generate_suite(&ctx, &intents, &body.params, &token).await;
  state.finish_generation(workspace, generation).await;
  let documents = result?;

  info!(target: "generation", %workspace, documents = documents.len(), "Batch complete; switching to review");
  Ok(GenerateOut { mode: ViewMode::Review, documents })
}

/// Map source material and replace the workspace queue with the result.
#[instrument(level = "info", skip(state, source), fields(%workspace))]
pub async fn run_curriculum(state: &AppState, workspace: &str, source: CurriculumSource) -> StudioResult<Vec<DocumentIntent>> {
  source.validate()?;
  let backend = state.backend()?;
  let intents = map_curriculum(backend.as_ref(), &state.config.prompts, &source).await?;
  state.with_queue(workspace, |q| q.replace_all(intents.clone())).await;
  Ok(intents)
}

/// Apply edits in order. The editor callback captures each accepted state and
/// that state is written back to the archive, so edits accepted before a
/// rejected one are kept; the rejection is then returned.
#[instrument(level = "info", skip(state, edits), fields(%workspace, %id, edits = edits.len()))]
pub async fn apply_edits(state: &AppState, workspace: &str, id: &str, edits: Vec<DocumentEdit>) -> StudioResult<GeneratedDocument> {
  let doc = state.archive.get(workspace, id)?;
  let mut latest: Option<GeneratedDocument> = None;
  let rejected = {
    let mut editor = DocumentEditor::new(doc, |d: &GeneratedDocument| latest = Some(d.clone()));
    edits.into_iter().try_for_each(|edit| editor.apply(edit)).err()
  };
  if let Some(updated) = &latest {
    state.archive.update(workspace, updated.clone()).await?;
  }
  if let Some(err) = rejected {
    return Err(err);
  }
  match latest {
    Some(updated) => Ok(updated),
    None => state.archive.get(workspace, id),
  }
}

pub fn export_document(state: &AppState, workspace: &str, id: &str, answer_key: bool) -> StudioResult<String> {
  let doc = state.archive.get(workspace, id)?;
  Ok(render_markdown(&doc, answer_key))
}

pub async fn share(state: &AppState, workspace: &str, id: &str, answer_key: bool) -> StudioResult<String> {
  let doc = state.archive.get(workspace, id)?;
  share_document(state.objects.as_ref(), &doc, answer_key).await
}

#[instrument(level = "info", skip(state, logo), fields(mime = %logo.mime_type, b64_len = logo.data_base64.len()))]
pub async fn upload_logo(state: &AppState, logo: LogoIn) -> StudioResult<BrandingConfig> {
  if !logo.mime_type.starts_with("image/") {
    return Err(StudioError::InvalidRequest(format!("logo must be an image, got {}", logo.mime_type)));
  }
  let bytes = base64::engine::general_purpose::STANDARD
    .decode(logo.data_base64.trim())
    .map_err(|e| StudioError::InvalidRequest(format!("logo is not valid base64: {e}")))?;
  if bytes.len() > MAX_LOGO_BYTES {
    return Err(StudioError::InvalidRequest(format!("logo exceeds {MAX_LOGO_BYTES} bytes")));
  }
  let url = state.objects.put("logo", bytes, &logo.mime_type).await?;
  state.update_branding(BrandingPatch { logo_url: Some(url), ..Default::default() }).await
}

fn open_session(state: &AppState, workspace: &str, id: &str) -> StudioResult<PracticeSession> {
  let doc = state.archive.get(workspace, id)?;
  PracticeSession::load(doc, state.store.clone())
}

fn practice_out(session: &PracticeSession) -> PracticeOut {
  PracticeOut { phase: session.phase(), progress: session.progress().clone() }
}

pub fn practice_state(state: &AppState, workspace: &str, id: &str) -> StudioResult<PracticeOut> {
  Ok(practice_out(&open_session(state, workspace, id)?))
}

pub fn practice_answer(state: &AppState, workspace: &str, id: &str, question_id: &str, answer: &str) -> StudioResult<PracticeOut> {
  let mut session = open_session(state, workspace, id)?;
  session.answer(question_id, answer)?;
  Ok(practice_out(&session))
}

pub fn practice_submit(state: &AppState, workspace: &str, id: &str) -> StudioResult<SubmitOut> {
  let mut session = open_session(state, workspace, id)?;
  let attempt = session.submit()?;
  Ok(SubmitOut { attempt, history: session.history()? })
}

pub fn practice_reset(state: &AppState, workspace: &str, id: &str) -> StudioResult<PracticeOut> {
  let mut session = open_session(state, workspace, id)?;
  session.reset()?;
  Ok(practice_out(&session))
}

pub fn practice_history(state: &AppState, workspace: &str, id: &str) -> StudioResult<Vec<QuizAttempt>> {
  open_session(state, workspace, id)?.history()
}
