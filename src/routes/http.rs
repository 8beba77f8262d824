//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs ids and basic result info, not contents.

use std::sync::Arc;

use axum::{
  extract::State,
  http::header,
  response::{Html, IntoResponse},
  Json,
};
use tracing::{info, instrument};

use crate::error::{StudioError, StudioResult};
use crate::intents::TemplateOutcome;
use crate::logic;
use crate::protocol::*;
use crate::state::{AppState, CredentialStatus};

use super::extract::{ApiJson, ApiQuery, DocumentPath, Ids, IntentPath, WorkspacePath};

// ---- health & status ----

#[instrument(level = "debug")]
pub async fn healthz() -> &'static str {
  "ok"
}

#[instrument(level = "debug", skip(state))]
pub async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
  let status = match state.credential_status().await {
    CredentialStatus::Connected { .. } => "connected",
    CredentialStatus::Missing { .. } => "credentials missing",
    CredentialStatus::Unreachable { .. } => "unreachable",
    CredentialStatus::Unknown => "not checked yet",
  };
  Html(format!(
    "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Worksheet Studio</title></head>\
<body style=\"font-family:sans-serif;max-width:40rem;margin:3rem auto\">\
<h1>Worksheet Studio backend</h1>\
<p>Status: <strong>running</strong></p>\
<p>Generation backend: {status}</p>\
<p>Liveness probe: <code>GET /healthz</code></p>\
</body></html>"
  ))
}

#[instrument(level = "info", skip(state))]
pub async fn http_status(State(state): State<Arc<AppState>>) -> Json<StatusOut> {
  Json(StatusOut {
    ok: true,
    backend_configured: state.backend.is_some(),
    credentials: state.credential_status().await,
    workspace_id: state.profile.id.clone(),
  })
}

// ---- profile & branding ----

#[instrument(level = "info", skip(state))]
pub async fn http_get_profile(State(state): State<Arc<AppState>>) -> Json<ProfileOut> {
  Json(ProfileOut { profile: state.profile.clone(), branding: state.branding_snapshot().await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_branding(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.branding_snapshot().await)
}

#[instrument(level = "info", skip(state, patch))]
pub async fn http_put_branding(
  State(state): State<Arc<AppState>>,
  ApiJson(patch): ApiJson<crate::domain::BrandingPatch>,
) -> StudioResult<impl IntoResponse> {
  Ok(Json(state.update_branding(patch).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_logo(State(state): State<Arc<AppState>>, ApiJson(body): ApiJson<LogoIn>) -> StudioResult<impl IntoResponse> {
  Ok(Json(logic::upload_logo(&state, body).await?))
}

// ---- intent queue ----

#[instrument(level = "info", skip(state))]
pub async fn http_get_intents(State(state): State<Arc<AppState>>, Ids(WorkspacePath { ws }): Ids<WorkspacePath>) -> Json<IntentsOut> {
  let intents = state.with_queue(&ws, |q| q.intents().to_vec()).await;
  Json(IntentsOut { intents })
}

#[instrument(level = "info", skip(state, body), fields(count = body.intents.len()))]
pub async fn http_put_intents(
  State(state): State<Arc<AppState>>,
  Ids(WorkspacePath { ws }): Ids<WorkspacePath>,
  ApiJson(body): ApiJson<IntentsIn>,
) -> Json<IntentsOut> {
  let intents = state
    .with_queue(&ws, |q| {
      q.replace_all(body.intents);
      q.intents().to_vec()
    })
    .await;
  Json(IntentsOut { intents })
}

#[instrument(level = "info", skip(state))]
pub async fn http_add_intent(State(state): State<Arc<AppState>>, Ids(WorkspacePath { ws }): Ids<WorkspacePath>) -> Json<IntentsOut> {
  let intents = state
    .with_queue(&ws, |q| {
      q.add_intent();
      q.intents().to_vec()
    })
    .await;
  info!(target: "studio", %ws, len = intents.len(), "Intent added");
  Json(IntentsOut { intents })
}

#[instrument(level = "info", skip(state, patch))]
pub async fn http_update_intent(
  State(state): State<Arc<AppState>>,
  Ids(IntentPath { ws, index }): Ids<IntentPath>,
  ApiJson(patch): ApiJson<crate::domain::IntentPatch>,
) -> StudioResult<Json<IntentsOut>> {
  let intents = state
    .with_queue(&ws, |q| {
      q.update_intent(index, patch)?;
      Ok::<_, StudioError>(q.intents().to_vec())
    })
    .await?;
  Ok(Json(IntentsOut { intents }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_remove_intent(
  State(state): State<Arc<AppState>>,
  Ids(IntentPath { ws, index }): Ids<IntentPath>,
) -> StudioResult<Json<IntentsOut>> {
  let intents = state
    .with_queue(&ws, |q| q.remove_intent(index).map(|_| q.intents().to_vec()))
    .await?;
  Ok(Json(IntentsOut { intents }))
}

#[instrument(level = "info", skip(state, body), fields(template = ?body.name))]
pub async fn http_apply_template(
  State(state): State<Arc<AppState>>,
  Ids(WorkspacePath { ws }): Ids<WorkspacePath>,
  ApiJson(body): ApiJson<TemplateIn>,
) -> Json<TemplateOut> {
  let (outcome, intents) = state
    .with_queue(&ws, |q| {
      let outcome = q.apply_template(body.name);
      (outcome, q.intents().to_vec())
    })
    .await;
  if outcome == TemplateOutcome::NeedsCurriculumMapping {
    info!(target: "studio", %ws, "Template requires curriculum mapping");
  }
  Json(TemplateOut { outcome, intents })
}

// ---- generation ----

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_curriculum(
  State(state): State<Arc<AppState>>,
  Ids(WorkspacePath { ws }): Ids<WorkspacePath>,
  ApiJson(body): ApiJson<CurriculumIn>,
) -> StudioResult<Json<CurriculumOut>> {
  let intents = logic::run_curriculum(&state, &ws, body).await?;
  info!(target: "generation", %ws, intents = intents.len(), "HTTP curriculum mapped");
  Ok(Json(CurriculumOut { mode: ViewMode::Builder, intents }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Ids(WorkspacePath { ws }): Ids<WorkspacePath>,
  ApiJson(body): ApiJson<GenerateIn>,
) -> StudioResult<Json<GenerateOut>> {
  Ok(Json(logic::run_generation(&state, &ws, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_cancel(State(state): State<Arc<AppState>>, Ids(WorkspacePath { ws }): Ids<WorkspacePath>) -> Json<CancelOut> {
  Json(CancelOut { cancelled: state.cancel_generation(&ws).await })
}

// ---- archive & renderer ----

#[instrument(level = "info", skip(state))]
pub async fn http_get_archive(State(state): State<Arc<AppState>>, Ids(WorkspacePath { ws }): Ids<WorkspacePath>) -> StudioResult<Json<ArchiveOut>> {
  Ok(Json(ArchiveOut { documents: state.archive.load(&ws)? }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_document(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<impl IntoResponse> {
  Ok(Json(state.archive.get(&ws, &id)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_document(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<impl IntoResponse> {
  state.archive.remove(&ws, &id).await?;
  Ok(Json(serde_json::json!({ "deleted": id })))
}

#[instrument(level = "info", skip(state, body), fields(edits = body.edits.len()))]
pub async fn http_post_edits(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
  ApiJson(body): ApiJson<EditsIn>,
) -> StudioResult<impl IntoResponse> {
  Ok(Json(logic::apply_edits(&state, &ws, &id, body.edits).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_export(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
  ApiQuery(q): ApiQuery<ExportQuery>,
) -> StudioResult<impl IntoResponse> {
  let body = logic::export_document(&state, &ws, &id, q.answer_key)?;
  Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], body))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_share(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
  body: Option<ApiJson<ShareIn>>,
) -> StudioResult<Json<UrlOut>> {
  let answer_key = body.map(|ApiJson(b)| b.answer_key).unwrap_or(false);
  let url = logic::share(&state, &ws, &id, answer_key).await?;
  Ok(Json(UrlOut { url }))
}

// ---- practice ----

#[instrument(level = "info", skip(state))]
pub async fn http_get_practice(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<Json<PracticeOut>> {
  Ok(Json(logic::practice_state(&state, &ws, &id)?))
}

#[instrument(level = "info", skip(state, body), fields(question = %body.question_id))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
  ApiJson(body): ApiJson<AnswerIn>,
) -> StudioResult<Json<PracticeOut>> {
  Ok(Json(logic::practice_answer(&state, &ws, &id, &body.question_id, &body.answer)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<Json<SubmitOut>> {
  let out = logic::practice_submit(&state, &ws, &id)?;
  info!(target: "practice", %ws, %id, score = out.attempt.score, total = out.attempt.total, "HTTP quiz submitted");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<Json<PracticeOut>> {
  Ok(Json(logic::practice_reset(&state, &ws, &id)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Ids(DocumentPath { ws, id }): Ids<DocumentPath>,
) -> StudioResult<Json<HistoryOut>> {
  Ok(Json(HistoryOut { history: logic::practice_history(&state, &ws, &id)? }))
}
