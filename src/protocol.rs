//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::curriculum::CurriculumSource;
use crate::domain::{BrandingConfig, DocumentIntent, GeneratedDocument, GenerationParams, QuizAttempt, UserProfile};
use crate::intents::{TemplateName, TemplateOutcome};
use crate::practice::{QuizProgress, SessionPhase};
use crate::renderer::DocumentEdit;
use crate::state::CredentialStatus;

/// Which screen the client should show after an operation.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
  Builder,
  Review,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOut {
  pub ok: bool,
  pub backend_configured: bool,
  pub credentials: CredentialStatus,
  pub workspace_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOut {
  pub profile: UserProfile,
  pub branding: BrandingConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoIn {
  pub mime_type: String,
  pub data_base64: String,
}

#[derive(Deserialize)]
pub struct IntentsIn {
  pub intents: Vec<DocumentIntent>,
}

#[derive(Serialize)]
pub struct IntentsOut {
  pub intents: Vec<DocumentIntent>,
}

#[derive(Deserialize)]
pub struct TemplateIn {
  pub name: TemplateName,
}

#[derive(Serialize)]
pub struct TemplateOut {
  pub outcome: TemplateOutcome,
  pub intents: Vec<DocumentIntent>,
}

pub type CurriculumIn = CurriculumSource;

/// Mapping refills the queue, so the client returns to the builder.
#[derive(Serialize)]
pub struct CurriculumOut {
  pub mode: ViewMode,
  pub intents: Vec<DocumentIntent>,
}

#[derive(Deserialize)]
pub struct GenerateIn {
  #[serde(flatten)]
  pub params: GenerationParams,
  /// When present, replaces the workspace queue before generating.
  #[serde(default)]
  pub intents: Option<Vec<DocumentIntent>>,
}

#[derive(Serialize)]
pub struct GenerateOut {
  pub mode: ViewMode,
  pub documents: Vec<GeneratedDocument>,
}

#[derive(Serialize)]
pub struct CancelOut {
  pub cancelled: bool,
}

#[derive(Serialize)]
pub struct ArchiveOut {
  pub documents: Vec<GeneratedDocument>,
}

#[derive(Deserialize)]
pub struct EditsIn {
  pub edits: Vec<DocumentEdit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
  #[serde(default)]
  pub answer_key: bool,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareIn {
  #[serde(default)]
  pub answer_key: bool,
}

#[derive(Serialize)]
pub struct UrlOut {
  pub url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
  pub question_id: String,
  pub answer: String,
}

#[derive(Serialize)]
pub struct PracticeOut {
  #[serde(flatten)]
  pub phase: SessionPhase,
  pub progress: QuizProgress,
}

#[derive(Serialize)]
pub struct SubmitOut {
  pub attempt: QuizAttempt,
  pub history: Vec<QuizAttempt>,
}

#[derive(Serialize)]
pub struct HistoryOut {
  pub history: Vec<QuizAttempt>,
}
