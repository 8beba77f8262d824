//! Contract with the generation backend: request shape, typed drafts, JSON schemas.
//!
//! The suite generator and the curriculum mapper only talk to
//! `GenerationBackend`; the HTTP client in `gemini` is one implementation and
//! tests plug in scripted ones.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{QuestionKind, SourceFile};
use crate::error::BackendError;

/// One structured-output request.
#[derive(Clone, Debug)]
pub struct BackendRequest {
  pub system: String,
  pub user: String,
  pub file: Option<SourceFile>,
  pub schema_name: &'static str,
  pub schema: Value,
  pub temperature: f32,
}

/// Document as returned by the backend, before stamping.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
  pub title: String,
  pub topic: String,
  pub questions: Vec<QuestionDraft>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionKind,
  pub section_instruction: String,
  pub question: String,
  #[serde(default)] pub options: Option<Vec<String>>,
  pub correct_answer: String,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub is_challenge: bool,
  #[serde(default)] pub points: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
  pub title: String,
  pub summary: String,
  #[serde(default)]
  pub suggested_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonPlan {
  #[serde(default)]
  pub lessons: Vec<LessonSummary>,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
  async fn generate_document(&self, req: &BackendRequest) -> Result<DocumentDraft, BackendError>;
  async fn map_curriculum(&self, req: &BackendRequest) -> Result<Vec<LessonSummary>, BackendError>;
  /// Cheap authenticated call used by the periodic re-check.
  async fn check_credentials(&self) -> Result<(), BackendError>;
}

/// Fixed schema for one generated document.
pub fn document_schema() -> Value {
  let kinds: Vec<&str> = QuestionKind::ALL.iter().map(|k| k.tag()).collect();
  json!({
    "type": "object",
    "properties": {
      "title": { "type": "string" },
      "topic": { "type": "string" },
      "questions": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "id": { "type": "string" },
            "type": { "type": "string", "enum": kinds },
            "sectionInstruction": { "type": "string" },
            "question": { "type": "string" },
            "options": { "type": "array", "items": { "type": "string" } },
            "correctAnswer": { "type": "string" },
            "explanation": { "type": "string" },
            "isChallenge": { "type": "boolean" },
            "points": { "type": "integer" }
          },
          "required": ["id", "type", "sectionInstruction", "question", "correctAnswer"]
        }
      }
    },
    "required": ["title", "topic", "questions"]
  })
}

pub fn lesson_plan_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "lessons": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "title": { "type": "string" },
            "summary": { "type": "string" },
            "suggestedQuestions": { "type": "array", "items": { "type": "string" } }
          },
          "required": ["title", "summary", "suggestedQuestions"]
        }
      }
    },
    "required": ["lessons"]
  })
}
