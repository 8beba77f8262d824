//! Curriculum mapper: decompose source material into lesson units and turn
//! each unit into a quiz intent.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::backend::{lesson_plan_schema, BackendRequest, GenerationBackend, LessonSummary};
use crate::config::Prompts;
use crate::domain::{CognitiveDepth, DocumentIntent, DocumentType, SourceFile};
use crate::error::{StudioError, StudioResult};
use crate::seeds::default_intent;
use crate::util::fill_template;

/// Raw material for mapping; at least one of the two must be present.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumSource {
  #[serde(default)] pub text: Option<String>,
  #[serde(default)] pub file: Option<SourceFile>,
}

impl CurriculumSource {
  fn text(&self) -> Option<&str> {
    self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }

  /// Needs text or a decodable file; checked before any backend call.
  pub fn validate(&self) -> StudioResult<()> {
    if self.text().is_none() && self.file.is_none() {
      return Err(StudioError::MissingInput("source material"));
    }
    if let Some(file) = &self.file {
      file.decode().map_err(|e| StudioError::InvalidRequest(format!("file is not valid base64: {e}")))?;
    }
    Ok(())
  }
}

/// One quiz intent per lesson, depth APPLICATION, instructions built from the lesson.
pub fn lesson_to_intent(lesson: &LessonSummary) -> DocumentIntent {
  let mut instructions = format!("Lesson: {}\nSummary: {}", lesson.title.trim(), lesson.summary.trim());
  let suggested: Vec<&str> = lesson
    .suggested_questions
    .iter()
    .map(|q| q.trim())
    .filter(|q| !q.is_empty())
    .collect();
  if !suggested.is_empty() {
    instructions.push_str("\nCover these suggested questions:");
    for q in suggested {
      instructions.push_str("\n- ");
      instructions.push_str(q);
    }
  }
  DocumentIntent {
    id: Uuid::new_v4().to_string(),
    document_type: DocumentType::Quiz,
    cognitive_depth: CognitiveDepth::Application,
    specific_instructions: Some(instructions),
    ..default_intent()
  }
}

#[instrument(level = "info", skip_all, fields(has_text = source.text().is_some(), has_file = source.file.is_some()))]
pub async fn map_curriculum(
  backend: &dyn GenerationBackend,
  prompts: &Prompts,
  source: &CurriculumSource,
) -> StudioResult<Vec<DocumentIntent>> {
  source.validate()?;

  let material = match source.text() {
    Some(text) => text.to_string(),
    None => "(see the attached file)".to_string(),
  };
  let req = BackendRequest {
    system: prompts.curriculum_system.clone(),
    user: fill_template(&prompts.curriculum_user_template, &[("source", &material)]),
    file: source.file.clone(),
    schema_name: "lesson_plan",
    schema: lesson_plan_schema(),
    temperature: 0.3,
  };

  let lessons = backend.map_curriculum(&req).await?;
  if lessons.is_empty() {
    return Err(StudioError::EmptyResult("lessons"));
  }
  info!(target: "generation", lessons = lessons.len(), "Curriculum mapped");
  Ok(lessons.iter().map(lesson_to_intent).collect())
}
