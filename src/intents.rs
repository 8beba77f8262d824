//! Intent queue builder: an ordered list of document intents per workspace.

use serde::{Deserialize, Serialize};

use crate::domain::{DocumentIntent, IntentPatch};
use crate::error::{StudioError, StudioResult};
use crate::seeds::{default_intent, differentiation_pack, standard_suite};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateName {
  StandardSuite,
  Differentiation,
  Curriculum,
}

/// What applying a template did to the queue.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateOutcome {
  Replaced,
  /// Queue untouched; the curriculum mapper has to fill it.
  NeedsCurriculumMapping,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IntentQueue {
  intents: Vec<DocumentIntent>,
}

impl IntentQueue {
  /// A fresh queue holds one default intent.
  pub fn new() -> Self {
    Self { intents: vec![default_intent()] }
  }

  pub fn intents(&self) -> &[DocumentIntent] {
    &self.intents
  }

  pub fn add_intent(&mut self) -> &DocumentIntent {
    self.intents.push(default_intent());
    &self.intents[self.intents.len() - 1]
  }

  pub fn update_intent(&mut self, index: usize, patch: IntentPatch) -> StudioResult<&DocumentIntent> {
    let len = self.intents.len();
    let intent = self
      .intents
      .get_mut(index)
      .ok_or_else(|| StudioError::InvalidRequest(format!("intent index {index} out of range (len {len})")))?;

    if let Some(v) = patch.document_type { intent.document_type = v; }
    if let Some(v) = patch.learner_profile { intent.learner_profile = v; }
    if let Some(v) = patch.layout { intent.layout = v; }
    if let Some(v) = patch.cognitive_depth { intent.cognitive_depth = v; }
    if let Some(v) = patch.question_counts { intent.question_counts = v; }
    if let Some(v) = patch.specific_instructions {
      intent.specific_instructions = if v.trim().is_empty() { None } else { Some(v) };
    }
    Ok(intent)
  }

  pub fn remove_intent(&mut self, index: usize) -> StudioResult<DocumentIntent> {
    if index >= self.intents.len() {
      return Err(StudioError::InvalidRequest(format!(
        "intent index {index} out of range (len {})",
        self.intents.len()
      )));
    }
    Ok(self.intents.remove(index))
  }

  /// Destructive: replaces the queue wholesale (no merge).
  pub fn apply_template(&mut self, name: TemplateName) -> TemplateOutcome {
    match name {
      TemplateName::StandardSuite => {
        self.intents = standard_suite();
        TemplateOutcome::Replaced
      }
      TemplateName::Differentiation => {
        self.intents = differentiation_pack();
        TemplateOutcome::Replaced
      }
      TemplateName::Curriculum => TemplateOutcome::NeedsCurriculumMapping,
    }
  }

  pub fn replace_all(&mut self, intents: Vec<DocumentIntent>) {
    self.intents = intents;
  }

  /// The only validation before generation: at least one intent.
  pub fn ensure_ready(&self) -> StudioResult<()> {
    if self.intents.is_empty() {
      return Err(StudioError::MissingInput("intents"));
    }
    Ok(())
  }
}
