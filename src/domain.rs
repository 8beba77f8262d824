//! Domain models: intents, generated documents, questions, quiz attempts, branding.
//!
//! Enumerations are closed on purpose: every place that turns them into prompt
//! text or JSON schema matches exhaustively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of question a document may contain.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
  #[serde(rename = "MCQ")]
  MultipleChoice,
  TrueFalse,
  FillInTheBlank,
  ShortAnswer,
  Matching,
  LongAnswer,
}

impl QuestionKind {
  pub const ALL: [QuestionKind; 6] = [
    QuestionKind::MultipleChoice,
    QuestionKind::TrueFalse,
    QuestionKind::FillInTheBlank,
    QuestionKind::ShortAnswer,
    QuestionKind::Matching,
    QuestionKind::LongAnswer,
  ];

  /// Wire tag, identical to the serde representation.
  pub fn tag(self) -> &'static str {
    match self {
      QuestionKind::MultipleChoice => "MCQ",
      QuestionKind::TrueFalse => "TRUE_FALSE",
      QuestionKind::FillInTheBlank => "FILL_IN_THE_BLANK",
      QuestionKind::ShortAnswer => "SHORT_ANSWER",
      QuestionKind::Matching => "MATCHING",
      QuestionKind::LongAnswer => "LONG_ANSWER",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      QuestionKind::MultipleChoice => "multiple-choice",
      QuestionKind::TrueFalse => "true/false",
      QuestionKind::FillInTheBlank => "fill-in-the-blank",
      QuestionKind::ShortAnswer => "short-answer",
      QuestionKind::Matching => "matching",
      QuestionKind::LongAnswer => "long-answer",
    }
  }

  /// Whether the generated question must carry an `options` list.
  pub fn needs_options(self) -> bool {
    matches!(self, QuestionKind::MultipleChoice | QuestionKind::TrueFalse | QuestionKind::Matching)
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
  Homework,
  Quiz,
  Exam,
  Worksheet,
  ExitTicket,
  StudyGuide,
}

impl DocumentType {
  pub fn label(self) -> &'static str {
    match self {
      DocumentType::Homework => "Homework",
      DocumentType::Quiz => "Quiz",
      DocumentType::Exam => "Exam",
      DocumentType::Worksheet => "Worksheet",
      DocumentType::ExitTicket => "Exit Ticket",
      DocumentType::StudyGuide => "Study Guide",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearnerProfile {
  General,
  Esl,
  Gifted,
  SpecialEd,
  Remedial,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Layout {
  Classic,
  TwoColumn,
  Compact,
}

/// Taxonomy level guiding question difficulty.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CognitiveDepth {
  Recall,
  Understanding,
  Application,
  Analysis,
  Evaluation,
  Creation,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceCategory {
  Primary,
  Secondary,
  HigherEducation,
  Professional,
}

/// Requested number of questions per kind.
pub type QuestionCounts = BTreeMap<QuestionKind, u32>;

pub fn total_questions(counts: &QuestionCounts) -> u32 {
  counts.values().sum()
}

/// One unit of generation work.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentIntent {
  pub id: String,
  pub document_type: DocumentType,
  pub learner_profile: LearnerProfile,
  pub layout: Layout,
  pub cognitive_depth: CognitiveDepth,
  pub question_counts: QuestionCounts,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub specific_instructions: Option<String>,
}

/// Partial update for an intent; absent fields are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPatch {
  #[serde(default)] pub document_type: Option<DocumentType>,
  #[serde(default)] pub learner_profile: Option<LearnerProfile>,
  #[serde(default)] pub layout: Option<Layout>,
  #[serde(default)] pub cognitive_depth: Option<CognitiveDepth>,
  #[serde(default)] pub question_counts: Option<QuestionCounts>,
  // empty string clears
  #[serde(default)] pub specific_instructions: Option<String>,
}

/// Inline file supplied as source material.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
  pub mime_type: String,
  pub data_base64: String,
}

impl SourceFile {
  pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.decode(self.data_base64.trim())
  }

  pub fn is_text(&self) -> bool {
    self.mime_type.starts_with("text/") || self.mime_type == "application/json"
  }
}

/// Parameters shared by every intent of a batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
  /// Blank or absent topics are rejected by the generator as missing input.
  #[serde(default)] pub topic: String,
  pub audience: AudienceCategory,
  #[serde(default)] pub educational_level: String,
  #[serde(default = "default_language")]
  pub language: String,
  #[serde(default)] pub source_text: Option<String>,
  #[serde(default)] pub source_file: Option<SourceFile>,
}

fn default_language() -> String {
  "English".into()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  pub kind: QuestionKind,
  #[serde(default)] pub section_instruction: String,
  pub prompt: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  pub correct_answer: String,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub is_challenge: bool,
  #[serde(default = "default_points")] pub points: u32,
}

fn default_points() -> u32 {
  1
}

/// Branding snapshot stamped on each document at creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrandingFields {
  pub institution_name: String,
  pub instructor_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<String>,
  pub primary_color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
  pub id: String,
  pub title: String,
  pub topic: String,
  pub educational_level: String,
  pub document_type: DocumentType,
  pub learner_profile: LearnerProfile,
  pub layout: Layout,
  pub language: String,
  pub questions: Vec<Question>,
  pub branding: BrandingFields,
  /// Milliseconds since the Unix epoch (UTC).
  pub saved_at: i64,
}

impl GeneratedDocument {
  pub fn total_points(&self) -> u32 {
    self.questions.iter().map(|q| q.points).sum()
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
  pub score: u32,
  pub total: u32,
  pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Theme {
  #[default]
  Light,
  Dark,
  HighContrast,
}

/// Process-wide institutional branding.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandingConfig {
  pub institution_name: String,
  pub instructor_name: String,
  #[serde(default)] pub logo_url: Option<String>,
  pub primary_color: String,
  #[serde(default)] pub theme: Theme,
}

impl Default for BrandingConfig {
  fn default() -> Self {
    Self {
      institution_name: "My School".into(),
      instructor_name: String::new(),
      logo_url: None,
      primary_color: "#1e3a8a".into(),
      theme: Theme::Light,
    }
  }
}

impl BrandingConfig {
  pub fn fields(&self) -> BrandingFields {
    BrandingFields {
      institution_name: self.institution_name.clone(),
      instructor_name: self.instructor_name.clone(),
      logo_url: self.logo_url.clone(),
      primary_color: self.primary_color.clone(),
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingPatch {
  #[serde(default)] pub institution_name: Option<String>,
  #[serde(default)] pub instructor_name: Option<String>,
  #[serde(default)] pub logo_url: Option<String>,
  #[serde(default)] pub primary_color: Option<String>,
  #[serde(default)] pub theme: Option<Theme>,
}

/// Workspace identity; archives are keyed by `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: String,
  pub display_name: String,
}
