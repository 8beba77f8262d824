//! Document renderer: an editable working copy of a generated document, plus
//! a printable markdown rendering used for export and sharing.
//!
//! The editor never persists anything itself. Every accepted edit is handed to
//! the `on_update` callback so the owner decides what to do with it.

use std::fmt::Write as _;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{GeneratedDocument, Layout, Question, QuestionKind};
use crate::error::{StudioError, StudioResult};
use crate::objects::ObjectStore;

/// One in-place edit. Question indices are zero-based positions.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum DocumentEdit {
  Title { value: String },
  Topic { value: String },
  InstitutionName { value: String },
  InstructorName { value: String },
  QuestionPrompt { index: usize, value: String },
  QuestionOption { index: usize, option: usize, value: String },
  QuestionAnswer { index: usize, value: String },
  QuestionExplanation { index: usize, value: String },
  QuestionPoints { index: usize, points: u32 },
}

pub struct DocumentEditor<F>
where
  F: FnMut(&GeneratedDocument),
{
  doc: GeneratedDocument,
  on_update: F,
}

impl<F> DocumentEditor<F>
where
  F: FnMut(&GeneratedDocument),
{
  pub fn new(doc: GeneratedDocument, on_update: F) -> Self {
    Self { doc, on_update }
  }

  #[instrument(level = "debug", skip(self, edit), fields(doc = %self.doc.id))]
  pub fn apply(&mut self, edit: DocumentEdit) -> StudioResult<()> {
    match edit {
      DocumentEdit::Title { value } => self.doc.title = value,
      DocumentEdit::Topic { value } => self.doc.topic = value,
      DocumentEdit::InstitutionName { value } => self.doc.branding.institution_name = value,
      DocumentEdit::InstructorName { value } => self.doc.branding.instructor_name = value,
      DocumentEdit::QuestionPrompt { index, value } => self.question_mut(index)?.prompt = value,
      DocumentEdit::QuestionOption { index, option, value } => {
        let q = self.question_mut(index)?;
        let slot = q
          .options
          .as_mut()
          .and_then(|opts| opts.get_mut(option))
          .ok_or_else(|| StudioError::InvalidRequest(format!("question {index} has no option {option}")))?;
        *slot = value;
      }
      DocumentEdit::QuestionAnswer { index, value } => self.question_mut(index)?.correct_answer = value,
      DocumentEdit::QuestionExplanation { index, value } => self.question_mut(index)?.explanation = value,
      DocumentEdit::QuestionPoints { index, points } => self.question_mut(index)?.points = points,
    }
    debug!(target: "studio", doc = %self.doc.id, "Edit applied");
    (self.on_update)(&self.doc);
    Ok(())
  }

  fn question_mut(&mut self, index: usize) -> StudioResult<&mut Question> {
    let len = self.doc.questions.len();
    self
      .doc
      .questions
      .get_mut(index)
      .ok_or_else(|| StudioError::InvalidRequest(format!("question index {index} out of range (len {len})")))
  }
}

fn option_letter(i: usize) -> char {
  (b'A' + (i % 26) as u8) as char
}

fn answer_space(kind: QuestionKind, layout: Layout) -> &'static str {
  match (kind, layout) {
    (QuestionKind::MultipleChoice | QuestionKind::TrueFalse | QuestionKind::Matching, _) => "",
    (_, Layout::Compact) => "\n   Answer: ______________\n",
    (QuestionKind::FillInTheBlank | QuestionKind::ShortAnswer, _) => "\n   Answer: ________________________________\n",
    (QuestionKind::LongAnswer, _) => "\n   ________________________________________\n   ________________________________________\n   ________________________________________\n",
  }
}

/// Printable markdown. Consecutive questions sharing a section instruction
/// are grouped under one heading.
pub fn render_markdown(doc: &GeneratedDocument, include_answer_key: bool) -> String {
  let mut out = String::new();
  let b = &doc.branding;
  if !b.institution_name.is_empty() {
    let _ = writeln!(out, "**{}**\n", b.institution_name);
  }
  let _ = writeln!(out, "# {}\n", doc.title);
  let _ = writeln!(out, "{} · {} · {}", doc.document_type.label(), doc.topic, doc.educational_level);
  if !b.instructor_name.is_empty() {
    let _ = writeln!(out, "Instructor: {}", b.instructor_name);
  }
  let _ = writeln!(out, "\nName: ____________________  Date: __________  Total: ___ / {}\n", doc.total_points());

  let mut current_section: Option<&str> = None;
  for (i, q) in doc.questions.iter().enumerate() {
    if current_section != Some(q.section_instruction.as_str()) {
      current_section = Some(q.section_instruction.as_str());
      if !q.section_instruction.is_empty() {
        let _ = writeln!(out, "## {}\n", q.section_instruction);
      }
    }
    let star = if q.is_challenge { " ★" } else { "" };
    let pts = if q.points == 1 { "1 pt".to_string() } else { format!("{} pts", q.points) };
    let _ = writeln!(out, "{}. {}{} ({})", i + 1, q.prompt, star, pts);
    if let Some(options) = &q.options {
      for (j, opt) in options.iter().enumerate() {
        let _ = writeln!(out, "   {}) {}", option_letter(j), opt);
      }
    }
    out.push_str(answer_space(q.kind, doc.layout));
    out.push('\n');
  }

  if include_answer_key {
    let _ = writeln!(out, "---\n\n## Answer key\n");
    for (i, q) in doc.questions.iter().enumerate() {
      let _ = write!(out, "{}. {}", i + 1, q.correct_answer);
      if !q.explanation.is_empty() {
        let _ = write!(out, " ({})", q.explanation);
      }
      out.push('\n');
    }
  }
  out
}

/// Render and upload; returns the public link.
#[instrument(level = "info", skip_all, fields(doc = %doc.id))]
pub async fn share_document(store: &dyn ObjectStore, doc: &GeneratedDocument, include_answer_key: bool) -> StudioResult<String> {
  let body = render_markdown(doc, include_answer_key);
  store.put(&doc.title, body.into_bytes(), "text/markdown").await
}
