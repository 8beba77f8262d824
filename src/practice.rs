//! Practice sessions: replay a document as a scored quiz.
//!
//! Phases: Unanswered -> Answering -> Submitted (scored). Submission is
//! irreversible except through `reset`, which also drops the persisted
//! progress record. Scoring is plain string equality after trimming and
//! case-folding; every question kind is scored the same way.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::archive::prepend_capped;
use crate::domain::{GeneratedDocument, QuizAttempt};
use crate::error::{StudioError, StudioResult};
use crate::storage::{load_json, quiz_history_key, quiz_progress_key, save_json, KvStore};
use crate::util::{normalize_answer, now_millis};

pub const HISTORY_CAP: usize = 10;

/// Persisted mid-session state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizProgress {
  pub answers: HashMap<String, String>,
  pub submitted: bool,
  #[serde(default)]
  pub score: Option<u32>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
  Unanswered,
  Answering { answered: usize, total: usize },
  Submitted { score: u32, total: u32 },
}

/// Count of questions whose normalized answer equals the normalized key.
pub fn score_answers(doc: &GeneratedDocument, answers: &HashMap<String, String>) -> u32 {
  doc
    .questions
    .iter()
    .filter(|q| {
      answers
        .get(&q.id)
        .map(|a| normalize_answer(a) == normalize_answer(&q.correct_answer))
        .unwrap_or(false)
    })
    .count() as u32
}

pub struct PracticeSession {
  doc: GeneratedDocument,
  store: Arc<dyn KvStore>,
  progress: QuizProgress,
}

impl PracticeSession {
  /// Open a session, resuming any persisted progress.
  pub fn load(doc: GeneratedDocument, store: Arc<dyn KvStore>) -> StudioResult<Self> {
    let progress = load_json(store.as_ref(), &quiz_progress_key(&doc.id))?.unwrap_or_default();
    Ok(Self { doc, store, progress })
  }

  pub fn progress(&self) -> &QuizProgress {
    &self.progress
  }

  pub fn phase(&self) -> SessionPhase {
    let total = self.doc.questions.len();
    if self.progress.submitted {
      SessionPhase::Submitted { score: self.progress.score.unwrap_or(0), total: total as u32 }
    } else if self.progress.answers.is_empty() {
      SessionPhase::Unanswered
    } else {
      SessionPhase::Answering { answered: self.progress.answers.len(), total }
    }
  }

  #[instrument(level = "debug", skip(self, text), fields(doc = %self.doc.id, %question_id))]
  pub fn answer(&mut self, question_id: &str, text: &str) -> StudioResult<()> {
    if self.progress.submitted {
      return Err(StudioError::InvalidRequest("quiz already submitted; reset to try again".into()));
    }
    if !self.doc.questions.iter().any(|q| q.id == question_id) {
      return Err(StudioError::InvalidRequest(format!("unknown question {question_id}")));
    }
    self.progress.answers.insert(question_id.to_string(), text.to_string());
    self.persist_progress()
  }

  /// Score, record one attempt, and persist the submitted state.
  #[instrument(level = "info", skip(self), fields(doc = %self.doc.id))]
  pub fn submit(&mut self) -> StudioResult<QuizAttempt> {
    if self.progress.submitted {
      return Err(StudioError::InvalidRequest("quiz already submitted".into()));
    }
    let score = score_answers(&self.doc, &self.progress.answers);
    let attempt = QuizAttempt { score, total: self.doc.questions.len() as u32, timestamp: now_millis() };

    let history = self.history()?;
    let history = prepend_capped(history, vec![attempt.clone()], HISTORY_CAP);
    save_json(self.store.as_ref(), &quiz_history_key(&self.doc.id), &history)?;

    self.progress.submitted = true;
    self.progress.score = Some(score);
    self.persist_progress()?;
    info!(target: "practice", doc = %self.doc.id, score, total = attempt.total, "Quiz submitted");
    Ok(attempt)
  }

  /// Clear answers and submission; removes the persisted progress record.
  pub fn reset(&mut self) -> StudioResult<()> {
    self.progress = QuizProgress::default();
    self.store.remove(&quiz_progress_key(&self.doc.id))?;
    Ok(())
  }

  pub fn history(&self) -> StudioResult<Vec<QuizAttempt>> {
    Ok(load_json(self.store.as_ref(), &quiz_history_key(&self.doc.id))?.unwrap_or_default())
  }

  fn persist_progress(&self) -> StudioResult<()> {
    save_json(self.store.as_ref(), &quiz_progress_key(&self.doc.id), &self.progress)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{BrandingFields, DocumentType, Layout, LearnerProfile, Question, QuestionKind};
  use crate::storage::MemoryStore;

  fn question(id: &str, kind: QuestionKind, answer: &str) -> Question {
    Question {
      id: id.into(),
      kind,
      section_instruction: String::new(),
      prompt: format!("Prompt {id}"),
      options: None,
      correct_answer: answer.into(),
      explanation: String::new(),
      is_challenge: false,
      points: 1,
    }
  }

  fn quiz() -> GeneratedDocument {
    GeneratedDocument {
      id: "w1".into(),
      title: "Capitals".into(),
      topic: "Geography".into(),
      educational_level: "Grade 5".into(),
      document_type: DocumentType::Quiz,
      learner_profile: LearnerProfile::General,
      layout: Layout::Classic,
      language: "English".into(),
      questions: vec![
        question("q1", QuestionKind::ShortAnswer, "Paris"),
        question("q2", QuestionKind::MultipleChoice, "B) Madrid"),
      ],
      branding: BrandingFields::default(),
      saved_at: 0,
    }
  }

  #[test]
  fn scoring_ignores_whitespace_and_case() {
    let doc = quiz();
    for variant in ["Paris", " paris ", "PARIS"] {
      let answers = HashMap::from([("q1".to_string(), variant.to_string())]);
      assert_eq!(score_answers(&doc, &answers), 1, "variant {variant:?}");
    }
    let wrong = HashMap::from([("q1".to_string(), "Lyon".to_string())]);
    assert_eq!(score_answers(&doc, &wrong), 0);
  }

  #[test]
  fn full_session_lifecycle() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut s = PracticeSession::load(quiz(), store.clone()).unwrap();
    assert_eq!(s.phase(), SessionPhase::Unanswered);

    s.answer("q1", "paris").unwrap();
    assert_eq!(s.phase(), SessionPhase::Answering { answered: 1, total: 2 });

    // reload resumes mid-session
    let mut s = PracticeSession::load(quiz(), store.clone()).unwrap();
    assert_eq!(s.progress().answers.get("q1").map(String::as_str), Some("paris"));

    s.answer("q2", "b) madrid").unwrap();
    let attempt = s.submit().unwrap();
    assert_eq!((attempt.score, attempt.total), (2, 2));
    assert_eq!(s.phase(), SessionPhase::Submitted { score: 2, total: 2 });
    assert!(matches!(s.answer("q1", "x"), Err(StudioError::InvalidRequest(_))));
    assert!(matches!(s.submit(), Err(StudioError::InvalidRequest(_))));

    s.reset().unwrap();
    assert_eq!(s.phase(), SessionPhase::Unanswered);
    assert!(store.get_raw(&quiz_progress_key("w1")).unwrap().is_none());
    assert_eq!(s.history().unwrap().len(), 1);
  }

  #[test]
  fn history_is_capped_newest_first() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut s = PracticeSession::load(quiz(), store).unwrap();
    for round in 0..(HISTORY_CAP + 3) {
      if round % 2 == 0 {
        s.answer("q1", "Paris").unwrap();
      }
      s.submit().unwrap();
      let history = s.history().unwrap();
      assert_eq!(history.len(), (round + 1).min(HISTORY_CAP));
      assert_eq!(history[0].score, if round % 2 == 0 { 1 } else { 0 });
      s.reset().unwrap();
    }
  }

  #[test]
  fn unknown_question_is_rejected() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let mut s = PracticeSession::load(quiz(), store).unwrap();
    assert!(matches!(s.answer("nope", "x"), Err(StudioError::InvalidRequest(_))));
  }
}
