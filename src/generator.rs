//! Suite generator: one backend request per intent, all-or-nothing archiving.
//!
//! Requests are issued sequentially in queue order. Any failure (or a
//! cancellation) aborts the batch before anything reaches the archive.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::archive::ArchiveStore;
use crate::backend::{document_schema, BackendRequest, DocumentDraft, GenerationBackend};
use crate::config::Prompts;
use crate::domain::{
  total_questions, AudienceCategory, BrandingFields, CognitiveDepth, DocumentIntent, GeneratedDocument,
  GenerationParams, Layout, LearnerProfile, Question, QuestionKind,
};
use crate::error::{StudioError, StudioResult};
use crate::util::{fill_template, now_millis, preview};

/// Everything a batch needs besides the intents.
pub struct SuiteContext<'a> {
  pub backend: &'a dyn GenerationBackend,
  pub prompts: &'a Prompts,
  pub archive: &'a ArchiveStore,
  pub branding: BrandingFields,
  pub workspace: &'a str,
}

fn audience_text(a: AudienceCategory) -> &'static str {
  match a {
    AudienceCategory::Primary => "primary school",
    AudienceCategory::Secondary => "secondary school",
    AudienceCategory::HigherEducation => "higher education",
    AudienceCategory::Professional => "professional training",
  }
}

fn profile_text(p: LearnerProfile) -> &'static str {
  match p {
    LearnerProfile::General => "general classroom; no special adjustments.",
    LearnerProfile::Esl => "English-as-a-second-language learners; plain vocabulary, short sentences, define key terms in context.",
    LearnerProfile::Gifted => "gifted learners; add depth, abstraction and at least one open-ended extension.",
    LearnerProfile::SpecialEd => "learners with additional support needs; one idea per question, clear scaffolding, no trick wording.",
    LearnerProfile::Remedial => "learners catching up; start from fundamentals and build confidence with worked hints.",
  }
}

fn depth_text(d: CognitiveDepth) -> &'static str {
  match d {
    CognitiveDepth::Recall => "RECALL: remember facts and definitions (easy).",
    CognitiveDepth::Understanding => "UNDERSTANDING: explain ideas in own words (easy to medium).",
    CognitiveDepth::Application => "APPLICATION: use knowledge in new situations (medium).",
    CognitiveDepth::Analysis => "ANALYSIS: break information into parts and relate them (medium to hard).",
    CognitiveDepth::Evaluation => "EVALUATION: justify a judgement with evidence (hard).",
    CognitiveDepth::Creation => "CREATION: produce an original design or argument (hard).",
  }
}

fn layout_text(l: Layout) -> &'static str {
  match l {
    Layout::Classic => "classic single column; moderate answer space.",
    Layout::TwoColumn => "two columns; keep prompts and options short.",
    Layout::Compact => "compact; minimal instructions, dense questions.",
  }
}

fn counts_text(intent: &DocumentIntent) -> String {
  intent
    .question_counts
    .iter()
    .filter(|(_, n)| **n > 0)
    .map(|(kind, n)| format!("- {n} x {} ({})", kind.tag(), kind.label()))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Assemble the prompt + schema for one intent.
pub fn build_document_request(prompts: &Prompts, params: &GenerationParams, intent: &DocumentIntent) -> BackendRequest {
  let source = match params.source_text.as_deref().map(str::trim) {
    Some(text) if !text.is_empty() => format!("Base the questions strictly on this source material:\n\"\"\"\n{text}\n\"\"\"\n"),
    _ if params.source_file.is_some() => "Base the questions strictly on the attached source file.\n".to_string(),
    _ => String::new(),
  };
  let specific = intent
    .specific_instructions
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| format!("Teacher instructions: {s}\n"))
    .unwrap_or_default();
  let standard = "Where a recognised curriculum standard applies, align the questions to it and mention its code in the relevant sectionInstruction.";
  let total = total_questions(&intent.question_counts).to_string();

  let user = fill_template(
    &prompts.generation_user_template,
    &[
      ("document_type", intent.document_type.label()),
      ("topic", params.topic.trim()),
      ("audience", audience_text(params.audience)),
      ("level", params.educational_level.trim()),
      ("profile", profile_text(intent.learner_profile)),
      ("depth", depth_text(intent.cognitive_depth)),
      ("layout", layout_text(intent.layout)),
      ("language", params.language.trim()),
      ("question_counts", &counts_text(intent)),
      ("total", &total),
      ("source", &source),
      ("specific_instructions", &specific),
      ("standard_reference", standard),
    ],
  );

  BackendRequest {
    system: prompts.generation_system.clone(),
    user,
    file: params.source_file.clone(),
    schema_name: "generated_document",
    schema: document_schema(),
    temperature: 0.7,
  }
}

/// Turn a draft into questions with unique ids and normalized fields.
pub fn questions_from_draft(draft: DocumentDraft) -> Vec<Question> {
  let mut seen = HashSet::new();
  draft
    .questions
    .into_iter()
    .enumerate()
    .map(|(i, q)| {
      let mut id = q.id.trim().to_string();
      let mut n = i + 1;
      while id.is_empty() || seen.contains(&id) {
        id = format!("q{n}");
        n += 1;
      }
      seen.insert(id.clone());
      let options = match (q.kind, q.options) {
        (QuestionKind::TrueFalse, None) => Some(vec!["True".to_string(), "False".to_string()]),
        (_, Some(opts)) if opts.is_empty() => None,
        (_, opts) => opts,
      };
      if q.kind.needs_options() && options.is_none() {
        warn!(target: "generation", question = %id, kind = q.kind.tag(), "Choice question arrived without options");
      }
      Question {
        id,
        kind: q.kind,
        section_instruction: q.section_instruction,
        prompt: q.question,
        options,
        correct_answer: q.correct_answer,
        explanation: q.explanation,
        is_challenge: q.is_challenge,
        points: q.points.filter(|p| *p > 0).unwrap_or(1),
      }
    })
    .collect()
}

/// Checks that need no backend: a non-blank topic and a decodable source file.
pub fn validate_params(params: &GenerationParams) -> StudioResult<()> {
  if params.topic.trim().is_empty() {
    return Err(StudioError::MissingInput("topic"));
  }
  if let Some(file) = &params.source_file {
    file.decode().map_err(|e| StudioError::InvalidRequest(format!("sourceFile is not valid base64: {e}")))?;
  }
  Ok(())
}

/// Generate one document per intent and archive the whole batch on success.
///
/// Returned documents are in intent order; their `savedAt` values strictly
/// increase in that order and exceed every timestamp already archived, and
/// the archive receives them newest-first.
#[instrument(level = "info", skip_all, fields(workspace = %ctx.workspace, intents = intents.len(), topic = %preview(&params.topic, 40)))]
pub async fn generate_suite(
  ctx: &SuiteContext<'_>,
  intents: &[DocumentIntent],
  params: &GenerationParams,
  cancel: &CancellationToken,
) -> StudioResult<Vec<GeneratedDocument>> {
  validate_params(params)?;
  if intents.is_empty() {
    return Err(StudioError::MissingInput("intents"));
  }

  let started = now_millis();
  let mut drafts = Vec::with_capacity(intents.len());
  for (index, intent) in intents.iter().enumerate() {
    if cancel.is_cancelled() {
      info!(target: "generation", index, "Batch cancelled before request");
      return Err(StudioError::Cancelled);
    }
    let req = build_document_request(ctx.prompts, params, intent);
    let result = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(StudioError::Cancelled),
      r = ctx.backend.generate_document(&req) => r,
    };
    let draft = result.map_err(|e| {
      error!(target: "generation", index, intent = %intent.id, error = %e, "Generation failed; aborting batch");
      StudioError::from(e)
    })?;
    if draft.questions.is_empty() {
      error!(target: "generation", index, intent = %intent.id, "Backend returned a document without questions");
      return Err(StudioError::EmptyResult("questions"));
    }
    info!(target: "generation", index, title = %preview(&draft.title, 40), questions = draft.questions.len(), "Document generated");
    drafts.push((intent, draft));
  }

  let base = match ctx.archive.newest_saved_at(ctx.workspace)? {
    Some(newest) => started.max(newest + 1),
    None => started,
  };
  let documents: Vec<GeneratedDocument> = drafts
    .into_iter()
    .enumerate()
    .map(|(i, (intent, draft))| GeneratedDocument {
      id: Uuid::new_v4().to_string(),
      title: draft.title.clone(),
      topic: if draft.topic.trim().is_empty() { params.topic.clone() } else { draft.topic.clone() },
      educational_level: params.educational_level.clone(),
      document_type: intent.document_type,
      learner_profile: intent.learner_profile,
      layout: intent.layout,
      language: params.language.clone(),
      questions: questions_from_draft(draft),
      branding: ctx.branding.clone(),
      saved_at: base + i as i64,
    })
    .collect();

  let newest_first: Vec<GeneratedDocument> = documents.iter().rev().cloned().collect();
  ctx.archive.append(ctx.workspace, newest_first).await?;
  info!(target: "generation", workspace = %ctx.workspace, documents = documents.len(), "Suite archived");
  Ok(documents)
}

#[cfg(test)]
pub(crate) mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use async_trait::async_trait;

  use super::*;
  use crate::backend::{LessonSummary, QuestionDraft};
  use crate::domain::{DocumentType, QuestionCounts};
  use crate::error::BackendError;
  use crate::seeds::default_intent;
  use crate::storage::MemoryStore;

  /// Scripted backend: returns queued results in order and records prompts.
  #[derive(Default)]
  pub struct ScriptedBackend {
    pub documents: Mutex<Vec<Result<DocumentDraft, BackendError>>>,
    pub lessons: Mutex<Vec<Result<Vec<LessonSummary>, BackendError>>>,
    pub prompts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
  }

  impl ScriptedBackend {
    pub fn with_documents(docs: Vec<Result<DocumentDraft, BackendError>>) -> Self {
      Self { documents: Mutex::new(docs), ..Default::default() }
    }
  }

  #[async_trait]
  impl GenerationBackend for ScriptedBackend {
    async fn generate_document(&self, req: &BackendRequest) -> Result<DocumentDraft, BackendError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.prompts.lock().unwrap().push(req.user.clone());
      let mut q = self.documents.lock().unwrap();
      if q.is_empty() { Err(BackendError::EmptyResponse) } else { q.remove(0) }
    }

    async fn map_curriculum(&self, req: &BackendRequest) -> Result<Vec<LessonSummary>, BackendError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.prompts.lock().unwrap().push(req.user.clone());
      let mut q = self.lessons.lock().unwrap();
      if q.is_empty() { Ok(vec![]) } else { q.remove(0) }
    }

    async fn check_credentials(&self) -> Result<(), BackendError> {
      Ok(())
    }
  }

  pub fn draft(title: &str, mcq: usize, short: usize) -> DocumentDraft {
    let mut questions = Vec::new();
    for i in 0..mcq {
      questions.push(QuestionDraft {
        id: format!("m{i}"),
        kind: QuestionKind::MultipleChoice,
        section_instruction: "Choose the best answer.".into(),
        question: format!("Multiple choice {i}"),
        options: Some(vec!["Light".into(), "Water".into(), "Soil".into(), "Wind".into()]),
        correct_answer: "Light".into(),
        explanation: String::new(),
        is_challenge: false,
        points: None,
      });
    }
    for i in 0..short {
      questions.push(QuestionDraft {
        id: format!("s{i}"),
        kind: QuestionKind::ShortAnswer,
        section_instruction: "Answer briefly.".into(),
        question: format!("Short answer {i}"),
        options: None,
        correct_answer: "Chlorophyll".into(),
        explanation: "Green pigment.".into(),
        is_challenge: i == 0,
        points: Some(2),
      });
    }
    DocumentDraft { title: title.into(), topic: "Photosynthesis".into(), questions }
  }

  pub fn params(topic: &str) -> GenerationParams {
    GenerationParams {
      topic: topic.into(),
      audience: AudienceCategory::Secondary,
      educational_level: "Grade 8".into(),
      language: "English".into(),
      source_text: None,
      source_file: None,
    }
  }

  /// Backend whose document calls never finish; `started` fires once one is in flight.
  #[derive(Default)]
  pub struct StalledBackend {
    pub started: tokio::sync::Notify,
  }

  #[async_trait]
  impl GenerationBackend for StalledBackend {
    async fn generate_document(&self, _req: &BackendRequest) -> Result<DocumentDraft, BackendError> {
      self.started.notify_one();
      std::future::pending().await
    }

    async fn map_curriculum(&self, _req: &BackendRequest) -> Result<Vec<LessonSummary>, BackendError> {
      Ok(vec![])
    }

    async fn check_credentials(&self) -> Result<(), BackendError> {
      Ok(())
    }
  }

  #[tokio::test]
  async fn photosynthesis_batch_lands_in_archive() {
    let backend = ScriptedBackend::with_documents(vec![Ok(draft("Photosynthesis Quiz", 5, 2))]);
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };

    let mut intent = default_intent();
    intent.question_counts = QuestionCounts::from([(QuestionKind::MultipleChoice, 5), (QuestionKind::ShortAnswer, 2)]);
    let start = now_millis();
    let docs = generate_suite(&ctx, &[intent], &params("Photosynthesis"), &CancellationToken::new()).await.unwrap();

    assert_eq!(docs.len(), 1);
    let stored = archive.load("ws").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].questions.len(), 7);
    assert!(stored[0].saved_at >= start);
    assert_eq!(stored[0].document_type, DocumentType::Quiz);

    let sent = backend.prompts.lock().unwrap();
    assert!(sent[0].contains("Photosynthesis"));
    assert!(sent[0].contains("5 x MCQ"));
    assert!(sent[0].contains("2 x SHORT_ANSWER"));
  }

  #[tokio::test]
  async fn failure_mid_batch_archives_nothing() {
    let backend = ScriptedBackend::with_documents(vec![
      Ok(draft("One", 1, 0)),
      Err(BackendError::Http { status: 503, message: "overloaded".into() }),
    ]);
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };

    let intents = vec![default_intent(), default_intent(), default_intent()];
    let err = generate_suite(&ctx, &intents, &params("Volcanoes"), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, StudioError::Backend(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert!(archive.load("ws").unwrap().is_empty());
  }

  #[tokio::test]
  async fn credential_failure_is_typed() {
    let backend = ScriptedBackend::with_documents(vec![Err(BackendError::Credential("HTTP 401".into()))]);
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };
    let err = generate_suite(&ctx, &[default_intent()], &params("Rivers"), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, StudioError::CredentialMissing));
  }

  #[tokio::test]
  async fn batch_is_newest_first_and_timestamps_increase() {
    let backend = ScriptedBackend::with_documents(vec![Ok(draft("A", 1, 0)), Ok(draft("B", 1, 0)), Ok(draft("C", 1, 0))]);
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };

    let docs = generate_suite(&ctx, &crate::seeds::standard_suite(), &params("Tides"), &CancellationToken::new()).await.unwrap();
    assert!(docs.windows(2).all(|w| w[0].saved_at < w[1].saved_at));
    assert_eq!(docs[0].document_type, DocumentType::Homework);

    let stored = archive.load("ws").unwrap();
    let titles: Vec<_> = stored.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["C", "B", "A"]);
    assert!(stored.windows(2).all(|w| w[0].saved_at > w[1].saved_at));
  }

  #[tokio::test]
  async fn rejects_missing_topic_and_cancelled_batches() {
    let backend = ScriptedBackend::with_documents(vec![Ok(draft("A", 1, 0))]);
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };

    let err = generate_suite(&ctx, &[default_intent()], &params("   "), &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, StudioError::MissingInput("topic")));

    let token = CancellationToken::new();
    token.cancel();
    let err = generate_suite(&ctx, &[default_intent()], &params("Tides"), &token).await.unwrap_err();
    assert!(matches!(err, StudioError::Cancelled));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn cancelling_while_a_request_is_pending_archives_nothing() {
    let backend = StalledBackend::default();
    let archive = ArchiveStore::new(Arc::new(MemoryStore::new()));
    let prompts = Prompts::default();
    let ctx = SuiteContext { backend: &backend, prompts: &prompts, archive: &archive, branding: BrandingFields::default(), workspace: "ws" };
    let token = CancellationToken::new();

    let intents = [default_intent(), default_intent()];
    let suite_params = params("Tides");
    let (result, ()) = tokio::join!(
      generate_suite(&ctx, &intents, &suite_params, &token),
      async {
        backend.started.notified().await;
        token.cancel();
      }
    );
    assert!(matches!(result, Err(StudioError::Cancelled)));
    assert!(archive.load("ws").unwrap().is_empty());
  }

  #[test]
  fn duplicate_question_ids_are_replaced() {
    let mut d = draft("Dup", 2, 0);
    d.questions[1].id = d.questions[0].id.clone();
    d.questions[0].options = Some(vec![]);
    let qs = questions_from_draft(d);
    assert_ne!(qs[0].id, qs[1].id);
    assert_eq!(qs[0].options, None);
    assert_eq!(qs[0].points, 1);
  }
}
