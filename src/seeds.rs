//! Built-in intents: the default intent and the fixed template presets.

use uuid::Uuid;

use crate::domain::{CognitiveDepth, DocumentIntent, DocumentType, Layout, LearnerProfile, QuestionCounts, QuestionKind};

fn counts(pairs: &[(QuestionKind, u32)]) -> QuestionCounts {
  pairs.iter().copied().collect()
}

fn intent(
  document_type: DocumentType,
  learner_profile: LearnerProfile,
  cognitive_depth: CognitiveDepth,
  question_counts: QuestionCounts,
  specific_instructions: Option<&str>,
) -> DocumentIntent {
  DocumentIntent {
    id: Uuid::new_v4().to_string(),
    document_type,
    learner_profile,
    layout: Layout::Classic,
    cognitive_depth,
    question_counts,
    specific_instructions: specific_instructions.map(str::to_string),
  }
}

/// What `add_intent` appends: a short general-audience quiz.
pub fn default_intent() -> DocumentIntent {
  intent(
    DocumentType::Quiz,
    LearnerProfile::General,
    CognitiveDepth::Understanding,
    counts(&[(QuestionKind::MultipleChoice, 5), (QuestionKind::ShortAnswer, 2)]),
    None,
  )
}

/// Three-tier assessment pack: homework, quiz, exam, in that order.
pub fn standard_suite() -> Vec<DocumentIntent> {
  vec![
    intent(
      DocumentType::Homework,
      LearnerProfile::General,
      CognitiveDepth::Recall,
      counts(&[(QuestionKind::FillInTheBlank, 5), (QuestionKind::ShortAnswer, 3)]),
      Some("Practice-oriented; reinforce the core vocabulary of the topic."),
    ),
    intent(
      DocumentType::Quiz,
      LearnerProfile::General,
      CognitiveDepth::Application,
      counts(&[(QuestionKind::MultipleChoice, 8), (QuestionKind::TrueFalse, 4)]),
      None,
    ),
    intent(
      DocumentType::Exam,
      LearnerProfile::General,
      CognitiveDepth::Analysis,
      counts(&[
        (QuestionKind::MultipleChoice, 10),
        (QuestionKind::ShortAnswer, 4),
        (QuestionKind::LongAnswer, 2),
      ]),
      Some("Summative; include at least one challenge question."),
    ),
  ]
}

/// Three-tier differentiation pack: the same worksheet pitched at support, core and extension level.
pub fn differentiation_pack() -> Vec<DocumentIntent> {
  vec![
    intent(
      DocumentType::Worksheet,
      LearnerProfile::SpecialEd,
      CognitiveDepth::Recall,
      counts(&[(QuestionKind::MultipleChoice, 5), (QuestionKind::Matching, 1)]),
      Some("Support tier: short sentences, one idea per question, generous scaffolding."),
    ),
    intent(
      DocumentType::Worksheet,
      LearnerProfile::General,
      CognitiveDepth::Understanding,
      counts(&[(QuestionKind::MultipleChoice, 5), (QuestionKind::ShortAnswer, 3)]),
      Some("Core tier."),
    ),
    intent(
      DocumentType::Worksheet,
      LearnerProfile::Gifted,
      CognitiveDepth::Evaluation,
      counts(&[(QuestionKind::ShortAnswer, 3), (QuestionKind::LongAnswer, 2)]),
      Some("Extension tier: open-ended, transfer the idea to an unfamiliar context."),
    ),
  ]
}
