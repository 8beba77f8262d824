//! Loading studio configuration (prompts + timing knobs) from TOML.
//!
//! Every field has a default, so an absent or partial file is fine.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
  pub prompts: Prompts,
  /// Seconds between background credential re-checks.
  pub credential_recheck_secs: u64,
  /// Per-request timeout for the generation backend.
  pub request_timeout_secs: u64,
  /// Largest accepted request body. Source files and logos arrive base64
  /// encoded inside JSON, so this must leave room for a full curriculum PDF.
  pub body_limit_bytes: usize,
}

impl Default for StudioConfig {
  fn default() -> Self {
    Self {
      prompts: Prompts::default(),
      credential_recheck_secs: 60,
      request_timeout_secs: 90,
      body_limit_bytes: 25 * 1024 * 1024,
    }
  }
}

/// Prompts used by the generation client. Placeholders in `{braces}` are
/// filled by the suite generator and the curriculum mapper.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub generation_user_template: String,
  pub curriculum_system: String,
  pub curriculum_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an expert assessment designer for teachers. You write clear, accurate, age-appropriate questions with unambiguous answer keys. Respond ONLY with JSON matching the provided schema.".into(),
      generation_user_template: "Create a {document_type} about \"{topic}\".\n\
Audience: {audience}, educational level: {level}.\n\
Learner profile: {profile}\n\
Cognitive depth: {depth}\n\
Layout: {layout}\n\
Write every question, option, answer and explanation in {language}.\n\
Questions required ({total} in total):\n{question_counts}\n\
{source}\
{specific_instructions}\
{standard_reference}\n\
Rules: give every question a unique id; group questions with a short sectionInstruction; for MCQ put the full text of the correct option in correctAnswer; for TRUE_FALSE use the options [\"True\", \"False\"]; mark at most two questions with isChallenge=true.".into(),
      curriculum_system: "You are a curriculum planner. Split teaching material into discrete lesson units. Respond ONLY with JSON matching the provided schema.".into(),
      curriculum_user_template: "Break the following material into lessons. For each lesson give a short title, a two-sentence summary, and up to five suggested assessment questions.\n\n{source}".into(),
    }
  }
}

/// Load `StudioConfig` from STUDIO_CONFIG_PATH, falling back to defaults on any error.
pub fn load_config_from_env() -> StudioConfig {
  let Ok(path) = std::env::var("STUDIO_CONFIG_PATH") else {
    return StudioConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<StudioConfig>(&s) {
      Ok(cfg) => {
        info!(target: "studio", %path, "Loaded studio config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "studio", %path, error = %e, "Failed to parse TOML config; using defaults");
        StudioConfig::default()
      }
    },
    Err(e) => {
      error!(target: "studio", %path, error = %e, "Failed to read TOML config file; using defaults");
      StudioConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: StudioConfig = toml::from_str(
      r#"
credential_recheck_secs = 15

[prompts]
curriculum_system = "Plan lessons."
"#,
    )
    .unwrap();
    assert_eq!(cfg.credential_recheck_secs, 15);
    assert_eq!(cfg.request_timeout_secs, 90);
    assert_eq!(cfg.body_limit_bytes, 25 * 1024 * 1024);
    assert_eq!(cfg.prompts.curriculum_system, "Plan lessons.");
    assert!(cfg.prompts.generation_user_template.contains("{topic}"));
  }
}
