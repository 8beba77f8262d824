//! HTTP client for the hosted generation model.
//!
//! Speaks the OpenAI-compatible `chat/completions` protocol (the Gemini API
//! exposes it under `/v1beta/openai`) and always requests a JSON object
//! constrained by a schema. Calls log model names, latencies and token usage,
//! never prompt contents or the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::backend::{BackendRequest, DocumentDraft, GenerationBackend, LessonPlan, LessonSummary};
use crate::domain::SourceFile;
use crate::error::BackendError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
}

impl GeminiClient {
  /// Construct the client if GEMINI_API_KEY (or API_KEY) is set; otherwise None.
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Schema-constrained chat completion, decoded into `T`.
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, schema = req.schema_name))]
  async fn chat_json<T: DeserializeOwned>(&self, req: &BackendRequest) -> Result<T, BackendError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: MessageContent::Text(req.system.clone()) },
        ChatMessageReq { role: "user".into(), content: user_content(&req.user, req.file.as_ref()) },
      ],
      temperature: req.temperature,
      response_format: ResponseFormat {
        r#type: "json_schema".into(),
        json_schema: JsonSchemaFormat { name: req.schema_name.into(), schema: req.schema.clone(), strict: false },
      },
    };

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "worksheet-studio-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body)
      .send()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))?;

    let status = res.status();
    if !status.is_success() {
      let text = res.text().await.unwrap_or_default();
      let message = extract_api_error(&text).unwrap_or(text);
      error!(elapsed = ?start.elapsed(), status = status.as_u16(), "Model call failed");
      return Err(classify_failure(status.as_u16(), message));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| BackendError::Malformed(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.clone())
      .map(|t| strip_code_fence(&t).to_string())
      .unwrap_or_default();
    if text.trim().is_empty() {
      return Err(BackendError::EmptyResponse);
    }
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");

    serde_json::from_str::<T>(&text).map_err(|e| BackendError::Malformed(e.to_string()))
  }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
  async fn generate_document(&self, req: &BackendRequest) -> Result<DocumentDraft, BackendError> {
    self.chat_json::<DocumentDraft>(req).await
  }

  async fn map_curriculum(&self, req: &BackendRequest) -> Result<Vec<LessonSummary>, BackendError> {
    Ok(self.chat_json::<LessonPlan>(req).await?.lessons)
  }

  #[instrument(level = "debug", skip(self))]
  async fn check_credentials(&self) -> Result<(), BackendError> {
    let res = self
      .client
      .get(format!("{}/models", self.base_url))
      .header(USER_AGENT, "worksheet-studio-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .send()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = res.status();
    if status.is_success() {
      return Ok(());
    }
    let text = res.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), extract_api_error(&text).unwrap_or(text)))
  }
}

/// Map a failed HTTP exchange to a typed error. Credential problems are
/// recognized here so no caller ever inspects message text.
pub(crate) fn classify_failure(status: u16, message: String) -> BackendError {
  let credential = matches!(status, 401 | 403)
    || message.contains("API_KEY")
    || (status == 404 && message.contains("Requested entity was not found"));
  if credential {
    BackendError::Credential(format!("HTTP {status}: {message}"))
  } else {
    BackendError::Http { status, message }
  }
}

/// Text files are inlined into the prompt; anything else travels as a data URI part.
fn user_content(text: &str, file: Option<&SourceFile>) -> MessageContent {
  let Some(file) = file else {
    return MessageContent::Text(text.to_string());
  };
  if file.is_text() {
    if let Ok(bytes) = file.decode() {
      let inlined = String::from_utf8_lossy(&bytes);
      return MessageContent::Text(format!("{text}\n\n--- Attached source ({}) ---\n{inlined}", file.mime_type));
    }
  }
  MessageContent::Parts(vec![
    ContentPart::Text { text: text.to_string() },
    ContentPart::ImageUrl {
      image_url: ImageUrl { url: format!("data:{};base64,{}", file.mime_type, file.data_base64.trim()) },
    },
  ])
}

/// Some models wrap JSON in ```json fences despite the response format.
fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  match t.strip_prefix("```") {
    Some(rest) => {
      let rest = rest.strip_prefix("json").unwrap_or(rest);
      rest.strip_suffix("```").unwrap_or(rest).trim()
    }
    None => t,
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  response_format: ResponseFormat,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: MessageContent }
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
  Text(String),
  Parts(Vec<ContentPart>),
}
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  Text { text: String },
  ImageUrl { image_url: ImageUrl },
}
#[derive(Serialize)]
struct ImageUrl { url: String }
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")] r#type: String,
  json_schema: JsonSchemaFormat,
}
#[derive(Serialize)]
struct JsonSchemaFormat { name: String, schema: Value, strict: bool }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
/// Accepts both `{"error":{...}}` and `[{"error":{...}}]`.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  if let Ok(w) = serde_json::from_str::<EWrap>(body) {
    return Some(w.error.message);
  }
  serde_json::from_str::<Vec<EWrap>>(body)
    .ok()
    .and_then(|v| v.into_iter().next())
    .map(|w| w.error.message)
}
