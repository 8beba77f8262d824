//! Error taxonomy for the studio backend and its HTTP mapping.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Typed failures reported by the generation backend client.
///
/// The client classifies credential problems itself, so callers never have to
/// look inside error messages.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
  #[error("backend rejected the credentials: {0}")]
  Credential(String),
  #[error("backend HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("backend returned no content")]
  EmptyResponse,
  #[error("backend returned malformed JSON: {0}")]
  Malformed(String),
  #[error("backend transport error: {0}")]
  Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
  #[error("missing required input: {0}")]
  MissingInput(&'static str),
  #[error("generation backend credentials are missing or invalid")]
  CredentialMissing,
  #[error("backend returned no {0}")]
  EmptyResult(&'static str),
  #[error("upload failed: {0}")]
  Upload(String),
  #[error(transparent)]
  Backend(BackendError),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("invalid request: {0}")]
  InvalidRequest(String),
  #[error("request was cancelled")]
  Cancelled,
  #[error("storage error: {0}")]
  Storage(String),
}

pub type StudioResult<T> = Result<T, StudioError>;

impl From<BackendError> for StudioError {
  fn from(e: BackendError) -> Self {
    match e {
      BackendError::Credential(_) => StudioError::CredentialMissing,
      other => StudioError::Backend(other),
    }
  }
}

impl StudioError {
  /// Stable machine-readable tag used in JSON error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      StudioError::MissingInput(_) => "missing_input",
      StudioError::CredentialMissing => "credential_missing",
      StudioError::EmptyResult(_) => "empty_result",
      StudioError::Upload(_) => "upload_error",
      StudioError::Backend(_) => "backend_error",
      StudioError::NotFound(_) => "not_found",
      StudioError::InvalidRequest(_) => "invalid_request",
      StudioError::Cancelled => "cancelled",
      StudioError::Storage(_) => "storage_error",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      StudioError::MissingInput(_) | StudioError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      StudioError::CredentialMissing => StatusCode::UNAUTHORIZED,
      StudioError::NotFound(_) => StatusCode::NOT_FOUND,
      StudioError::EmptyResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
      StudioError::Cancelled => StatusCode::CONFLICT,
      StudioError::Backend(_) | StudioError::Upload(_) => StatusCode::BAD_GATEWAY,
      StudioError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for StudioError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "studio", kind = self.kind(), error = %self, "Request failed");
    } else {
      warn!(target: "studio", kind = self.kind(), error = %self, "Request rejected");
    }
    let body = json!({ "error": self.kind(), "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn credential_failures_collapse_into_credential_missing() {
    let e: StudioError = BackendError::Credential("HTTP 401".into()).into();
    assert!(matches!(e, StudioError::CredentialMissing));
    assert_eq!(e.status(), StatusCode::UNAUTHORIZED);

    let e: StudioError = BackendError::Http { status: 500, message: "boom".into() }.into();
    assert_eq!(e.kind(), "backend_error");
    assert_eq!(e.status(), StatusCode::BAD_GATEWAY);
  }
}
