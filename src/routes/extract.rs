//! Request extractors whose rejections use the studio JSON error body.
//!
//! `ApiJson` / `ApiQuery` wrap axum's extractors; `Ids` deserializes the path
//! and checks every workspace / document id before a handler runs, so ids are
//! always safe to embed in storage keys.

use axum::{
  async_trait,
  extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts, Path, Query, Request,
  },
  http::request::Parts,
  Json,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::StudioError;

const MAX_ID_CHARS: usize = 64;

impl From<JsonRejection> for StudioError {
  fn from(r: JsonRejection) -> Self {
    StudioError::InvalidRequest(r.body_text())
  }
}

impl From<QueryRejection> for StudioError {
  fn from(r: QueryRejection) -> Self {
    StudioError::InvalidRequest(r.body_text())
  }
}

impl From<PathRejection> for StudioError {
  fn from(r: PathRejection) -> Self {
    StudioError::InvalidRequest(r.body_text())
  }
}

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = StudioError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state).await?;
    Ok(ApiJson(value))
  }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = StudioError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
    Ok(ApiQuery(value))
  }
}

/// `1..=64` chars of `[A-Za-z0-9_-]`, otherwise `InvalidRequest`.
pub fn check_id(what: &str, id: &str) -> Result<(), StudioError> {
  let ok = !id.is_empty()
    && id.chars().count() <= MAX_ID_CHARS
    && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if ok {
    Ok(())
  } else {
    Err(StudioError::InvalidRequest(format!(
      "{what} must be 1-{MAX_ID_CHARS} characters from A-Z, a-z, 0-9, '_' and '-'"
    )))
  }
}

/// Path parameters that carry ids.
pub trait PathIds {
  fn ids(&self) -> Vec<(&'static str, &str)>;
}

#[derive(Deserialize)]
pub struct WorkspacePath {
  pub ws: String,
}

#[derive(Deserialize)]
pub struct DocumentPath {
  pub ws: String,
  pub id: String,
}

#[derive(Deserialize)]
pub struct IntentPath {
  pub ws: String,
  pub index: usize,
}

impl PathIds for WorkspacePath {
  fn ids(&self) -> Vec<(&'static str, &str)> {
    vec![("workspace id", &self.ws)]
  }
}

impl PathIds for DocumentPath {
  fn ids(&self) -> Vec<(&'static str, &str)> {
    vec![("workspace id", &self.ws), ("document id", &self.id)]
  }
}

impl PathIds for IntentPath {
  fn ids(&self) -> Vec<(&'static str, &str)> {
    vec![("workspace id", &self.ws)]
  }
}

/// Validated path parameters.
pub struct Ids<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Ids<T>
where
  T: DeserializeOwned + PathIds + Send,
  S: Send + Sync,
{
  type Rejection = StudioError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
    for (what, id) in value.ids() {
      check_id(what, id)?;
    }
    Ok(Ids(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_restricted_to_a_safe_alphabet() {
    assert!(check_id("workspace id", "team_a").is_ok());
    assert!(check_id("document id", "3f2a9c1e-0b7d-4c55-9a65-1d2e3f4a5b6c").is_ok());
    assert!(check_id("workspace id", "team.a").is_err());
    assert!(check_id("workspace id", "").is_err());
    assert!(check_id("workspace id", &"x".repeat(65)).is_err());
  }
}
