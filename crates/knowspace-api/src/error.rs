//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as `{ "statusCode", "message", "errors"? }`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use knowspace_core::store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// An error returned by an API handler or extractor.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("validation failed")]
  Validation(Vec<String>),

  #[error("file storage error: {0}")]
  Storage(#[from] std::io::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure: domain errors become 4xx, the rest 500.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.domain() {
      Some(domain) => domain_error(domain),
      None => ApiError::Store(Box::new(e)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Storage(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

fn domain_error(e: &knowspace_core::Error) -> ApiError {
  match e {
    knowspace_core::Error::Validation(messages) => ApiError::Validation(messages.clone()),
    e if e.is_not_found() => ApiError::NotFound(e.to_string()),
    e => ApiError::BadRequest(e.to_string()),
  }
}

impl From<knowspace_core::Error> for ApiError {
  fn from(e: knowspace_core::Error) -> Self { domain_error(&e) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
  status_code: u16,
  message:     String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  errors:      Vec<String>,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let (message, errors) = match self {
      ApiError::Validation(errors) => ("One or more validation errors occurred".to_owned(), errors),
      ApiError::Unauthorized => ("Unauthorized".to_owned(), vec![]),
      ApiError::Forbidden(m) | ApiError::NotFound(m) | ApiError::BadRequest(m) => (m, vec![]),
      ApiError::Storage(_) | ApiError::Store(_) => ("Internal server error".to_owned(), vec![]),
    };

    let body = ErrorBody { status_code: status.as_u16(), message, errors };
    let mut res = (status, Json(body)).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"knowspace\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_map_to_client_statuses() {
    let not_found: ApiError = knowspace_core::Error::CommentNotFound(3).into();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

    let invalid: ApiError = knowspace_core::Error::Validation(vec!["Title is required".into()]).into();
    assert!(matches!(&invalid, ApiError::Validation(m) if m.len() == 1));

    let zero_rows: ApiError = knowspace_core::Error::NothingPersisted.into();
    assert_eq!(zero_rows.status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
