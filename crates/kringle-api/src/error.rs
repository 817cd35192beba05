//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
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

  #[error("upstream failure: {0}")]
  Dependency(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<kringle_core::Error> for ApiError {
  fn from(err: kringle_core::Error) -> Self {
    use kringle_core::Error as E;
    match err {
      E::Validation(m) => Self::BadRequest(m),
      E::Ineligible(reason) => Self::Forbidden(reason.to_string()),
      E::SeasonNotFound(_) | E::NotAMember(_) | E::UserNotFound(_) => {
        Self::NotFound(err.to_string())
      }
      E::Dependency(m) => Self::Dependency(m),
      E::Store(e) => Self::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Dependency(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      // One router serves both schemes: bearer tokens for members, Basic
      // for config-file admins.
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer, Basic realm=\"kringle\""),
      );
    }
    res
  }
}
