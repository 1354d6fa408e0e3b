//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tickle_core::{Error as CoreError, store::StoreError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad gateway: {0}")]
  BadGateway(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure: domain errors keep their meaning, anything
  /// else is a 500.
  pub fn store<E: StoreError>(err: E) -> Self {
    match err.as_core() {
      Some(core) => Self::classify(core),
      None => Self::Store(Box::new(err)),
    }
  }

  fn classify(err: &CoreError) -> Self {
    let message = err.to_string();
    match err {
      e if e.is_validation() => Self::BadRequest(message),
      CoreError::PersonNotFound(_)
      | CoreError::ProductNotFound(_)
      | CoreError::HoldingNotFound(_)
      | CoreError::PurchaseNotFound(_)
      | CoreError::NotFound(_)
      | CoreError::StudentNotFound => Self::NotFound(message),
      CoreError::Unpublished(_)
      | CoreError::PersonalLimitReached { .. }
      | CoreError::TotalLimitReached { .. }
      | CoreError::EmptyCart
      | CoreError::NotPurchased(_)
      | CoreError::AlreadyUtilized(_)
      | CoreError::NotTransferable(_)
      | CoreError::AlreadyInvalidated(_)
      | CoreError::EmailTaken(_) => Self::Conflict(message),
      CoreError::LookupUnauthorized | CoreError::Lookup(_) => Self::BadGateway(message),
      _ => Self::Store(message.into()),
    }
  }
}

impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self { Self::classify(&err) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
      ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_owned()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"tickle\""),
      );
    }
    res
  }
}
