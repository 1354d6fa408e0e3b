//! Error type for `tickle-kobra`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Kobra rejected the API key")]
  Unauthorized,

  #[error("no matching student in Kobra")]
  StudentNotFound,

  #[error("Kobra answered {0}")]
  Status(StatusCode),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

impl From<Error> for tickle_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Unauthorized => Self::LookupUnauthorized,
      Error::StudentNotFound => Self::StudentNotFound,
      other => Self::Lookup(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
