//! Error type for `tickle-store-sqlite`.

use thiserror::Error;
use tickle_core::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] tickle_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl StoreError for Error {
  fn as_core(&self) -> Option<&tickle_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

/// Report a UNIQUE or PRIMARY KEY violation as a validation error about
/// `what`; pass any other failure through.
pub(crate) fn unique_violation(err: rusqlite::Error, what: &str) -> Error {
  match &err {
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
    {
      tickle_core::Error::Invalid(format!("{what} already exists")).into()
    }
    _ => err.into(),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
