//! Error type for `wag-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Domain-rule rejection (missing dog/person, bad name, connection
  /// lifecycle violations). Raised before or inside a transaction; the
  /// transaction rolls back.
  #[error("core error: {0}")]
  Core(#[from] wag_core::Error),

  /// The underlying store could not complete the operation. Propagated as
  /// fatal for the request; retries belong to the caller.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
