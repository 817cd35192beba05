//! Error type for `kringle-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown audit action: {0:?}")]
  UnknownAction(String),

  /// A draw tried to match a member that is gone or already matched.
  /// The transaction was rolled back; no assignment was persisted.
  #[error("member {0} could not be assigned a giftee")]
  AssignmentConflict(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
