//! Error type for `stagesync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] stagesync_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A person id does not fit the signed 64-bit column type, or a stored
  /// id is negative.
  #[error("person id out of range: {0}")]
  PersonIdRange(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
