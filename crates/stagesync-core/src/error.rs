//! Error types for `stagesync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown stage: {0:?}")]
  UnknownStage(String),

  #[error("substage out of range: {0}")]
  InvalidSubstage(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
