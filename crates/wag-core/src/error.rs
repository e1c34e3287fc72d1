//! Error types for `wag-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("dog not found: {0}")]
  DogNotFound(Uuid),

  #[error("activity not found: {0}")]
  ActivityNotFound(Uuid),

  #[error("invalid dog name: {0}")]
  InvalidName(String),

  #[error("a dog cannot connect to itself")]
  SelfConnection,

  #[error("connection between {0} and {1} already exists")]
  ConnectionExists(Uuid, Uuid),

  #[error("no connection between {0} and {1}")]
  ConnectionNotFound(Uuid, Uuid),

  #[error("unknown item kind discriminant: {0:?}")]
  UnknownItemKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
