//! Dogs and the people who own them.
//!
//! The dog is the acting, visible entity; the person is the account behind
//! it. Whether a dog counts as active is a property of the pair: the dog and
//! its owner must both be undeactivated. Every feed read re-checks that
//! against current state instead of trusting stored feed rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Longest allowed dog name.
pub const MAX_NAME: usize = 40;

/// A human account. Owns one or more dogs and carries its own deactivation
/// flag, which implicitly deactivates every dog it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:   Uuid,
  pub created_at:  DateTime<Utc>,
  pub deactivated: bool,
}

/// The profile-level entity that performs and receives activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dog {
  pub dog_id:      Uuid,
  pub owner_id:    Uuid,
  pub name:        String,
  pub created_at:  DateTime<Utc>,
  pub deactivated: bool,
}

impl Dog {
  /// A dog is active only if both it and its owner are.
  pub fn active(&self, owner: &Person) -> bool {
    !self.deactivated && !owner.deactivated
  }
}

/// Validate a dog name before it reaches the store.
pub fn validate_name(name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::InvalidName("name must not be blank".into()));
  }
  if name.chars().count() > MAX_NAME {
    return Err(Error::InvalidName(format!(
      "name must be at most {MAX_NAME} characters"
    )));
  }
  Ok(())
}
