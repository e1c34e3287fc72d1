//! Connections — the symmetric friendship edge between two dogs.
//!
//! A friendship is materialised as two directed rows, one per direction.
//! Requesting creates a `Pending` row on the requester's side and a
//! `Requested` row on the contact's side; accepting flips both rows to
//! `Accepted` with a shared timestamp inside one transaction. Only accepted
//! edges count as contacts for fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one directed connection row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
  /// Both sides have agreed; the edge counts for fan-out.
  Accepted,
  /// The other dog asked for this connection and is waiting on us.
  Requested,
  /// This dog asked and is waiting on the other side.
  Pending,
}

/// One direction of a (possibly pending) friendship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
  pub connection_id: Uuid,
  pub dog_id:        Uuid,
  pub contact_id:    Uuid,
  pub status:        ConnectionStatus,
  pub created_at:    DateTime<Utc>,
  /// Set on both rows when the request is accepted; identical on each side.
  pub accepted_at:   Option<DateTime<Utc>>,
}
