//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond
//! precision so lexicographic ORDER BY matches chronological order. UUIDs
//! are stored as hyphenated lowercase strings. Booleans use SQLite's
//! native INTEGER affinity.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;
use wag_core::{
  activity::{Activity, ItemKind, ItemRef},
  connection::{Connection, ConnectionStatus},
  dog::{Dog, Person},
  feed::FeedEntry,
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ConnectionStatus ────────────────────────────────────────────────────────

pub fn encode_status(s: ConnectionStatus) -> &'static str {
  match s {
    ConnectionStatus::Accepted => "accepted",
    ConnectionStatus::Requested => "requested",
    ConnectionStatus::Pending => "pending",
  }
}

pub fn decode_status(s: &str) -> Result<ConnectionStatus> {
  match s {
    "accepted" => Ok(ConnectionStatus::Accepted),
    "requested" => Ok(ConnectionStatus::Requested),
    "pending" => Ok(ConnectionStatus::Pending),
    other => {
      Err(Error::DateParse(format!("unknown connection status: {other:?}")))
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `people` row.
pub struct RawPerson {
  pub person_id:   String,
  pub created_at:  String,
  pub deactivated: bool,
}

impl RawPerson {
  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:   decode_uuid(&self.person_id)?,
      created_at:  decode_dt(&self.created_at)?,
      deactivated: self.deactivated,
    })
  }
}

/// Raw strings read directly from a `dogs` row.
pub struct RawDog {
  pub dog_id:      String,
  pub owner_id:    String,
  pub name:        String,
  pub created_at:  String,
  pub deactivated: bool,
}

impl RawDog {
  pub fn into_dog(self) -> Result<Dog> {
    Ok(Dog {
      dog_id:      decode_uuid(&self.dog_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      name:        self.name,
      created_at:  decode_dt(&self.created_at)?,
      deactivated: self.deactivated,
    })
  }
}

/// Raw strings read directly from a `connections` row.
pub struct RawConnection {
  pub connection_id: String,
  pub dog_id:        String,
  pub contact_id:    String,
  pub status:        String,
  pub created_at:    String,
  pub accepted_at:   Option<String>,
}

impl RawConnection {
  pub fn into_connection(self) -> Result<Connection> {
    Ok(Connection {
      connection_id: decode_uuid(&self.connection_id)?,
      dog_id:        decode_uuid(&self.dog_id)?,
      contact_id:    decode_uuid(&self.contact_id)?,
      status:        decode_status(&self.status)?,
      created_at:    decode_dt(&self.created_at)?,
      accepted_at:   self.accepted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id: String,
  pub dog_id:      String,
  pub item_kind:   String,
  pub item_id:     String,
  pub created_at:  String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    let kind = ItemKind::from_discriminant(&self.item_kind)?;
    Ok(Activity {
      activity_id: decode_uuid(&self.activity_id)?,
      dog_id:      decode_uuid(&self.dog_id)?,
      item:        ItemRef::from_parts(kind, decode_uuid(&self.item_id)?),
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `feeds` row.
pub struct RawFeedEntry {
  pub dog_id:      String,
  pub person_id:   String,
  pub activity_id: String,
}

impl RawFeedEntry {
  pub fn into_entry(self) -> Result<FeedEntry> {
    Ok(FeedEntry {
      dog_id:      decode_uuid(&self.dog_id)?,
      person_id:   decode_uuid(&self.person_id)?,
      activity_id: decode_uuid(&self.activity_id)?,
    })
  }
}
