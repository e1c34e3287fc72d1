//! Activities — the immutable log of "this dog did this thing".
//!
//! An activity is written once and never updated. Rows leave the log only
//! through the cascade paths: deleting the referenced item, or deleting the
//! acting dog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Item kinds ──────────────────────────────────────────────────────────────

/// The kind of domain item an activity points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
  Comment,
  Connection,
  Membership,
  BlogPost,
  ForumPost,
  Topic,
  Gallery,
  Photo,
  ProfileEdit,
  Event,
  EventAttendance,
}

impl ItemKind {
  /// The discriminant string stored in the `item_kind` column.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Comment => "comment",
      Self::Connection => "connection",
      Self::Membership => "membership",
      Self::BlogPost => "blog_post",
      Self::ForumPost => "forum_post",
      Self::Topic => "topic",
      Self::Gallery => "gallery",
      Self::Photo => "photo",
      Self::ProfileEdit => "profile_edit",
      Self::Event => "event",
      Self::EventAttendance => "event_attendance",
    }
  }

  /// Parse the discriminant string read back from storage.
  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "comment" => Ok(Self::Comment),
      "connection" => Ok(Self::Connection),
      "membership" => Ok(Self::Membership),
      "blog_post" => Ok(Self::BlogPost),
      "forum_post" => Ok(Self::ForumPost),
      "topic" => Ok(Self::Topic),
      "gallery" => Ok(Self::Gallery),
      "photo" => Ok(Self::Photo),
      "profile_edit" => Ok(Self::ProfileEdit),
      "event" => Ok(Self::Event),
      "event_attendance" => Ok(Self::EventAttendance),
      other => Err(Error::UnknownItemKind(other.to_owned())),
    }
  }
}

// ─── Item references ─────────────────────────────────────────────────────────

/// A typed reference to the domain item an activity describes.
///
/// Each variant carries the id of an item of exactly that kind. The item
/// itself lives with an external collaborator; the feed core only needs its
/// identity, for lookup and for lifecycle parity (cascade deletes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
  Comment(Uuid),
  Connection(Uuid),
  Membership(Uuid),
  BlogPost(Uuid),
  ForumPost(Uuid),
  Topic(Uuid),
  Gallery(Uuid),
  Photo(Uuid),
  /// A dog's profile description changed; the id is the dog's own.
  ProfileEdit(Uuid),
  Event(Uuid),
  EventAttendance(Uuid),
}

impl ItemRef {
  pub fn kind(self) -> ItemKind {
    match self {
      Self::Comment(_) => ItemKind::Comment,
      Self::Connection(_) => ItemKind::Connection,
      Self::Membership(_) => ItemKind::Membership,
      Self::BlogPost(_) => ItemKind::BlogPost,
      Self::ForumPost(_) => ItemKind::ForumPost,
      Self::Topic(_) => ItemKind::Topic,
      Self::Gallery(_) => ItemKind::Gallery,
      Self::Photo(_) => ItemKind::Photo,
      Self::ProfileEdit(_) => ItemKind::ProfileEdit,
      Self::Event(_) => ItemKind::Event,
      Self::EventAttendance(_) => ItemKind::EventAttendance,
    }
  }

  pub fn item_id(self) -> Uuid {
    match self {
      Self::Comment(id)
      | Self::Connection(id)
      | Self::Membership(id)
      | Self::BlogPost(id)
      | Self::ForumPost(id)
      | Self::Topic(id)
      | Self::Gallery(id)
      | Self::Photo(id)
      | Self::ProfileEdit(id)
      | Self::Event(id)
      | Self::EventAttendance(id) => id,
    }
  }

  /// Rebuild a reference from the `(item_kind, item_id)` column pair.
  pub fn from_parts(kind: ItemKind, item_id: Uuid) -> Self {
    match kind {
      ItemKind::Comment => Self::Comment(item_id),
      ItemKind::Connection => Self::Connection(item_id),
      ItemKind::Membership => Self::Membership(item_id),
      ItemKind::BlogPost => Self::BlogPost(item_id),
      ItemKind::ForumPost => Self::ForumPost(item_id),
      ItemKind::Topic => Self::Topic(item_id),
      ItemKind::Gallery => Self::Gallery(item_id),
      ItemKind::Photo => Self::Photo(item_id),
      ItemKind::ProfileEdit => Self::ProfileEdit(item_id),
      ItemKind::Event => Self::Event(item_id),
      ItemKind::EventAttendance => Self::EventAttendance(item_id),
    }
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

/// An immutable record of one dog performing one typed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id: Uuid,
  /// The acting dog.
  pub dog_id:      Uuid,
  pub item:        ItemRef,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at:  DateTime<Utc>,
}

// ─── NewActivity ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::FeedStore::record_activity`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone, Copy)]
pub struct NewActivity {
  pub dog_id: Uuid,
  pub item:   ItemRef,
}

impl NewActivity {
  pub fn new(dog_id: Uuid, item: ItemRef) -> Self { Self { dog_id, item } }
}
