//! Feed entries, fan-out requests, and feed composition.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::Activity;

/// Default feed length, and the cap on the global fallback feed.
pub const FEED_SIZE: usize = 10;

/// A materialised visibility row: `activity_id` shows up in `dog_id`'s feed.
///
/// `person_id` is the viewing dog's owner, denormalized so a person's feed
/// (the union over all their dogs) is a single indexed lookup. Entries are
/// written only by fan-out and removed only by the cascade delete paths;
/// the `(dog_id, activity_id)` pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
  pub dog_id:      Uuid,
  pub person_id:   Uuid,
  pub activity_id: Uuid,
}

/// One fan-out request attached to an activity: push the activity to the
/// accepted contacts of `dog_id`, minus contacts sharing `dog_id`'s owner.
///
/// `include_household` additionally pushes to every dog of `dog_id`'s owner,
/// `dog_id` itself included. Callers set it when the activity is a comment
/// on a wall or post owned by a different dog than the author, so the
/// owning household sees the comment too. The flag is an explicit per-kind
/// caller decision — see [`crate::logger`].
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
  pub dog_id:            Uuid,
  pub include_household: bool,
}

impl FanOut {
  /// Fan out to `dog_id`'s accepted contacts only.
  pub fn contacts(dog_id: Uuid) -> Self {
    Self { dog_id, include_household: false }
  }

  /// Fan out to `dog_id`'s accepted contacts and its owner's whole
  /// household.
  pub fn with_household(dog_id: Uuid) -> Self {
    Self { dog_id, include_household: true }
  }
}

/// Merge a personal feed with the global fallback.
///
/// The personal entries always survive. When there are fewer than
/// `minimum_size` of them, the most recent global activities are mixed in,
/// skipping any already present, until the result reaches `minimum_size` or
/// the supplement runs out. New and sparsely-connected dogs would otherwise
/// stare at a near-empty feed. The merged feed is sorted newest first.
pub fn compose(
  personal: Vec<Activity>,
  global: Vec<Activity>,
  minimum_size: usize,
) -> Vec<Activity> {
  let mut feed = personal;
  if feed.len() < minimum_size {
    let seen: HashSet<Uuid> = feed.iter().map(|a| a.activity_id).collect();
    for activity in global {
      if feed.len() >= minimum_size {
        break;
      }
      if !seen.contains(&activity.activity_id) {
        feed.push(activity);
      }
    }
  }
  feed.sort_by(|a, b| {
    b.created_at
      .cmp(&a.created_at)
      .then(b.activity_id.cmp(&a.activity_id))
  });
  feed
}
