//! The `FeedStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `wag-store-sqlite`).
//! Higher layers — the activity logging policy in [`crate::logger`], and
//! whatever presentation or mailer code the embedding application brings —
//! depend on this abstraction, not on any concrete backend.
//!
//! Write invariants the implementations must uphold:
//!
//! - activities are immutable; feed rows are written only by fan-out;
//! - every multi-step write (activity plus fan-outs, both sides of a
//!   connection, a cascade delete) is one atomic transaction;
//! - a `(dog, activity)` feed pair is inserted at most once, even when
//!   fan-out runs twice for the same activity.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, ItemRef, NewActivity},
  connection::Connection,
  dog::{Dog, Person},
  feed::{FanOut, FeedEntry},
};

/// Abstraction over a wag feed store backend.
pub trait FeedStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── People and dogs ───────────────────────────────────────────────────

  /// Create and persist a new person.
  fn add_person(
    &self,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Create and persist a dog belonging to `owner_id`.
  ///
  /// The name must be non-blank and at most
  /// [`MAX_NAME`](crate::dog::MAX_NAME) characters.
  fn add_dog(
    &self,
    owner_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Dog, Self::Error>> + Send + '_;

  /// Retrieve a person by id. Returns `None` if not found.
  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Retrieve a dog by id. Returns `None` if not found.
  fn get_dog(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Dog>, Self::Error>> + Send + '_;

  /// Flip a person's deactivation flag. Deactivating a person implicitly
  /// deactivates all their dogs at every read path.
  fn set_person_deactivated(
    &self,
    id: Uuid,
    deactivated: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Flip a dog's deactivation flag.
  fn set_dog_deactivated(
    &self,
    id: Uuid,
    deactivated: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a dog and cascade: its activities, every feed entry referencing
  /// them, the dog's own feed rows, and its connections in both directions.
  fn delete_dog(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Connections ───────────────────────────────────────────────────────

  /// Make a pending connection request from `dog` to `contact`.
  ///
  /// Creates both directed rows (`Pending` on the requester's side,
  /// `Requested` on the contact's) in one transaction. Rejects
  /// self-connections and duplicate requests.
  fn request_connection(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Accept a connection request: both directed rows flip to `Accepted`
  /// with a shared timestamp, in one transaction. Returns the row from
  /// `dog`'s point of view.
  fn accept_connection(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> impl Future<Output = Result<Connection, Self::Error>> + Send + '_;

  /// Request and immediately accept, in one transaction.
  fn connect(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> impl Future<Output = Result<Connection, Self::Error>> + Send + '_;

  /// Delete a connection (or cancel a pending request): both directed rows
  /// and any activities logged against them, in one transaction.
  fn break_connection(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The directed connection row from `dog` to `contact`, if any.
  fn connection_between(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// A dog's accepted, currently-active contacts, newest first.
  fn contacts_of(
    &self,
    dog: Uuid,
  ) -> impl Future<Output = Result<Vec<Dog>, Self::Error>> + Send + '_;

  /// Contacts shared between `dog` and any of `person`'s dogs.
  fn common_contacts(
    &self,
    dog: Uuid,
    person: Uuid,
  ) -> impl Future<Output = Result<Vec<Dog>, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  /// Record a new activity without fanning it out. The timestamp is set by
  /// the store. Fails if the acting dog does not exist.
  fn record_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// Record a new activity and perform every requested fan-out, all inside
  /// a single transaction. A failure anywhere rolls the whole thing back —
  /// an activity must never exist partially fanned out.
  fn log_activity(
    &self,
    input: NewActivity,
    fan_outs: Vec<FanOut>,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// Push an existing activity into the feeds of `fan_out.dog_id`'s
  /// audience. Pairs that already have the activity are skipped, so calling
  /// this twice is harmless. Returns the number of feed rows inserted; an
  /// empty audience is a no-op, not an error.
  fn fan_out(
    &self,
    activity_id: Uuid,
    fan_out: FanOut,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// The most recent activity referencing `item`, if any.
  fn find_activity_by_item(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Activities performed *by* a dog, newest first.
  fn recent_activity_of(
    &self,
    dog: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// Cascade delete for a destroyed domain item: removes every activity
  /// referencing it and, transactionally, every feed entry referencing
  /// those activities. Deleting an item with no activity is a no-op.
  fn delete_item(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Feeds ─────────────────────────────────────────────────────────────

  /// A dog's feed: its own entries joined to activities, filtered to
  /// currently-active actors, supplemented from the global feed up to
  /// `minimum_size`, newest first.
  fn feed_for_dog(
    &self,
    dog: Uuid,
    minimum_size: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// A person's feed: the union of their dogs' feed entries, composed the
  /// same way as [`FeedStore::feed_for_dog`].
  fn feed_for_person(
    &self,
    person: Uuid,
    minimum_size: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// The most recent system-wide activities whose actor is currently
  /// active (dog and owner both undeactivated), newest first.
  fn global_feed(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// Every feed entry referencing an activity — who sees it.
  fn feed_entries_for(
    &self,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FeedEntry>, Self::Error>> + Send + '_;
}
