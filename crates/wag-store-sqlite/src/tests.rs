//! Integration tests for `SqliteStore` against an in-memory database.

use uuid::Uuid;
use wag_core::{
  Error as CoreError,
  activity::{Activity, ItemRef, NewActivity},
  connection::ConnectionStatus,
  dog::Dog,
  feed::{self, FEED_SIZE, FanOut},
  logger,
  store::FeedStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A dog with its own freshly created owner.
async fn owned_dog(s: &SqliteStore, name: &str) -> Dog {
  let person = s.add_person().await.unwrap();
  s.add_dog(person.person_id, name.into()).await.unwrap()
}

/// Two dogs with different owners, already connected.
async fn connected_pair(s: &SqliteStore) -> (Dog, Dog) {
  let a = owned_dog(s, "Dana").await;
  let b = owned_dog(s, "Max").await;
  s.connect(a.dog_id, b.dog_id).await.unwrap();
  (a, b)
}

fn blog_post(dog: &Dog) -> NewActivity {
  NewActivity::new(dog.dog_id, ItemRef::BlogPost(Uuid::new_v4()))
}

fn assert_newest_first(activities: &[Activity]) {
  assert!(
    activities
      .windows(2)
      .all(|w| w[0].created_at >= w[1].created_at),
    "feed not sorted newest first"
  );
}

// ─── People and dogs ─────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_dog() {
  let s = store().await;
  let person = s.add_person().await.unwrap();

  let dog = s.add_dog(person.person_id, "Dana".into()).await.unwrap();
  assert_eq!(dog.owner_id, person.person_id);
  assert!(!dog.deactivated);

  let fetched = s.get_dog(dog.dog_id).await.unwrap().unwrap();
  assert_eq!(fetched.dog_id, dog.dog_id);
  assert_eq!(fetched.name, "Dana");
  assert_eq!(fetched.owner_id, person.person_id);
}

#[tokio::test]
async fn get_dog_missing_returns_none() {
  let s = store().await;
  assert!(s.get_dog(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_person(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn add_dog_unknown_owner_errors() {
  let s = store().await;
  let err = s.add_dog(Uuid::new_v4(), "Ghost".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::PersonNotFound(_))));
}

#[tokio::test]
async fn add_dog_rejects_blank_name() {
  let s = store().await;
  let person = s.add_person().await.unwrap();
  let err = s.add_dog(person.person_id, "   ".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidName(_))));
}

#[tokio::test]
async fn add_dog_rejects_overlong_name() {
  let s = store().await;
  let person = s.add_person().await.unwrap();
  let err = s
    .add_dog(person.person_id, "x".repeat(41))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidName(_))));
}

#[tokio::test]
async fn deactivation_flags_round_trip() {
  let s = store().await;
  let dog = owned_dog(&s, "Dana").await;

  s.set_dog_deactivated(dog.dog_id, true).await.unwrap();
  assert!(s.get_dog(dog.dog_id).await.unwrap().unwrap().deactivated);

  s.set_dog_deactivated(dog.dog_id, false).await.unwrap();
  assert!(!s.get_dog(dog.dog_id).await.unwrap().unwrap().deactivated);

  let err = s
    .set_dog_deactivated(Uuid::new_v4(), true)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DogNotFound(_))));
}

// ─── Connections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_creates_both_sides() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  s.request_connection(a.dog_id, b.dog_id).await.unwrap();

  let fwd = s
    .connection_between(a.dog_id, b.dog_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fwd.status, ConnectionStatus::Pending);
  assert!(fwd.accepted_at.is_none());

  let rev = s
    .connection_between(b.dog_id, a.dog_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(rev.status, ConnectionStatus::Requested);
}

#[tokio::test]
async fn request_self_rejected() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let err = s.request_connection(a.dog_id, a.dog_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::SelfConnection)));
}

#[tokio::test]
async fn request_twice_rejected() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  s.request_connection(a.dog_id, b.dog_id).await.unwrap();
  let err = s.request_connection(a.dog_id, b.dog_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ConnectionExists(_, _))));
}

#[tokio::test]
async fn accept_flips_both_sides() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  s.request_connection(a.dog_id, b.dog_id).await.unwrap();
  let conn = s.accept_connection(a.dog_id, b.dog_id).await.unwrap();
  assert_eq!(conn.status, ConnectionStatus::Accepted);
  assert!(conn.accepted_at.is_some());

  let rev = s
    .connection_between(b.dog_id, a.dog_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(rev.status, ConnectionStatus::Accepted);
  assert_eq!(rev.accepted_at, conn.accepted_at);
}

#[tokio::test]
async fn accept_without_request_errors() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  let err = s.accept_connection(a.dog_id, b.dog_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::ConnectionNotFound(_, _))
  ));
}

#[tokio::test]
async fn breakup_removes_both_rows() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  s.break_connection(a.dog_id, b.dog_id).await.unwrap();
  assert!(
    s.connection_between(a.dog_id, b.dog_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.connection_between(b.dog_id, a.dog_id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn breakup_removes_connection_activity() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;
  let conn = s
    .connection_between(a.dog_id, b.dog_id)
    .await
    .unwrap()
    .unwrap();

  let activity = logger::connection_accepted(&s, &conn).await.unwrap();
  assert!(
    s.find_activity_by_item(ItemRef::Connection(conn.connection_id))
      .await
      .unwrap()
      .is_some()
  );

  s.break_connection(a.dog_id, b.dog_id).await.unwrap();
  assert!(
    s.find_activity_by_item(ItemRef::Connection(conn.connection_id))
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.feed_entries_for(activity.activity_id)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn contacts_require_acceptance() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  s.request_connection(a.dog_id, b.dog_id).await.unwrap();
  assert!(s.contacts_of(a.dog_id).await.unwrap().is_empty());
  assert!(s.contacts_of(b.dog_id).await.unwrap().is_empty());

  s.accept_connection(a.dog_id, b.dog_id).await.unwrap();
  let contacts = s.contacts_of(a.dog_id).await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].dog_id, b.dog_id);
}

#[tokio::test]
async fn contacts_exclude_deactivated() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  s.set_dog_deactivated(b.dog_id, true).await.unwrap();
  assert!(s.contacts_of(a.dog_id).await.unwrap().is_empty());

  // Deactivating the owner hides the dog just the same.
  s.set_dog_deactivated(b.dog_id, false).await.unwrap();
  s.set_person_deactivated(b.owner_id, true).await.unwrap();
  assert!(s.contacts_of(a.dog_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn common_contacts_intersects_across_owners() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;
  let c = owned_dog(&s, "Rex").await;

  s.connect(a.dog_id, c.dog_id).await.unwrap();
  s.connect(b.dog_id, c.dog_id).await.unwrap();

  // c is a contact of both a and b, so it is common to a and b's owner.
  let common = s.common_contacts(a.dog_id, b.owner_id).await.unwrap();
  assert_eq!(common.len(), 1);
  assert_eq!(common[0].dog_id, c.dog_id);

  // a and c's owner share nobody: c's only contact besides a is b.
  let none = s.common_contacts(a.dog_id, c.owner_id).await.unwrap();
  assert!(none.is_empty());
}

// ─── Activity store ──────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_find_by_item() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;

  let input = blog_post(&a);
  let activity = s.record_activity(input).await.unwrap();
  assert_eq!(activity.dog_id, a.dog_id);
  assert_eq!(activity.item, input.item);

  let found = s.find_activity_by_item(input.item).await.unwrap().unwrap();
  assert_eq!(found.activity_id, activity.activity_id);
}

#[tokio::test]
async fn record_for_missing_dog_errors() {
  let s = store().await;
  let err = s
    .record_activity(NewActivity::new(
      Uuid::new_v4(),
      ItemRef::Comment(Uuid::new_v4()),
    ))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DogNotFound(_))));
}

#[tokio::test]
async fn find_activity_missing_returns_none() {
  let s = store().await;
  assert!(
    s.find_activity_by_item(ItemRef::Photo(Uuid::new_v4()))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn recent_activity_lists_only_the_dogs_own() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let b = owned_dog(&s, "Max").await;

  for _ in 0..3 {
    s.record_activity(blog_post(&a)).await.unwrap();
  }
  s.record_activity(blog_post(&b)).await.unwrap();

  let recent = s.recent_activity_of(a.dog_id, FEED_SIZE).await.unwrap();
  assert_eq!(recent.len(), 3);
  assert!(recent.iter().all(|act| act.dog_id == a.dog_id));
  assert_newest_first(&recent);
}

#[tokio::test]
async fn delete_item_cascades_exactly() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  let first = blog_post(&a);
  let second = blog_post(&a);
  let act1 = s
    .log_activity(first, vec![FanOut::contacts(a.dog_id)])
    .await
    .unwrap();
  let act2 = s
    .log_activity(second, vec![FanOut::contacts(a.dog_id)])
    .await
    .unwrap();

  s.delete_item(first.item).await.unwrap();

  // Exactly the first activity and its feed rows are gone.
  assert!(s.find_activity_by_item(first.item).await.unwrap().is_none());
  assert!(
    s.feed_entries_for(act1.activity_id)
      .await
      .unwrap()
      .is_empty()
  );

  let survivor = s.find_activity_by_item(second.item).await.unwrap().unwrap();
  assert_eq!(survivor.activity_id, act2.activity_id);
  let entries = s.feed_entries_for(act2.activity_id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].dog_id, b.dog_id);
}

#[tokio::test]
async fn delete_item_without_activity_is_noop() {
  let s = store().await;
  s.delete_item(ItemRef::Gallery(Uuid::new_v4())).await.unwrap();
}

#[tokio::test]
async fn delete_dog_cascades() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  let post = blog_post(&a);
  let activity = s
    .log_activity(post, vec![FanOut::contacts(a.dog_id)])
    .await
    .unwrap();

  s.delete_dog(a.dog_id).await.unwrap();

  assert!(s.get_dog(a.dog_id).await.unwrap().is_none());
  assert!(s.find_activity_by_item(post.item).await.unwrap().is_none());
  assert!(
    s.feed_entries_for(activity.activity_id)
      .await
      .unwrap()
      .is_empty()
  );
  assert!(
    s.connection_between(b.dog_id, a.dog_id)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fan_out_reaches_contacts_but_not_the_author() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  let activity = logger::blog_post_created(&s, Uuid::new_v4(), a.dog_id)
    .await
    .unwrap();

  // The audience is exactly a's contact, carrying the contact's owner.
  let entries = s.feed_entries_for(activity.activity_id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].dog_id, b.dog_id);
  assert_eq!(entries[0].person_id, b.owner_id);

  let feed = s.feed_for_dog(b.dog_id, FEED_SIZE).await.unwrap();
  assert!(feed.iter().any(|act| act.activity_id == activity.activity_id));
}

#[tokio::test]
async fn fan_out_is_idempotent() {
  let s = store().await;
  let (a, _b) = connected_pair(&s).await;

  let activity = s
    .log_activity(blog_post(&a), vec![FanOut::contacts(a.dog_id)])
    .await
    .unwrap();
  assert_eq!(s.feed_entries_for(activity.activity_id).await.unwrap().len(), 1);

  // Running the same fan-out again inserts nothing new.
  let inserted = s
    .fan_out(activity.activity_id, FanOut::contacts(a.dog_id))
    .await
    .unwrap();
  assert_eq!(inserted, 0);
  assert_eq!(s.feed_entries_for(activity.activity_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn plain_activity_skips_the_household() {
  let s = store().await;
  let person = s.add_person().await.unwrap();
  let dana = s.add_dog(person.person_id, "Dana".into()).await.unwrap();
  let sibling = s.add_dog(person.person_id, "Rover".into()).await.unwrap();

  // Even an explicit connection between housemates does not subscribe
  // them to each other's ordinary activity.
  s.connect(dana.dog_id, sibling.dog_id).await.unwrap();

  let activity = logger::profile_description_changed(&s, dana.dog_id)
    .await
    .unwrap();
  assert!(
    s.feed_entries_for(activity.activity_id)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn wall_comment_reaches_the_household() {
  let s = store().await;
  let commenter = owned_dog(&s, "Max").await;
  let wall_person = s.add_person().await.unwrap();
  let dana = s.add_dog(wall_person.person_id, "Dana".into()).await.unwrap();
  let sibling = s
    .add_dog(wall_person.person_id, "Rover".into())
    .await
    .unwrap();
  s.connect(commenter.dog_id, dana.dog_id).await.unwrap();

  // Max comments on Dana's wall: Dana's household must see it.
  let activity = logger::comment_created(
    &s,
    Uuid::new_v4(),
    commenter.dog_id,
    Some(dana.dog_id),
  )
  .await
  .unwrap();

  let entries = s.feed_entries_for(activity.activity_id).await.unwrap();
  let recipients: Vec<Uuid> = entries.iter().map(|e| e.dog_id).collect();
  assert!(recipients.contains(&dana.dog_id));
  assert!(recipients.contains(&sibling.dog_id));
  // Max gets it too, but as Dana's contact, not through the household.
  assert!(recipients.contains(&commenter.dog_id));
  assert_eq!(entries.len(), 3);

  let feed = s.feed_for_dog(sibling.dog_id, FEED_SIZE).await.unwrap();
  assert!(feed.iter().any(|act| act.activity_id == activity.activity_id));
}

#[tokio::test]
async fn fan_out_with_no_audience_is_a_noop() {
  let s = store().await;
  let loner = owned_dog(&s, "Dana").await;

  let activity = s
    .log_activity(blog_post(&loner), vec![FanOut::contacts(loner.dog_id)])
    .await
    .unwrap();
  assert!(
    s.feed_entries_for(activity.activity_id)
      .await
      .unwrap()
      .is_empty()
  );

  let inserted = s
    .fan_out(activity.activity_id, FanOut::contacts(loner.dog_id))
    .await
    .unwrap();
  assert_eq!(inserted, 0);
}

#[tokio::test]
async fn fan_out_skips_deactivated_contacts() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;

  s.set_dog_deactivated(b.dog_id, true).await.unwrap();
  let activity = s
    .log_activity(blog_post(&a), vec![FanOut::contacts(a.dog_id)])
    .await
    .unwrap();
  assert!(
    s.feed_entries_for(activity.activity_id)
      .await
      .unwrap()
      .is_empty()
  );

  // Fanning out again after reactivation picks the contact back up.
  s.set_dog_deactivated(b.dog_id, false).await.unwrap();
  let inserted = s
    .fan_out(activity.activity_id, FanOut::contacts(a.dog_id))
    .await
    .unwrap();
  assert_eq!(inserted, 1);
}

#[tokio::test]
async fn fan_out_unknown_ids_error() {
  let s = store().await;
  let a = owned_dog(&s, "Dana").await;
  let activity = s.record_activity(blog_post(&a)).await.unwrap();

  let err = s
    .fan_out(activity.activity_id, FanOut::contacts(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DogNotFound(_))));

  let err = s
    .fan_out(Uuid::new_v4(), FanOut::contacts(a.dog_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ActivityNotFound(_))));
}

#[tokio::test]
async fn log_activity_rolls_back_when_fan_out_fails() {
  let s = store().await;
  let (a, _b) = connected_pair(&s).await;

  // Break the feeds table out from under the batch insert.
  s.conn
    .call(|conn| {
      conn.execute_batch("DROP TABLE feeds")?;
      Ok(())
    })
    .await
    .unwrap();

  let input = blog_post(&a);
  let result = s
    .log_activity(input, vec![FanOut::contacts(a.dog_id)])
    .await;
  assert!(matches!(result, Err(Error::Database(_))));

  // The whole transaction rolled back: the activity is gone too.
  assert!(s.find_activity_by_item(input.item).await.unwrap().is_none());
}

// ─── Feed composition ────────────────────────────────────────────────────────

#[tokio::test]
async fn sparse_feeds_are_topped_up_from_the_global_feed() {
  let s = store().await;
  let (author, viewer) = connected_pair(&s).await;

  // Two personal entries for the viewer...
  let mut personal = Vec::new();
  for _ in 0..2 {
    personal.push(
      s.log_activity(blog_post(&author), vec![FanOut::contacts(author.dog_id)])
        .await
        .unwrap(),
    );
  }
  // ...and eight unrelated activities visible only via the global feed.
  let stranger = owned_dog(&s, "Rex").await;
  for _ in 0..8 {
    s.record_activity(blog_post(&stranger)).await.unwrap();
  }

  let feed = s.feed_for_dog(viewer.dog_id, FEED_SIZE).await.unwrap();
  assert_eq!(feed.len(), FEED_SIZE);
  assert_newest_first(&feed);

  let mut ids: Vec<Uuid> = feed.iter().map(|a| a.activity_id).collect();
  for act in &personal {
    assert!(ids.contains(&act.activity_id));
  }
  ids.sort();
  ids.dedup();
  assert_eq!(ids.len(), FEED_SIZE, "feed contains duplicate activities");
}

#[tokio::test]
async fn feeds_are_capped_at_the_requested_size() {
  let s = store().await;
  let (author, viewer) = connected_pair(&s).await;

  for _ in 0..12 {
    s.log_activity(blog_post(&author), vec![FanOut::contacts(author.dog_id)])
      .await
      .unwrap();
  }

  let feed = s.feed_for_dog(viewer.dog_id, FEED_SIZE).await.unwrap();
  assert_eq!(feed.len(), FEED_SIZE);
  assert_newest_first(&feed);
}

#[tokio::test]
async fn deactivated_actors_vanish_from_feeds_but_rows_survive() {
  let s = store().await;
  let (author, viewer) = connected_pair(&s).await;

  let activity = s
    .log_activity(blog_post(&author), vec![FanOut::contacts(author.dog_id)])
    .await
    .unwrap();

  s.set_dog_deactivated(author.dog_id, true).await.unwrap();

  // Filtered at read time from every surface...
  assert!(s.feed_for_dog(viewer.dog_id, FEED_SIZE).await.unwrap().is_empty());
  assert!(s.global_feed(FEED_SIZE).await.unwrap().is_empty());
  // ...while the stored feed row is untouched.
  assert_eq!(s.feed_entries_for(activity.activity_id).await.unwrap().len(), 1);

  // Reactivation brings the activity straight back.
  s.set_dog_deactivated(author.dog_id, false).await.unwrap();
  let feed = s.feed_for_dog(viewer.dog_id, FEED_SIZE).await.unwrap();
  assert!(feed.iter().any(|act| act.activity_id == activity.activity_id));
}

#[tokio::test]
async fn owner_deactivation_hides_their_dogs_activities() {
  let s = store().await;
  let (author, viewer) = connected_pair(&s).await;

  s.log_activity(blog_post(&author), vec![FanOut::contacts(author.dog_id)])
    .await
    .unwrap();
  s.set_person_deactivated(author.owner_id, true).await.unwrap();

  assert!(s.feed_for_dog(viewer.dog_id, FEED_SIZE).await.unwrap().is_empty());
  assert!(s.global_feed(FEED_SIZE).await.unwrap().is_empty());
}

#[tokio::test]
async fn person_feed_unions_their_dogs_without_duplicates() {
  let s = store().await;
  let person = s.add_person().await.unwrap();
  let first = s.add_dog(person.person_id, "Dana".into()).await.unwrap();
  let second = s.add_dog(person.person_id, "Rover".into()).await.unwrap();

  // One author reaches both of the person's dogs, another only one.
  let shared_author = owned_dog(&s, "Max").await;
  s.connect(shared_author.dog_id, first.dog_id).await.unwrap();
  s.connect(shared_author.dog_id, second.dog_id).await.unwrap();
  let solo_author = owned_dog(&s, "Rex").await;
  s.connect(solo_author.dog_id, second.dog_id).await.unwrap();

  let shared = s
    .log_activity(
      blog_post(&shared_author),
      vec![FanOut::contacts(shared_author.dog_id)],
    )
    .await
    .unwrap();
  let solo = s
    .log_activity(
      blog_post(&solo_author),
      vec![FanOut::contacts(solo_author.dog_id)],
    )
    .await
    .unwrap();

  // The shared activity sits in both dogs' feeds but shows once.
  assert_eq!(s.feed_entries_for(shared.activity_id).await.unwrap().len(), 2);
  let feed = s.feed_for_person(person.person_id, FEED_SIZE).await.unwrap();
  let ids: Vec<Uuid> = feed.iter().map(|a| a.activity_id).collect();
  assert!(ids.contains(&shared.activity_id));
  assert!(ids.contains(&solo.activity_id));
  assert_eq!(
    ids.iter().filter(|id| **id == shared.activity_id).count(),
    1
  );
}

#[tokio::test]
async fn global_feed_honors_limit_and_order() {
  let s = store().await;
  let author = owned_dog(&s, "Dana").await;

  let mut all = Vec::new();
  for _ in 0..5 {
    all.push(s.record_activity(blog_post(&author)).await.unwrap());
  }

  let global = s.global_feed(3).await.unwrap();
  assert_eq!(global.len(), 3);
  assert_newest_first(&global);

  let newest: Vec<Uuid> =
    all[2..].iter().rev().map(|a| a.activity_id).collect();
  let returned: Vec<Uuid> = global.iter().map(|a| a.activity_id).collect();
  assert_eq!(returned, newest);
}

#[tokio::test]
async fn empty_reads_return_empty() {
  let s = store().await;
  assert!(s.global_feed(FEED_SIZE).await.unwrap().is_empty());
  assert!(
    s.feed_for_dog(Uuid::new_v4(), FEED_SIZE)
      .await
      .unwrap()
      .is_empty()
  );
  assert!(
    s.feed_for_person(Uuid::new_v4(), FEED_SIZE)
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── compose (pure) ──────────────────────────────────────────────────────────

fn activity_at(secs: i64) -> Activity {
  Activity {
    activity_id: Uuid::new_v4(),
    dog_id:      Uuid::new_v4(),
    item:        ItemRef::BlogPost(Uuid::new_v4()),
    created_at:  chrono::DateTime::from_timestamp(secs, 0).unwrap(),
  }
}

#[test]
fn compose_keeps_a_full_personal_feed() {
  let personal: Vec<Activity> = (0..10).map(activity_at).collect();
  let global: Vec<Activity> = (20..30).map(activity_at).collect();

  let feed = feed::compose(personal.clone(), global, 10);
  assert_eq!(feed.len(), 10);
  let ids: Vec<Uuid> = personal.iter().map(|a| a.activity_id).collect();
  assert!(feed.iter().all(|a| ids.contains(&a.activity_id)));
}

#[test]
fn compose_fills_up_and_skips_duplicates() {
  let personal: Vec<Activity> = (0..2).map(activity_at).collect();
  // The global feed leads with the personal entries themselves.
  let mut global = personal.clone();
  global.extend((10..20).map(activity_at));

  let feed = feed::compose(personal, global, 10);
  assert_eq!(feed.len(), 10);

  let mut ids: Vec<Uuid> = feed.iter().map(|a| a.activity_id).collect();
  ids.sort();
  ids.dedup();
  assert_eq!(ids.len(), 10);
}

#[test]
fn compose_sorts_newest_first_and_tolerates_a_short_supplement() {
  let personal = vec![activity_at(5)];
  let global = vec![activity_at(9), activity_at(1)];

  let feed = feed::compose(personal, global, 10);
  assert_eq!(feed.len(), 3);
  assert!(
    feed
      .windows(2)
      .all(|w| w[0].created_at >= w[1].created_at)
  );
}

// ─── Activity logging policy ─────────────────────────────────────────────────

#[tokio::test]
async fn connection_acceptance_is_announced_to_both_audiences() {
  let s = store().await;
  let (a, b) = connected_pair(&s).await;
  let c = owned_dog(&s, "Rex").await;
  s.connect(c.dog_id, b.dog_id).await.unwrap();

  let conn = s
    .connection_between(a.dog_id, b.dog_id)
    .await
    .unwrap()
    .unwrap();
  let activity = logger::connection_accepted(&s, &conn).await.unwrap();

  // a's audience is {b}; b's is {a, c}. One entry each, de-duplicated.
  let entries = s.feed_entries_for(activity.activity_id).await.unwrap();
  let recipients: Vec<Uuid> = entries.iter().map(|e| e.dog_id).collect();
  assert_eq!(entries.len(), 3);
  assert!(recipients.contains(&a.dog_id));
  assert!(recipients.contains(&b.dog_id));
  assert!(recipients.contains(&c.dog_id));
}

#[tokio::test]
async fn membership_acceptance_fires_once_per_side() {
  let s = store().await;
  let member = owned_dog(&s, "Dana").await;
  let group_owner_dog = owned_dog(&s, "Max").await;
  let follower = owned_dog(&s, "Rex").await;
  s.connect(member.dog_id, follower.dog_id).await.unwrap();

  let membership_id = Uuid::new_v4();
  let (member_side, group_side) =
    logger::membership_accepted(&s, membership_id, member.dog_id, group_owner_dog.dog_id)
      .await
      .unwrap();

  assert_eq!(member_side.dog_id, member.dog_id);
  assert_eq!(group_side.dog_id, group_owner_dog.dog_id);
  assert_eq!(member_side.item, group_side.item);

  // The member's follower hears about it through the member's side.
  let entries = s.feed_entries_for(member_side.activity_id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].dog_id, follower.dog_id);

  // Deleting the membership takes both activities with it.
  s.delete_item(ItemRef::Membership(membership_id)).await.unwrap();
  assert!(
    s.find_activity_by_item(ItemRef::Membership(membership_id))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn own_comment_on_own_wall_stays_plain() {
  let s = store().await;
  let (dana, max) = connected_pair(&s).await;

  // Dana comments on her own wall: no household fan-out, contacts only.
  let activity = logger::comment_created(
    &s,
    Uuid::new_v4(),
    dana.dog_id,
    Some(dana.dog_id),
  )
  .await
  .unwrap();

  let entries = s.feed_entries_for(activity.activity_id).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].dog_id, max.dog_id);
}
