//! The per-event-kind activity logging policy.
//!
//! Each domain trigger maps to one function that records the activity and
//! names its fan-out subjects explicitly. Usually an activity goes to the
//! author's contacts only — a dog's forum post shows up in its contacts'
//! feeds, not its own. The household flag is passed solely for comments on
//! a wall or post owned by someone other than the author, so the owning
//! household sees the comment in their feeds. Callers never rely on the
//! engine inferring the flag from the item kind.

use uuid::Uuid;

use crate::{
  activity::{Activity, ItemRef, NewActivity},
  connection::Connection,
  feed::FanOut,
  store::FeedStore,
};

/// A comment was posted. `commented_dog` is the dog whose wall, blog post,
/// or event the comment landed on; `None` when the commented thing has no
/// owning dog.
pub async fn comment_created<S: FeedStore>(
  store: &S,
  comment_id: Uuid,
  commenter: Uuid,
  commented_dog: Option<Uuid>,
) -> Result<Activity, S::Error> {
  let mut fan_outs = vec![FanOut::contacts(commenter)];
  if let Some(commented) = commented_dog {
    if commented != commenter {
      fan_outs.push(FanOut::with_household(commented));
    }
  }
  store
    .log_activity(
      NewActivity::new(commenter, ItemRef::Comment(comment_id)),
      fan_outs,
    )
    .await
}

/// Two dogs became contacts. One activity, fanned out from both endpoints;
/// any overlap between the two audiences is de-duplicated by the engine.
pub async fn connection_accepted<S: FeedStore>(
  store: &S,
  connection: &Connection,
) -> Result<Activity, S::Error> {
  store
    .log_activity(
      NewActivity::new(
        connection.dog_id,
        ItemRef::Connection(connection.connection_id),
      ),
      vec![
        FanOut::contacts(connection.dog_id),
        FanOut::contacts(connection.contact_id),
      ],
    )
    .await
}

/// A group membership was accepted. Fired once per side: one activity for
/// the joining dog, one for the dog representing the group's owner.
pub async fn membership_accepted<S: FeedStore>(
  store: &S,
  membership_id: Uuid,
  member: Uuid,
  group_owner_dog: Uuid,
) -> Result<(Activity, Activity), S::Error> {
  let member_side = store
    .log_activity(
      NewActivity::new(member, ItemRef::Membership(membership_id)),
      vec![FanOut::contacts(member)],
    )
    .await?;
  let group_side = store
    .log_activity(
      NewActivity::new(group_owner_dog, ItemRef::Membership(membership_id)),
      vec![FanOut::contacts(group_owner_dog)],
    )
    .await?;
  Ok((member_side, group_side))
}

pub async fn blog_post_created<S: FeedStore>(
  store: &S,
  post_id: Uuid,
  author: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::BlogPost(post_id), author).await
}

pub async fn forum_post_created<S: FeedStore>(
  store: &S,
  post_id: Uuid,
  author: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::ForumPost(post_id), author).await
}

pub async fn topic_created<S: FeedStore>(
  store: &S,
  topic_id: Uuid,
  author: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::Topic(topic_id), author).await
}

pub async fn gallery_created<S: FeedStore>(
  store: &S,
  gallery_id: Uuid,
  owner_dog: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::Gallery(gallery_id), owner_dog).await
}

pub async fn photo_created<S: FeedStore>(
  store: &S,
  photo_id: Uuid,
  owner_dog: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::Photo(photo_id), owner_dog).await
}

/// A dog's profile description changed; the item is the dog itself.
pub async fn profile_description_changed<S: FeedStore>(
  store: &S,
  dog_id: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::ProfileEdit(dog_id), dog_id).await
}

pub async fn event_created<S: FeedStore>(
  store: &S,
  event_id: Uuid,
  host_dog: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::Event(event_id), host_dog).await
}

pub async fn event_attendance_created<S: FeedStore>(
  store: &S,
  attendance_id: Uuid,
  attendee_dog: Uuid,
) -> Result<Activity, S::Error> {
  contacts_only(store, ItemRef::EventAttendance(attendance_id), attendee_dog)
    .await
}

async fn contacts_only<S: FeedStore>(
  store: &S,
  item: ItemRef,
  dog_id: Uuid,
) -> Result<Activity, S::Error> {
  store
    .log_activity(NewActivity::new(dog_id, item), vec![FanOut::contacts(dog_id)])
    .await
}
