//! [`SqliteStore`] — the SQLite implementation of [`FeedStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use wag_core::{
  Error as CoreError,
  activity::{Activity, ItemRef, NewActivity},
  connection::{Connection, ConnectionStatus},
  dog::{self, Dog, Person},
  feed::{self, FanOut, FeedEntry},
  store::FeedStore,
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawConnection, RawDog, RawFeedEntry, RawPerson, encode_dt,
    encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A wag feed store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Shared body of the dog- and person-feed reads: the personal entries,
  /// composed with the global fallback when they come up short.
  async fn composed_feed(
    &self,
    by_person: bool,
    id: Uuid,
    minimum_size: usize,
  ) -> Result<Vec<Activity>> {
    let id_str = encode_uuid(id);

    let (personal, global): (Vec<RawActivity>, Vec<RawActivity>) = self
      .conn
      .call(move |conn| {
        let personal = feed_rows(conn, by_person, &id_str, minimum_size)?;
        // Fetching `minimum_size + personal.len()` global rows is always
        // enough: at most `personal.len()` of them can be duplicates.
        let global = if personal.len() < minimum_size {
          global_rows(conn, minimum_size + personal.len())?
        } else {
          Vec::new()
        };
        Ok((personal, global))
      })
      .await?;

    let personal = personal
      .into_iter()
      .map(RawActivity::into_activity)
      .collect::<Result<Vec<_>>>()?;
    let global = global
      .into_iter()
      .map(RawActivity::into_activity)
      .collect::<Result<Vec<_>>>()?;

    Ok(feed::compose(personal, global, minimum_size))
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run inside `conn.call` closures, on the connection (or an open
// transaction — `Transaction` derefs to `Connection`).

fn map_person(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPerson> {
  Ok(RawPerson {
    person_id:   row.get(0)?,
    created_at:  row.get(1)?,
    deactivated: row.get(2)?,
  })
}

fn map_dog(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDog> {
  Ok(RawDog {
    dog_id:      row.get(0)?,
    owner_id:    row.get(1)?,
    name:        row.get(2)?,
    created_at:  row.get(3)?,
    deactivated: row.get(4)?,
  })
}

fn map_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConnection> {
  Ok(RawConnection {
    connection_id: row.get(0)?,
    dog_id:        row.get(1)?,
    contact_id:    row.get(2)?,
    status:        row.get(3)?,
    created_at:    row.get(4)?,
    accepted_at:   row.get(5)?,
  })
}

fn map_activity(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawActivity> {
  Ok(RawActivity {
    activity_id: row.get(0)?,
    dog_id:      row.get(1)?,
    item_kind:   row.get(2)?,
    item_id:     row.get(3)?,
    created_at:  row.get(4)?,
  })
}

fn person_exists(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM people WHERE person_id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn dog_row(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawDog>> {
  conn
    .query_row(
      "SELECT dog_id, owner_id, name, created_at, deactivated
       FROM dogs WHERE dog_id = ?1",
      rusqlite::params![id],
      map_dog,
    )
    .optional()
}

fn connection_row(
  conn: &rusqlite::Connection,
  dog: &str,
  contact: &str,
) -> rusqlite::Result<Option<RawConnection>> {
  conn
    .query_row(
      "SELECT connection_id, dog_id, contact_id, status, created_at, accepted_at
       FROM connections WHERE dog_id = ?1 AND contact_id = ?2",
      rusqlite::params![dog, contact],
      map_connection,
    )
    .optional()
}

fn insert_connection_row(
  conn: &rusqlite::Connection,
  raw: &RawConnection,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO connections
       (connection_id, dog_id, contact_id, status, created_at, accepted_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      raw.connection_id,
      raw.dog_id,
      raw.contact_id,
      raw.status,
      raw.created_at,
      raw.accepted_at,
    ],
  )?;
  Ok(())
}

fn insert_activity_row(
  conn: &rusqlite::Connection,
  raw: &RawActivity,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO activities (activity_id, dog_id, item_kind, item_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      raw.activity_id,
      raw.dog_id,
      raw.item_kind,
      raw.item_id,
      raw.created_at,
    ],
  )?;
  Ok(())
}

/// Compute the audience for one fan-out subject: the subject's accepted,
/// currently-active contacts, minus dogs sharing the subject's owner — an
/// owner's dogs are not auto-subscribed to each other's ordinary activity.
/// With `include_household`, the owner's whole household is added back,
/// the subject included. Rows are `(dog_id, owner_id)` pairs.
fn audience(
  conn: &rusqlite::Connection,
  subject: &RawDog,
  include_household: bool,
) -> rusqlite::Result<Vec<(String, String)>> {
  let mut stmt = conn.prepare(
    "SELECT d.dog_id, d.owner_id
     FROM connections c
     JOIN dogs d   ON d.dog_id = c.contact_id
     JOIN people p ON p.person_id = d.owner_id
     WHERE c.dog_id = ?1
       AND c.status = 'accepted'
       AND d.deactivated = 0
       AND p.deactivated = 0
       AND d.owner_id != ?2",
  )?;
  let mut recipients = stmt
    .query_map(rusqlite::params![subject.dog_id, subject.owner_id], |row| {
      Ok((row.get(0)?, row.get(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  if include_household {
    let mut stmt =
      conn.prepare("SELECT dog_id, owner_id FROM dogs WHERE owner_id = ?1")?;
    let household = stmt
      .query_map(rusqlite::params![subject.owner_id], |row| {
        Ok((row.get(0)?, row.get(1)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    recipients.extend(household);
  }

  Ok(recipients)
}

/// Batch-insert feed rows for one activity, ignoring `(dog, activity)`
/// pairs that already exist — a duplicate is the expected outcome of
/// overlapping fan-outs, not a fault. Returns the rows actually written.
fn insert_feed_rows(
  conn: &rusqlite::Connection,
  activity_id: &str,
  recipients: &[(String, String)],
) -> rusqlite::Result<usize> {
  let mut sql = String::from(
    "INSERT OR IGNORE INTO feeds (dog_id, person_id, activity_id) VALUES ",
  );
  let mut params: Vec<&dyn rusqlite::ToSql> =
    Vec::with_capacity(recipients.len() * 2 + 1);
  // ?1 is the shared activity id; each row binds two more.
  params.push(&activity_id);
  for (i, (dog_id, person_id)) in recipients.iter().enumerate() {
    if i > 0 {
      sql.push_str(", ");
    }
    sql.push_str(&format!("(?{}, ?{}, ?1)", 2 * i + 2, 2 * i + 3));
    params.push(dog_id);
    params.push(person_id);
  }
  conn.execute(&sql, params.as_slice())
}

/// One fan-out inside an open transaction. Returns the number of feed rows
/// inserted; an empty audience performs no write.
fn fan_out_tx(
  conn: &rusqlite::Connection,
  activity_id: &str,
  subject_id: &str,
  include_household: bool,
) -> Result<usize> {
  let Some(subject) = dog_row(conn, subject_id)? else {
    return Err(Error::Core(CoreError::DogNotFound(Uuid::parse_str(
      subject_id,
    )?)));
  };
  let recipients = audience(conn, &subject, include_household)?;
  if recipients.is_empty() {
    return Ok(0);
  }
  let inserted = insert_feed_rows(conn, activity_id, &recipients)?;
  tracing::debug!(
    activity = activity_id,
    subject = subject_id,
    candidates = recipients.len(),
    inserted,
    "fanned out activity"
  );
  Ok(inserted)
}

fn feed_rows(
  conn: &rusqlite::Connection,
  by_person: bool,
  id: &str,
  limit: usize,
) -> rusqlite::Result<Vec<RawActivity>> {
  // DISTINCT because a person's dogs may share an audience: the same
  // activity can sit in several of their feeds.
  let sql = format!(
    "SELECT DISTINCT a.activity_id, a.dog_id, a.item_kind, a.item_id, a.created_at
     FROM feeds f
     JOIN activities a ON a.activity_id = f.activity_id
     JOIN dogs d       ON d.dog_id = a.dog_id
     JOIN people p     ON p.person_id = d.owner_id
     WHERE f.{column} = ?1
       AND d.deactivated = 0
       AND p.deactivated = 0
     ORDER BY a.created_at DESC
     LIMIT ?2",
    column = if by_person { "person_id" } else { "dog_id" }
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![id, limit as i64], map_activity)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn global_rows(
  conn: &rusqlite::Connection,
  limit: usize,
) -> rusqlite::Result<Vec<RawActivity>> {
  // Activation is evaluated here, at query time, against current actor
  // state — deactivating a dog (or its owner) retroactively hides its
  // activities without touching stored rows.
  let mut stmt = conn.prepare(
    "SELECT a.activity_id, a.dog_id, a.item_kind, a.item_id, a.created_at
     FROM activities a
     JOIN dogs d   ON d.dog_id = a.dog_id
     JOIN people p ON p.person_id = d.owner_id
     WHERE d.deactivated = 0
       AND p.deactivated = 0
     ORDER BY a.created_at DESC
     LIMIT ?1",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![limit as i64], map_activity)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── FeedStore impl ──────────────────────────────────────────────────────────

impl FeedStore for SqliteStore {
  type Error = Error;

  // ── People and dogs ───────────────────────────────────────────────────────

  async fn add_person(&self) -> Result<Person> {
    let person = Person {
      person_id:   Uuid::new_v4(),
      created_at:  Utc::now(),
      deactivated: false,
    };

    let id_str = encode_uuid(person.person_id);
    let at_str = encode_dt(person.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO people (person_id, created_at, deactivated) VALUES (?1, ?2, 0)",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(person)
  }

  async fn add_dog(&self, owner_id: Uuid, name: String) -> Result<Dog> {
    dog::validate_name(&name)?;

    let new_dog = Dog {
      dog_id: Uuid::new_v4(),
      owner_id,
      name,
      created_at: Utc::now(),
      deactivated: false,
    };

    let raw = RawDog {
      dog_id:      encode_uuid(new_dog.dog_id),
      owner_id:    encode_uuid(new_dog.owner_id),
      name:        new_dog.name.clone(),
      created_at:  encode_dt(new_dog.created_at),
      deactivated: false,
    };

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let tx = conn.transaction()?;
          if !person_exists(&tx, &raw.owner_id)? {
            return Err(Error::Core(CoreError::PersonNotFound(owner_id)));
          }
          tx.execute(
            "INSERT INTO dogs (dog_id, owner_id, name, created_at, deactivated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              raw.dog_id,
              raw.owner_id,
              raw.name,
              raw.created_at,
              raw.deactivated,
            ],
          )?;
          tx.commit()?;
          Ok(())
        })())
      })
      .await??;

    Ok(new_dog)
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT person_id, created_at, deactivated
               FROM people WHERE person_id = ?1",
              rusqlite::params![id_str],
              map_person,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn get_dog(&self, id: Uuid) -> Result<Option<Dog>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDog> = self
      .conn
      .call(move |conn| Ok(dog_row(conn, &id_str)?))
      .await?;

    raw.map(RawDog::into_dog).transpose()
  }

  async fn set_person_deactivated(
    &self,
    id: Uuid,
    deactivated: bool,
  ) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let changed = conn.execute(
            "UPDATE people SET deactivated = ?2 WHERE person_id = ?1",
            rusqlite::params![id_str, deactivated],
          )?;
          if changed == 0 {
            return Err(Error::Core(CoreError::PersonNotFound(id)));
          }
          Ok(())
        })())
      })
      .await??;

    Ok(())
  }

  async fn set_dog_deactivated(&self, id: Uuid, deactivated: bool) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let changed = conn.execute(
            "UPDATE dogs SET deactivated = ?2 WHERE dog_id = ?1",
            rusqlite::params![id_str, deactivated],
          )?;
          if changed == 0 {
            return Err(Error::Core(CoreError::DogNotFound(id)));
          }
          Ok(())
        })())
      })
      .await??;

    Ok(())
  }

  async fn delete_dog(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let tx = conn.transaction()?;
          // Activities logged against the dog's connections, then the
          // connection rows themselves, then the dog's own activities
          // (feed rows cascade with each delete) and remaining feed rows.
          tx.execute(
            "DELETE FROM activities WHERE item_kind = 'connection' AND item_id IN
               (SELECT connection_id FROM connections
                WHERE dog_id = ?1 OR contact_id = ?1)",
            rusqlite::params![id_str],
          )?;
          tx.execute(
            "DELETE FROM connections WHERE dog_id = ?1 OR contact_id = ?1",
            rusqlite::params![id_str],
          )?;
          tx.execute(
            "DELETE FROM activities WHERE dog_id = ?1",
            rusqlite::params![id_str],
          )?;
          tx.execute(
            "DELETE FROM feeds WHERE dog_id = ?1",
            rusqlite::params![id_str],
          )?;
          let changed = tx.execute(
            "DELETE FROM dogs WHERE dog_id = ?1",
            rusqlite::params![id_str],
          )?;
          if changed == 0 {
            return Err(Error::Core(CoreError::DogNotFound(id)));
          }
          tx.commit()?;
          Ok(())
        })())
      })
      .await??;

    Ok(())
  }

  // ── Connections ───────────────────────────────────────────────────────────

  async fn request_connection(&self, dog: Uuid, contact: Uuid) -> Result<()> {
    if dog == contact {
      return Err(Error::Core(CoreError::SelfConnection));
    }

    let now_str = encode_dt(Utc::now());
    let rows = [
      RawConnection {
        connection_id: encode_uuid(Uuid::new_v4()),
        dog_id:        encode_uuid(dog),
        contact_id:    encode_uuid(contact),
        status:        encode_status(ConnectionStatus::Pending).to_owned(),
        created_at:    now_str.clone(),
        accepted_at:   None,
      },
      RawConnection {
        connection_id: encode_uuid(Uuid::new_v4()),
        dog_id:        encode_uuid(contact),
        contact_id:    encode_uuid(dog),
        status:        encode_status(ConnectionStatus::Requested).to_owned(),
        created_at:    now_str,
        accepted_at:   None,
      },
    ];

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let tx = conn.transaction()?;
          if dog_row(&tx, &rows[0].dog_id)?.is_none() {
            return Err(Error::Core(CoreError::DogNotFound(dog)));
          }
          if dog_row(&tx, &rows[0].contact_id)?.is_none() {
            return Err(Error::Core(CoreError::DogNotFound(contact)));
          }
          if connection_row(&tx, &rows[0].dog_id, &rows[0].contact_id)?.is_some()
          {
            return Err(Error::Core(CoreError::ConnectionExists(dog, contact)));
          }
          for raw in &rows {
            insert_connection_row(&tx, raw)?;
          }
          tx.commit()?;
          Ok(())
        })())
      })
      .await??;

    Ok(())
  }

  async fn accept_connection(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> Result<Connection> {
    let dog_str = encode_uuid(dog);
    let contact_str = encode_uuid(contact);
    let accepted_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<RawConnection> {
          let tx = conn.transaction()?;
          if connection_row(&tx, &dog_str, &contact_str)?.is_none()
            || connection_row(&tx, &contact_str, &dog_str)?.is_none()
          {
            return Err(Error::Core(CoreError::ConnectionNotFound(
              dog, contact,
            )));
          }
          // Both sides share one accepted_at.
          for (a, b) in [(&dog_str, &contact_str), (&contact_str, &dog_str)] {
            tx.execute(
              "UPDATE connections SET status = 'accepted', accepted_at = ?3
               WHERE dog_id = ?1 AND contact_id = ?2",
              rusqlite::params![a, b, accepted_str],
            )?;
          }
          let Some(row) = connection_row(&tx, &dog_str, &contact_str)? else {
            return Err(Error::Core(CoreError::ConnectionNotFound(
              dog, contact,
            )));
          };
          tx.commit()?;
          Ok(row)
        })())
      })
      .await??;

    Ok(raw.into_connection()?)
  }

  async fn connect(&self, dog: Uuid, contact: Uuid) -> Result<Connection> {
    if dog == contact {
      return Err(Error::Core(CoreError::SelfConnection));
    }

    let now_str = encode_dt(Utc::now());
    let rows = [
      RawConnection {
        connection_id: encode_uuid(Uuid::new_v4()),
        dog_id:        encode_uuid(dog),
        contact_id:    encode_uuid(contact),
        status:        encode_status(ConnectionStatus::Accepted).to_owned(),
        created_at:    now_str.clone(),
        accepted_at:   Some(now_str.clone()),
      },
      RawConnection {
        connection_id: encode_uuid(Uuid::new_v4()),
        dog_id:        encode_uuid(contact),
        contact_id:    encode_uuid(dog),
        status:        encode_status(ConnectionStatus::Accepted).to_owned(),
        created_at:    now_str.clone(),
        accepted_at:   Some(now_str),
      },
    ];

    let raw = self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<RawConnection> {
          let tx = conn.transaction()?;
          if dog_row(&tx, &rows[0].dog_id)?.is_none() {
            return Err(Error::Core(CoreError::DogNotFound(dog)));
          }
          if dog_row(&tx, &rows[0].contact_id)?.is_none() {
            return Err(Error::Core(CoreError::DogNotFound(contact)));
          }
          if connection_row(&tx, &rows[0].dog_id, &rows[0].contact_id)?.is_some()
          {
            return Err(Error::Core(CoreError::ConnectionExists(dog, contact)));
          }
          for raw in &rows {
            insert_connection_row(&tx, raw)?;
          }
          tx.commit()?;
          let [fwd, _] = rows;
          Ok(fwd)
        })())
      })
      .await??;

    Ok(raw.into_connection()?)
  }

  async fn break_connection(&self, dog: Uuid, contact: Uuid) -> Result<()> {
    let dog_str = encode_uuid(dog);
    let contact_str = encode_uuid(contact);

    self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<()> {
          let tx = conn.transaction()?;
          let fwd = connection_row(&tx, &dog_str, &contact_str)?;
          let rev = connection_row(&tx, &contact_str, &dog_str)?;
          if fwd.is_none() && rev.is_none() {
            return Err(Error::Core(CoreError::ConnectionNotFound(
              dog, contact,
            )));
          }
          // Activities logged against either row go too; their feed rows
          // cascade with them.
          for row in [&fwd, &rev].into_iter().flatten() {
            tx.execute(
              "DELETE FROM activities
               WHERE item_kind = 'connection' AND item_id = ?1",
              rusqlite::params![row.connection_id],
            )?;
          }
          tx.execute(
            "DELETE FROM connections
             WHERE (dog_id = ?1 AND contact_id = ?2)
                OR (dog_id = ?2 AND contact_id = ?1)",
            rusqlite::params![dog_str, contact_str],
          )?;
          tx.commit()?;
          Ok(())
        })())
      })
      .await??;

    Ok(())
  }

  async fn connection_between(
    &self,
    dog: Uuid,
    contact: Uuid,
  ) -> Result<Option<Connection>> {
    let dog_str = encode_uuid(dog);
    let contact_str = encode_uuid(contact);

    let raw: Option<RawConnection> = self
      .conn
      .call(move |conn| Ok(connection_row(conn, &dog_str, &contact_str)?))
      .await?;

    raw.map(RawConnection::into_connection).transpose()
  }

  async fn contacts_of(&self, dog: Uuid) -> Result<Vec<Dog>> {
    let dog_str = encode_uuid(dog);

    let raws: Vec<RawDog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT d.dog_id, d.owner_id, d.name, d.created_at, d.deactivated
           FROM connections c
           JOIN dogs d   ON d.dog_id = c.contact_id
           JOIN people p ON p.person_id = d.owner_id
           WHERE c.dog_id = ?1
             AND c.status = 'accepted'
             AND d.deactivated = 0
             AND p.deactivated = 0
           ORDER BY d.created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![dog_str], map_dog)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDog::into_dog).collect()
  }

  async fn common_contacts(&self, dog: Uuid, person: Uuid) -> Result<Vec<Dog>> {
    let dog_str = encode_uuid(dog);
    let person_str = encode_uuid(person);

    let raws: Vec<RawDog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT dog_id, owner_id, name, created_at, deactivated
           FROM dogs
           WHERE dog_id IN (
             SELECT c.contact_id
             FROM connections c
             JOIN dogs cd   ON cd.dog_id = c.contact_id
             JOIN people cp ON cp.person_id = cd.owner_id
             WHERE c.dog_id = ?1
               AND c.status = 'accepted'
               AND cd.deactivated = 0
               AND cp.deactivated = 0
             INTERSECT
             SELECT c.contact_id
             FROM connections c
             JOIN dogs od ON od.dog_id = c.dog_id
             WHERE od.owner_id = ?2
               AND c.status = 'accepted'
           )
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![dog_str, person_str], map_dog)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDog::into_dog).collect()
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn record_activity(&self, input: NewActivity) -> Result<Activity> {
    self.log_activity(input, Vec::new()).await
  }

  async fn log_activity(
    &self,
    input: NewActivity,
    fan_outs: Vec<FanOut>,
  ) -> Result<Activity> {
    let raw = RawActivity {
      activity_id: encode_uuid(Uuid::new_v4()),
      dog_id:      encode_uuid(input.dog_id),
      item_kind:   input.item.kind().discriminant().to_owned(),
      item_id:     encode_uuid(input.item.item_id()),
      created_at:  encode_dt(Utc::now()),
    };
    let actor = input.dog_id;
    let subjects: Vec<(String, bool)> = fan_outs
      .iter()
      .map(|f| (encode_uuid(f.dog_id), f.include_household))
      .collect();

    let raw = self
      .conn
      .call(move |conn| {
        Ok((move || -> Result<RawActivity> {
          let tx = conn.transaction()?;
          if dog_row(&tx, &raw.dog_id)?.is_none() {
            return Err(Error::Core(CoreError::DogNotFound(actor)));
          }
          insert_activity_row(&tx, &raw)?;
          for (subject_id, include_household) in &subjects {
            fan_out_tx(&tx, &raw.activity_id, subject_id, *include_household)?;
          }
          tx.commit()?;
          Ok(raw)
        })())
      })
      .await??;

    let activity = raw.into_activity()?;
    tracing::debug!(activity = %activity.activity_id, actor = %actor, "logged activity");
    Ok(activity)
  }

  async fn fan_out(&self, activity_id: Uuid, fan_out: FanOut) -> Result<usize> {
    let activity_str = encode_uuid(activity_id);
    let subject_str = encode_uuid(fan_out.dog_id);
    let include_household = fan_out.include_household;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok((|| -> Result<usize> {
          let tx = conn.transaction()?;
          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM activities WHERE activity_id = ?1",
              rusqlite::params![activity_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !exists {
            return Err(Error::Core(CoreError::ActivityNotFound(activity_id)));
          }
          let inserted =
            fan_out_tx(&tx, &activity_str, &subject_str, include_household)?;
          tx.commit()?;
          Ok(inserted)
        })())
      })
      .await??;

    Ok(inserted)
  }

  async fn find_activity_by_item(
    &self,
    item: ItemRef,
  ) -> Result<Option<Activity>> {
    let kind = item.kind().discriminant();
    let item_str = encode_uuid(item.item_id());

    let raw: Option<RawActivity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT activity_id, dog_id, item_kind, item_id, created_at
               FROM activities
               WHERE item_kind = ?1 AND item_id = ?2
               ORDER BY created_at DESC
               LIMIT 1",
              rusqlite::params![kind, item_str],
              map_activity,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawActivity::into_activity).transpose()
  }

  async fn recent_activity_of(
    &self,
    dog: Uuid,
    limit: usize,
  ) -> Result<Vec<Activity>> {
    let dog_str = encode_uuid(dog);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT activity_id, dog_id, item_kind, item_id, created_at
           FROM activities
           WHERE dog_id = ?1
           ORDER BY created_at DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![dog_str, limit as i64], map_activity)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn delete_item(&self, item: ItemRef) -> Result<()> {
    let kind = item.kind().discriminant();
    let item_str = encode_uuid(item.item_id());

    self
      .conn
      .call(move |conn| {
        // Feed rows follow via ON DELETE CASCADE.
        conn.execute(
          "DELETE FROM activities WHERE item_kind = ?1 AND item_id = ?2",
          rusqlite::params![kind, item_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  // ── Feeds ─────────────────────────────────────────────────────────────────

  async fn feed_for_dog(
    &self,
    dog: Uuid,
    minimum_size: usize,
  ) -> Result<Vec<Activity>> {
    self.composed_feed(false, dog, minimum_size).await
  }

  async fn feed_for_person(
    &self,
    person: Uuid,
    minimum_size: usize,
  ) -> Result<Vec<Activity>> {
    self.composed_feed(true, person, minimum_size).await
  }

  async fn global_feed(&self, limit: usize) -> Result<Vec<Activity>> {
    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| Ok(global_rows(conn, limit)?))
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn feed_entries_for(&self, activity_id: Uuid) -> Result<Vec<FeedEntry>> {
    let activity_str = encode_uuid(activity_id);

    let raws: Vec<RawFeedEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT dog_id, person_id, activity_id
           FROM feeds WHERE activity_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![activity_str], |row| {
            Ok(RawFeedEntry {
              dog_id:      row.get(0)?,
              person_id:   row.get(1)?,
              activity_id: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedEntry::into_entry).collect()
  }
}
