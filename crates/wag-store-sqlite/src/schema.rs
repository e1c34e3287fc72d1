//! SQL schema for the wag SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    person_id   TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    deactivated INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dogs (
    dog_id      TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES people(person_id),
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    deactivated INTEGER NOT NULL DEFAULT 0
);

-- A friendship is two rows, one per direction.
CREATE TABLE IF NOT EXISTS connections (
    connection_id TEXT PRIMARY KEY,
    dog_id        TEXT NOT NULL REFERENCES dogs(dog_id),
    contact_id    TEXT NOT NULL REFERENCES dogs(dog_id),
    status        TEXT NOT NULL,   -- 'accepted' | 'requested' | 'pending'
    created_at    TEXT NOT NULL,
    accepted_at   TEXT,
    UNIQUE (dog_id, contact_id),
    CHECK  (dog_id != contact_id)
);

-- Activities are immutable.
-- No UPDATE is ever issued against this table; rows leave it only through
-- the cascade delete paths.
CREATE TABLE IF NOT EXISTS activities (
    activity_id TEXT PRIMARY KEY,
    dog_id      TEXT NOT NULL REFERENCES dogs(dog_id),
    item_kind   TEXT NOT NULL,   -- discriminant of ItemKind
    item_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- Feed rows are written only by fan-out and follow their activity out via
-- ON DELETE CASCADE. The UNIQUE pair is the backstop that keeps fan-out
-- idempotent under concurrent invocation.
CREATE TABLE IF NOT EXISTS feeds (
    dog_id      TEXT NOT NULL REFERENCES dogs(dog_id),
    person_id   TEXT NOT NULL REFERENCES people(person_id),
    activity_id TEXT NOT NULL REFERENCES activities(activity_id)
                     ON DELETE CASCADE,
    UNIQUE (dog_id, activity_id)
);

CREATE INDEX IF NOT EXISTS dogs_owner_idx         ON dogs(owner_id);
CREATE INDEX IF NOT EXISTS connections_dog_idx    ON connections(dog_id, status);
CREATE INDEX IF NOT EXISTS activities_dog_idx     ON activities(dog_id);
CREATE INDEX IF NOT EXISTS activities_item_idx    ON activities(item_kind, item_id);
CREATE INDEX IF NOT EXISTS activities_created_idx ON activities(created_at);
CREATE INDEX IF NOT EXISTS feeds_dog_idx          ON feeds(dog_id);
CREATE INDEX IF NOT EXISTS feeds_person_idx       ON feeds(person_id);
CREATE INDEX IF NOT EXISTS feeds_activity_idx     ON feeds(activity_id);

PRAGMA user_version = 1;
";
