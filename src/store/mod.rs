//! SQLite-backed record of subscriptions and their episodes.
//!
//! `rusqlite::Connection` is not `Sync`, so a `Store` is meant to be owned by
//! the single task driving a command and lent out by reference.

mod model;

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::StoreError;

pub use model::{Episode, EpisodeFields, Podcast};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS podcasts (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    url     TEXT NOT NULL,
    name    TEXT NOT NULL DEFAULT '',
    author  TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS episodes (
    podcast_id   INTEGER NOT NULL REFERENCES podcasts(id),
    guid         TEXT NOT NULL,
    title        TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    published_at TEXT,
    source_url   TEXT,
    local_path   TEXT,
    PRIMARY KEY (podcast_id, guid)
);
";

const EPISODE_COLUMNS: &str =
    "podcast_id, guid, title, description, published_at, source_url, local_path";

/// Handle to the podcast database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            location: path.display().to_string(),
            source: e,
        })?;
        debug!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    /// Open a private database that lives only as long as the handle
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            location: ":memory:".to_string(),
            source: e,
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Subscribe to a feed. Only the url is known at this point; duplicates are allowed.
    pub fn add_podcast(&self, url: &str) -> Result<i64, StoreError> {
        self.conn
            .execute("INSERT INTO podcasts (url) VALUES (?1)", params![url])?;
        let id = self.conn.last_insert_rowid();
        debug!(id, url, "added podcast");
        Ok(id)
    }

    /// Remove a podcast together with all of its episodes
    pub fn delete_podcast(&self, id: i64) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let episodes = tx.execute("DELETE FROM episodes WHERE podcast_id = ?1", params![id])?;
        let podcasts = tx.execute("DELETE FROM podcasts WHERE id = ?1", params![id])?;
        if podcasts == 0 {
            return Err(StoreError::PodcastNotFound(id));
        }
        tx.commit()?;
        debug!(id, episodes, "deleted podcast");
        Ok(())
    }

    /// All podcasts ordered by id, or just the one matching `id`.
    ///
    /// An unknown id yields an empty list.
    pub fn list_podcasts(&self, id: Option<i64>) -> Result<Vec<Podcast>, StoreError> {
        let podcasts = match id {
            Some(id) => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, url, name, author FROM podcasts WHERE id = ?1")?;
                stmt.query_map(params![id], Podcast::from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, url, name, author FROM podcasts ORDER BY id")?;
                stmt.query_map([], Podcast::from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(podcasts)
    }

    /// Look up a single podcast, failing if it does not exist
    pub fn get_podcast(&self, id: i64) -> Result<Podcast, StoreError> {
        self.list_podcasts(Some(id))?
            .into_iter()
            .next()
            .ok_or(StoreError::PodcastNotFound(id))
    }

    pub fn update_podcast_meta(&self, id: i64, name: &str, author: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE podcasts SET name = ?2, author = ?3 WHERE id = ?1",
            params![id, name, author],
        )?;
        Ok(())
    }

    /// Insert the episode, or refresh its feed-derived columns if
    /// `(podcast_id, guid)` already exists. `local_path` is left alone.
    pub fn upsert_episode(
        &self,
        podcast_id: i64,
        guid: &str,
        fields: &EpisodeFields,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO episodes (podcast_id, guid, title, description, published_at, source_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (podcast_id, guid) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 published_at = excluded.published_at,
                 source_url = excluded.source_url",
            params![
                podcast_id,
                guid,
                fields.title,
                fields.description,
                fields.published_at,
                fields.source_url,
            ],
        )?;
        Ok(())
    }

    /// Episodes of a podcast in insertion order
    pub fn list_episodes(&self, podcast_id: i64) -> Result<Vec<Episode>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE podcast_id = ?1 ORDER BY rowid"
        ))?;
        let episodes = stmt
            .query_map(params![podcast_id], Episode::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(episodes)
    }

    /// GUIDs already stored for a podcast
    pub fn episode_guids(&self, podcast_id: i64) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT guid FROM episodes WHERE podcast_id = ?1")?;
        let guids = stmt
            .query_map(params![podcast_id], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(guids)
    }

    pub fn set_episode_local_path(
        &self,
        podcast_id: i64,
        guid: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE episodes SET local_path = ?3 WHERE podcast_id = ?1 AND guid = ?2",
            params![podcast_id, guid, path],
        )?;
        Ok(())
    }
}
