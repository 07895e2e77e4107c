use chrono::NaiveDate;
use rusqlite::Row;

/// A subscribed feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podcast {
    pub id: i64,
    pub url: String,
    /// Channel title, empty until the first refresh
    pub name: String,
    /// Channel author, empty until the first refresh
    pub author: String,
}

impl Podcast {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            url: row.get("url")?,
            name: row.get("name")?,
            author: row.get("author")?,
        })
    }

    /// Display name, falling back to the url before the first refresh
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }

    /// One-line summary used by `list`: `NN. "name" by author (url...)`
    pub fn describe(&self) -> String {
        let url_prefix: String = self.url.chars().take(30).collect();
        format!(
            "{:02}. \"{}\" by {} ({}...)",
            self.id, self.name, self.author, url_prefix
        )
    }
}

/// One stored feed item, keyed by `(podcast_id, guid)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub podcast_id: i64,
    pub guid: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<NaiveDate>,
    pub source_url: Option<String>,
    /// Where the audio was downloaded to; `None` until downloaded
    pub local_path: Option<String>,
}

impl Episode {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            podcast_id: row.get("podcast_id")?,
            guid: row.get("guid")?,
            title: row.get("title")?,
            description: row.get("description")?,
            published_at: row.get("published_at")?,
            source_url: row.get("source_url")?,
            local_path: row.get("local_path")?,
        })
    }

    pub fn is_downloaded(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Feed-derived columns written by an upsert; `local_path` is never among them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeFields {
    pub title: String,
    pub description: String,
    pub published_at: Option<NaiveDate>,
    pub source_url: Option<String>,
}
