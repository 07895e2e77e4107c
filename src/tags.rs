//! Rewrites the embedded tags of downloaded audio files from stored metadata.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use tracing::debug;

use crate::error::TagError;
use crate::store::{Episode, Podcast};

/// Genre written to every episode
pub const PODCAST_GENRE: &str = "Podcast";

/// Tag values for one downloaded episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub title: String,
    /// Not written when the episode has no publish date
    pub date: Option<NaiveDate>,
}

impl TrackTags {
    pub fn for_episode(podcast: &Podcast, episode: &Episode) -> Self {
        Self {
            album: podcast.name.clone(),
            artist: podcast.author.clone(),
            genre: PODCAST_GENRE.to_string(),
            title: episode.title.clone(),
            date: episode.published_at,
        }
    }
}

/// Format a date without zero padding, e.g. `2024-1-5`
pub fn format_tag_date(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Date text as stored in a tag of `tag_type`.
///
/// ID3v2 keeps dates in timestamp frames, which only read back with two-digit
/// month and day segments. Every other format gets the plain `YYYY-M-D` form.
pub fn tag_date_text(date: NaiveDate, tag_type: TagType) -> String {
    match tag_type {
        TagType::Id3v2 => date.format("%Y-%m-%d").to_string(),
        _ => format_tag_date(date),
    }
}

/// Overwrite the tags of the audio file at `path`.
///
/// The file's primary tag format is used (ID3v2 for MP3), and created if the
/// file has none yet.
pub fn write_tags(path: &Path, tags: &TrackTags) -> Result<(), TagError> {
    let probe = Probe::open(path)
        .map_err(|e| TagError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?
        .guess_file_type()
        .map_err(|e| TagError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

    let mut tagged_file = probe.read().map_err(|e| TagError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.primary_tag().is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let tag = tagged_file
        .primary_tag_mut()
        .ok_or_else(|| TagError::NoTag {
            path: path.to_path_buf(),
        })?;

    tag.set_album(tags.album.clone());
    tag.set_artist(tags.artist.clone());
    tag.set_genre(tags.genre.clone());
    tag.set_title(tags.title.clone());
    if let Some(date) = tags.date {
        tag.insert_text(ItemKey::RecordingDate, tag_date_text(date, tag_type));
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| TagError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!(path = %path.display(), title = %tags.title, "wrote tags");
    Ok(())
}

/// Tag an episode's file, at `path_override` if given, else at its stored location
pub fn tag_episode(
    podcast: &Podcast,
    episode: &Episode,
    path_override: Option<&Path>,
) -> Result<bool, TagError> {
    let path = match (path_override, episode.local_path.as_deref()) {
        (Some(path), _) => path,
        (None, Some(local)) => Path::new(local),
        (None, None) => return Ok(false),
    };

    write_tags(path, &TrackTags::for_episode(podcast, episode))?;
    Ok(true)
}
