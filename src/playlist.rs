//! M3U playlists of downloaded episodes, newest first.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use tracing::debug;

use crate::error::{PathSubstError, PlaylistError};
use crate::store::{Episode, Podcast, Store};

const EXTM3U_HEADER: &str = "#EXTM3U";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaylistFormat {
    /// `#EXTM3U` header and an `#EXTINF` title line per track
    #[default]
    Extended,
    /// One path per line
    Plain,
}

/// A regex substitution applied to every path written to a playlist,
/// e.g. to map a download directory onto a media player's mount point
#[derive(Debug, Clone)]
pub struct PathSubst {
    pattern: Regex,
    replacement: String,
}

impl PathSubst {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, PathSubstError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    /// Replace every match of the pattern in `path`
    pub fn apply(&self, path: &str) -> String {
        self.pattern
            .replace_all(path, self.replacement.as_str())
            .into_owned()
    }
}

impl FromStr for PathSubst {
    type Err = PathSubstError;

    /// Parse `pattern^replacement`, splitting at the first `^`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pattern, replacement) = s
            .split_once('^')
            .ok_or_else(|| PathSubstError::MissingSeparator(s.to_string()))?;
        Self::new(pattern, replacement)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistOptions {
    pub format: PlaylistFormat,
    pub path_subst: Option<PathSubst>,
    /// Keep only this many of the most recent entries
    pub limit: Option<usize>,
}

/// One playlist line pair: display title and (possibly rewritten) path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub title: String,
    pub path: String,
}

/// Newest first; episodes without a publish date go last, in stored order
fn by_published_desc(a: &Episode, b: &Episode) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Select, order and rewrite the downloaded episodes of a podcast
pub fn playlist_entries(
    mut episodes: Vec<Episode>,
    options: &PlaylistOptions,
) -> Vec<PlaylistEntry> {
    episodes.sort_by(by_published_desc);

    episodes
        .into_iter()
        .filter_map(|episode| {
            let path = episode.local_path?;
            let path = match &options.path_subst {
                Some(subst) => subst.apply(&path),
                None => path,
            };
            Some(PlaylistEntry {
                title: episode.title,
                path,
            })
        })
        .take(options.limit.unwrap_or(usize::MAX))
        .collect()
}

pub fn render_playlist(entries: &[PlaylistEntry], format: PlaylistFormat) -> String {
    let mut out = String::new();

    match format {
        PlaylistFormat::Extended => {
            out.push_str(EXTM3U_HEADER);
            out.push_str("\n\n");
            for entry in entries {
                out.push_str("#EXTINF:-1, ");
                out.push_str(&entry.title);
                out.push('\n');
                out.push_str(&entry.path);
                out.push_str("\n\n");
            }
        }
        PlaylistFormat::Plain => {
            for entry in entries {
                out.push_str(&entry.path);
                out.push('\n');
            }
        }
    }

    out
}

/// Reduce a podcast name to something safe to use as a file name.
///
/// Quotes are dropped, every other run of characters outside `[ a-zA-Z0-9]`
/// becomes one space, and the result is trimmed.
pub fn safe_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut in_run = false;

    for c in name.chars().filter(|c| !matches!(c, '\'' | '"')) {
        if c == ' ' || c.is_ascii_alphanumeric() {
            stem.push(c);
            in_run = false;
        } else if !in_run {
            stem.push(' ');
            in_run = true;
        }
    }

    stem.trim().to_string()
}

/// `<safe name>.m3u`, or `cast<id>.m3u` when nothing of the name survives
pub fn playlist_file_name(podcast: &Podcast) -> String {
    let stem = safe_file_stem(&podcast.name);
    if stem.is_empty() {
        format!("cast{}.m3u", podcast.id)
    } else {
        format!("{stem}.m3u")
    }
}

/// Rewrite the playlist for `podcast` inside `directory`.
///
/// Returns the playlist path and the number of entries written.
pub fn write_playlist(
    store: &Store,
    podcast: &Podcast,
    directory: &Path,
    options: &PlaylistOptions,
) -> Result<(PathBuf, usize), PlaylistError> {
    let entries = playlist_entries(store.list_episodes(podcast.id)?, options);

    std::fs::create_dir_all(directory).map_err(|e| PlaylistError::DirectoryCreateFailed {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let path = directory.join(playlist_file_name(podcast));
    std::fs::write(&path, render_playlist(&entries, options.format)).map_err(|e| {
        PlaylistError::WriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;

    debug!(path = %path.display(), entries = entries.len(), "wrote playlist");
    Ok((path, entries.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EpisodeFields;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn episode(guid: &str, date: Option<(i32, u32, u32)>, path: Option<&str>) -> Episode {
        Episode {
            podcast_id: 1,
            guid: guid.to_string(),
            title: format!("Title {guid}"),
            description: String::new(),
            published_at: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            source_url: None,
            local_path: path.map(String::from),
        }
    }

    #[test]
    fn entries_are_newest_first_and_downloaded_only() {
        let episodes = vec![
            episode("old", Some((2023, 5, 1)), Some("/d/old.mp3")),
            episode("new", Some((2024, 2, 1)), Some("/d/new.mp3")),
            episode("missing", Some((2024, 3, 1)), None),
            episode("mid", Some((2023, 12, 24)), Some("/d/mid.mp3")),
        ];

        let paths: Vec<_> = playlist_entries(episodes, &PlaylistOptions::default())
            .into_iter()
            .map(|e| e.path)
            .collect();

        assert_eq!(paths, vec!["/d/new.mp3", "/d/mid.mp3", "/d/old.mp3"]);
    }

    #[test]
    fn undated_episodes_sort_last_in_stored_order() {
        let episodes = vec![
            episode("u1", None, Some("/d/u1.mp3")),
            episode("dated", Some((2020, 1, 1)), Some("/d/dated.mp3")),
            episode("u2", None, Some("/d/u2.mp3")),
        ];

        let paths: Vec<_> = playlist_entries(episodes, &PlaylistOptions::default())
            .into_iter()
            .map(|e| e.path)
            .collect();

        assert_eq!(paths, vec!["/d/dated.mp3", "/d/u1.mp3", "/d/u2.mp3"]);
    }

    #[test]
    fn limit_keeps_most_recent() {
        let episodes = vec![
            episode("a", Some((2024, 1, 1)), Some("/d/a.mp3")),
            episode("b", Some((2024, 1, 2)), Some("/d/b.mp3")),
            episode("c", Some((2024, 1, 3)), None),
        ];
        let options = PlaylistOptions {
            limit: Some(1),
            ..Default::default()
        };

        let entries = playlist_entries(episodes, &options);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/d/b.mp3");
    }

    #[test]
    fn path_subst_rewrites_paths() {
        let subst: PathSubst = "/d/^/media/podcasts/".parse().unwrap();
        let options = PlaylistOptions {
            path_subst: Some(subst),
            ..Default::default()
        };

        let entries = playlist_entries(
            vec![episode("a", Some((2024, 1, 1)), Some("/d/a.mp3"))],
            &options,
        );
        assert_eq!(entries[0].path, "/media/podcasts/a.mp3");
    }

    #[test]
    fn path_subst_supports_patterns() {
        let subst: PathSubst = r"cast(\d+)-^show$1/".parse().unwrap();
        assert_eq!(subst.apply("/d/cast12-ep1.mp3"), "/d/show12/ep1.mp3");
    }

    #[test]
    fn path_subst_requires_separator() {
        assert!(matches!(
            "no-caret".parse::<PathSubst>(),
            Err(PathSubstError::MissingSeparator(_))
        ));
        assert!(matches!(
            "([^x".parse::<PathSubst>(),
            Err(PathSubstError::InvalidPattern(_))
        ));
    }

    #[test]
    fn render_extended_format() {
        let entries = vec![PlaylistEntry {
            title: "Episode One".to_string(),
            path: "/d/cast1-ep1.mp3".to_string(),
        }];

        assert_eq!(
            render_playlist(&entries, PlaylistFormat::Extended),
            "#EXTM3U\n\n#EXTINF:-1, Episode One\n/d/cast1-ep1.mp3\n\n"
        );
    }

    #[test]
    fn render_plain_format() {
        let entries = vec![
            PlaylistEntry {
                title: "One".to_string(),
                path: "/d/1.mp3".to_string(),
            },
            PlaylistEntry {
                title: "Two".to_string(),
                path: "/d/2.mp3".to_string(),
            },
        ];

        assert_eq!(
            render_playlist(&entries, PlaylistFormat::Plain),
            "/d/1.mp3\n/d/2.mp3\n"
        );
    }

    #[test]
    fn empty_playlists_render_header_or_nothing() {
        assert_eq!(render_playlist(&[], PlaylistFormat::Extended), "#EXTM3U\n\n");
        assert_eq!(render_playlist(&[], PlaylistFormat::Plain), "");
    }

    #[test]
    fn safe_file_stem_strips_quotes_and_symbols() {
        assert_eq!(safe_file_stem("Test Show"), "Test Show");
        assert_eq!(safe_file_stem("Bob's \"Big\" Show"), "Bobs Big Show");
        assert_eq!(safe_file_stem("  Tech/News: Daily!  "), "Tech News  Daily");
        assert_eq!(safe_file_stem("a--b"), "a b");
        assert_eq!(safe_file_stem("!!!"), "");
    }

    #[test]
    fn playlist_file_name_falls_back_to_id() {
        let mut podcast = Podcast {
            id: 4,
            url: "http://example.com/feed.xml".to_string(),
            name: String::new(),
            author: String::new(),
        };
        assert_eq!(playlist_file_name(&podcast), "cast4.m3u");

        podcast.name = "Test Show".to_string();
        assert_eq!(playlist_file_name(&podcast), "Test Show.m3u");
    }

    #[test]
    fn write_playlist_truncates_previous_contents() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        store.update_podcast_meta(id, "Test Show", "A. Host").unwrap();
        let podcast = store.get_podcast(id).unwrap();

        let stale = dir.path().join("Test Show.m3u");
        std::fs::write(&stale, "stale content that is much longer than the new playlist").unwrap();

        let (path, count) =
            write_playlist(&store, &podcast, dir.path(), &PlaylistOptions::default()).unwrap();

        assert_eq!(path, stale);
        assert_eq!(count, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#EXTM3U\n\n");
    }

    #[test]
    fn write_playlist_lists_downloaded_episodes() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let id = store.add_podcast("http://example.com/feed.xml").unwrap();
        store.update_podcast_meta(id, "Test Show", "A. Host").unwrap();
        store
            .upsert_episode(
                id,
                "ep1",
                &EpisodeFields {
                    title: "Episode One".to_string(),
                    published_at: NaiveDate::from_ymd_opt(2024, 1, 1),
                    ..Default::default()
                },
            )
            .unwrap();
        store.set_episode_local_path(id, "ep1", "/d/cast1-ep1.mp3").unwrap();
        let podcast = store.get_podcast(id).unwrap();

        let options = PlaylistOptions {
            format: PlaylistFormat::Plain,
            ..Default::default()
        };
        let (path, count) = write_playlist(&store, &podcast, dir.path(), &options).unwrap();

        assert_eq!(count, 1);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "/d/cast1-ep1.mp3\n");
    }
}
