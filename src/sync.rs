// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch operations over one or all subscriptions.
//!
//! Everything runs strictly in sequence. A failure for one podcast, episode
//! or file is reported, recorded in the [`SyncResult`] and skipped; only a
//! failure to read the subscription list itself aborts a batch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::episode::{download_episode, local_file_name};
use crate::error::{DownloadError, SyncError};
use crate::http::HttpClient;
use crate::playlist::{PlaylistOptions, write_playlist};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::refresh::refresh_podcast;
use crate::store::{Episode, Podcast, Store};
use crate::tags::tag_episode;

/// Pause before every transfer so feed hosts are not hammered
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_secs(3);

/// Options for downloading episode audio
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory the audio files are written to
    pub directory: PathBuf,
    /// Fixed delay applied before each transfer
    pub delay: Duration,
    /// Rewrite the tags of each file right after it is downloaded
    pub update_tags: bool,
}

impl DownloadOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            delay: DEFAULT_DOWNLOAD_DELAY,
            update_tags: false,
        }
    }
}

/// Options for `generate_playlists`
#[derive(Debug, Clone)]
pub struct PlaylistJob {
    /// Directory the playlist files are written to
    pub directory: PathBuf,
    pub refresh_first: bool,
    /// Download missing episodes before writing playlists
    pub download: Option<DownloadOptions>,
    /// Re-tag already downloaded files when not downloading
    pub update_tags: bool,
    pub playlist: PlaylistOptions,
}

/// Outcome of a batch operation
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    pub refreshed: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Number of episodes successfully downloaded
    pub downloaded: usize,
    /// Episodes left alone because they were already downloaded
    pub skipped: usize,
    pub tagged: usize,
    pub playlists: Vec<PathBuf>,
    /// What failed (podcast, episode or file) and why
    pub failures: Vec<(String, String)>,
}

impl SyncResult {
    fn merge(&mut self, other: SyncResult) {
        self.refreshed += other.refreshed;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.tagged += other.tagged;
        self.playlists.extend(other.playlists);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, subject: impl Into<String>, error: impl ToString) {
        self.failures.push((subject.into(), error.to_string()));
    }
}

/// Refresh one podcast (`id`) or all of them
pub async fn refresh<C: HttpClient>(
    store: &Store,
    client: &C,
    id: Option<i64>,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let mut result = SyncResult::default();

    for podcast in store.list_podcasts(id)? {
        match refresh_podcast(store, client, &podcast, reporter).await {
            Ok(summary) => {
                result.refreshed += 1;
                result.inserted += summary.inserted;
                result.updated += summary.updated;
            }
            Err(e) => {
                warn!(id = podcast.id, "refresh failed: {e}");
                reporter.report(ProgressEvent::RefreshFailed {
                    podcast: podcast.label().to_string(),
                    error: e.to_string(),
                });
                result.fail(podcast.label(), e);
            }
        }
    }

    Ok(result)
}

/// Download missing audio for one podcast (`id`) or all of them
pub async fn download<C: HttpClient>(
    store: &Store,
    client: &C,
    id: Option<i64>,
    refresh_first: bool,
    options: &DownloadOptions,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let mut result = SyncResult::default();

    for podcast in store.list_podcasts(id)? {
        if refresh_first {
            result.merge(refresh(store, client, Some(podcast.id), reporter).await?);
        }

        // Re-read so tags use the name and author the refresh just stored.
        let podcast = match store.get_podcast(podcast.id) {
            Ok(podcast) => podcast,
            Err(e) => {
                result.fail(podcast.label(), e);
                continue;
            }
        };

        match download_podcast(store, client, &podcast, options, reporter).await {
            Ok(podcast_result) => result.merge(podcast_result),
            Err(e) => {
                warn!(id = podcast.id, "download failed: {e}");
                result.fail(podcast.label(), e);
            }
        }
    }

    Ok(result)
}

/// Download every episode of `podcast` that has a source but no local file yet
pub async fn download_podcast<C: HttpClient>(
    store: &Store,
    client: &C,
    podcast: &Podcast,
    options: &DownloadOptions,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, DownloadError> {
    info!(id = podcast.id, "Downloading {}...", podcast.label());

    std::fs::create_dir_all(&options.directory).map_err(|e| {
        DownloadError::DirectoryCreateFailed {
            path: options.directory.clone(),
            source: e,
        }
    })?;

    let mut result = SyncResult::default();

    for episode in store.list_episodes(podcast.id)? {
        if episode.is_downloaded() {
            result.skipped += 1;
            continue;
        }
        let Some(source_url) = episode.source_url.as_deref() else {
            continue;
        };

        let path = options
            .directory
            .join(local_file_name(podcast.id, &episode.guid, source_url));

        reporter.report(ProgressEvent::DownloadWaiting {
            episode_title: episode.title.clone(),
            url: source_url.to_string(),
            path: path.clone(),
            delay: options.delay,
        });
        info!(
            "Downloading (in {} sec) {} -> {}",
            options.delay.as_secs(),
            source_url,
            path.display()
        );
        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        match fetch_and_record(store, client, &episode, source_url, &path, reporter).await {
            Ok(()) => {
                result.downloaded += 1;
                if options.update_tags {
                    tag_file(podcast, &episode, Some(&path), reporter, &mut result);
                }
            }
            Err(e) => {
                warn!(guid = %episode.guid, "download failed: {e}");
                reporter.report(ProgressEvent::DownloadFailed {
                    episode_title: episode.title.clone(),
                    error: e.to_string(),
                });
                result.fail(&episode.title, e);
            }
        }
    }

    Ok(result)
}

async fn fetch_and_record<C: HttpClient>(
    store: &Store,
    client: &C,
    episode: &Episode,
    source_url: &str,
    path: &Path,
    reporter: &SharedProgressReporter,
) -> Result<(), DownloadError> {
    download_episode(client, source_url, &episode.title, path, reporter).await?;
    store.set_episode_local_path(
        episode.podcast_id,
        &episode.guid,
        &path.to_string_lossy(),
    )?;
    Ok(())
}

fn tag_file(
    podcast: &Podcast,
    episode: &Episode,
    path_override: Option<&Path>,
    reporter: &SharedProgressReporter,
    result: &mut SyncResult,
) {
    let path = path_override
        .map(Path::to_path_buf)
        .or_else(|| episode.local_path.as_ref().map(PathBuf::from));
    let Some(path) = path else {
        return;
    };

    match tag_episode(podcast, episode, Some(&path)) {
        Ok(_) => {
            result.tagged += 1;
            reporter.report(ProgressEvent::TagsWritten { path });
        }
        Err(e) => {
            warn!(path = %path.display(), "tagging failed: {e}");
            reporter.report(ProgressEvent::TagsFailed {
                path: path.clone(),
                error: e.to_string(),
            });
            result.fail(path.display().to_string(), e);
        }
    }
}

/// Rewrite the tags of every downloaded file from the stored metadata
pub fn update_metadata(
    store: &Store,
    id: Option<i64>,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let mut result = SyncResult::default();

    for podcast in store.list_podcasts(id)? {
        let episodes = match store.list_episodes(podcast.id) {
            Ok(episodes) => episodes,
            Err(e) => {
                result.fail(podcast.label(), e);
                continue;
            }
        };

        for episode in episodes.iter().filter(|e| e.is_downloaded()) {
            tag_file(&podcast, episode, None, reporter, &mut result);
        }
    }

    Ok(result)
}

/// Write a playlist per podcast, optionally refreshing, downloading or
/// re-tagging first
pub async fn generate_playlists<C: HttpClient>(
    store: &Store,
    client: &C,
    id: Option<i64>,
    job: &PlaylistJob,
    reporter: &SharedProgressReporter,
) -> Result<SyncResult, SyncError> {
    let mut result = SyncResult::default();

    if job.refresh_first {
        result.merge(refresh(store, client, id, reporter).await?);
    }

    match &job.download {
        Some(options) => result.merge(download(store, client, id, false, options, reporter).await?),
        None if job.update_tags => result.merge(update_metadata(store, id, reporter)?),
        None => {}
    }

    for podcast in store.list_podcasts(id)? {
        match write_playlist(store, &podcast, &job.directory, &job.playlist) {
            Ok((path, entries)) => {
                reporter.report(ProgressEvent::PlaylistWritten {
                    path: path.clone(),
                    entries,
                });
                result.playlists.push(path);
            }
            Err(e) => {
                warn!(id = podcast.id, "playlist failed: {e}");
                reporter.report(ProgressEvent::PlaylistFailed {
                    podcast: podcast.label().to_string(),
                    error: e.to_string(),
                });
                result.fail(podcast.label(), e);
            }
        }
    }

    Ok(result)
}
