use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Events emitted while refreshing, downloading, tagging and writing playlists
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A podcast's feed is being fetched
    RefreshStarting { podcast: String, url: String },

    /// A feed item was stored for the first time
    EpisodeInserted { podcast: String, title: String },

    /// A feed item already in the database was rewritten
    EpisodeUpdated { podcast: String, title: String },

    /// A feed item lacked an id or title and was ignored
    ItemSkipped { podcast: String, reason: String },

    RefreshCompleted {
        podcast: String,
        inserted: usize,
        updated: usize,
        skipped: usize,
    },

    /// Fetching or storing a feed failed; the batch moves on
    RefreshFailed { podcast: String, error: String },

    /// Waiting out the pre-download delay
    DownloadWaiting {
        episode_title: String,
        url: String,
        path: PathBuf,
        delay: Duration,
    },

    /// A download is starting
    DownloadStarting {
        episode_title: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed successfully
    DownloadCompleted {
        episode_title: String,
        path: PathBuf,
        bytes_downloaded: u64,
    },

    /// A download failed
    DownloadFailed {
        episode_title: String,
        error: String,
    },

    /// Tags of a file were rewritten
    TagsWritten { path: PathBuf },

    TagsFailed { path: PathBuf, error: String },

    /// A playlist file was (re)written
    PlaylistWritten { path: PathBuf, entries: usize },

    PlaylistFailed { podcast: String, error: String },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every event so tests can assert on what was reported
    #[derive(Default)]
    pub struct RecordingReporter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingReporter {
        pub fn shared() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
