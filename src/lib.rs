pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod playlist;
pub mod progress;
pub mod refresh;
pub mod store;
pub mod sync;
pub mod tags;

// Re-export main types for convenience
pub use config::{Config, StoreLocation};
pub use episode::{download_episode, local_file_name};
pub use error::{
    ConfigError, DownloadError, FeedError, PathSubstError, PlaylistError, StoreError, SyncError,
    TagError,
};
pub use feed::{Feed, FeedItem, Link, fetch_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use playlist::{PathSubst, PlaylistFormat, PlaylistOptions, write_playlist};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use refresh::{RefreshSummary, reconcile_feed, refresh_podcast};
pub use store::{Episode, EpisodeFields, Podcast, Store};
pub use sync::{DownloadOptions, PlaylistJob, SyncResult};
pub use tags::{TrackTags, write_tags};
