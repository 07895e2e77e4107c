use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the episode database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database {location}: {source}")]
    OpenFailed {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("No podcast with id {0}")]
    PodcastNotFound(i64),
}

/// Errors that can occur when fetching or parsing a podcast feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Failed to parse Atom feed: {0}")]
    AtomParseFailed(#[from] atom_syndication::Error),

    #[error("Document is neither an RSS nor an Atom feed")]
    UnknownFormat,

    #[error("Failed to store feed data: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur while downloading an episode's audio
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to record download: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur while rewriting an audio file's tags
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to read audio file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("Failed to inspect audio file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio file {path} has no writable tag")]
    NoTag { path: PathBuf },

    #[error("Failed to save tags to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Errors that can occur while writing a playlist file
#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write playlist {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load episodes: {0}")]
    Store(#[from] StoreError),
}

/// Errors in a `pattern^replacement` path substitution
#[derive(Error, Debug)]
pub enum PathSubstError {
    #[error("Path substitution '{0}' must have the form pattern^replacement")]
    MissingSeparator(String),

    #[error("Invalid path substitution pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors that can occur while loading the preference file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the home directory")]
    NoHomeDirectory,

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported database location '{0}' (expected a SQLite path or sqlite:// URL)")]
    UnsupportedStore(String),
}

/// Top-level errors for batch operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
