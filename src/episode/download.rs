use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Download `url` to `output_path`
///
/// Streams the response body to disk, reporting progress through the reporter.
/// Returns the number of bytes downloaded on success. A failed transfer leaves
/// whatever was already written in place.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    url: &str,
    episode_title: &str,
    output_path: &Path,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        episode_title: episode_title.to_string(),
        content_length: response.content_length,
    });

    let mut file = File::create(output_path).await.map_err(|e| DownloadError::FileCreateFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk).await.map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: episode_title.to_string(),
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush().await.map_err(|e| DownloadError::FileWriteFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    debug!(url, path = %output_path.display(), bytes_downloaded, "download finished");
    reporter.report(ProgressEvent::DownloadCompleted {
        episode_title: episode_title.to_string(),
        path: output_path.to_path_buf(),
        bytes_downloaded,
    });

    Ok(bytes_downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttpClient;
    use crate::progress::NoopReporter;

    use tempfile::tempdir;

    const URL: &str = "https://example.com/episode.mp3";

    #[tokio::test]
    async fn download_writes_file() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("episode.mp3");
        let client = MockHttpClient::new().with_body(URL, "test audio content");

        let bytes = download_episode(
            &client,
            URL,
            "Test Episode",
            &output_path,
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(bytes, 18); // "test audio content".len()
        let content = std::fs::read(&output_path).unwrap();
        assert_eq!(content, b"test audio content");
    }

    #[tokio::test]
    async fn download_fails_on_http_error() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("episode.mp3");
        let client = MockHttpClient::new()
            .with_body(URL, "Not Found")
            .with_status(URL, 404);

        let result = download_episode(
            &client,
            URL,
            "Test Episode",
            &output_path,
            &NoopReporter::shared(),
        )
        .await;

        match result.unwrap_err() {
            DownloadError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
        assert!(!output_path.exists());
    }

    #[tokio::test]
    async fn download_fails_when_directory_is_missing() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("missing").join("episode.mp3");
        let client = MockHttpClient::new().with_body(URL, "audio");

        let result = download_episode(
            &client,
            URL,
            "Test Episode",
            &output_path,
            &NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(DownloadError::FileCreateFailed { .. })));
    }
}
