use url::Url;

/// Used when nothing filesystem-safe is left of a GUID
const FALLBACK_SUFFIX: &str = "episode";

/// Build the local file name for an episode: `cast<podcast_id>-<guid suffix>.<ext>`
///
/// The name depends only on the podcast id, the GUID and the source URL, so
/// re-running a download targets the same file.
pub fn local_file_name(podcast_id: i64, guid: &str, source_url: &str) -> String {
    format!(
        "cast{}-{}.{}",
        podcast_id,
        guid_suffix(guid),
        audio_extension(source_url)
    )
}

/// The last `/`-separated segment of a GUID, made safe for use in a file name
pub fn guid_suffix(guid: &str) -> String {
    let segment = guid
        .trim()
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or("");

    let sanitized = sanitize_filename::sanitize(segment);
    let sanitized = sanitized.trim();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        FALLBACK_SUFFIX.to_string()
    } else {
        sanitized.to_string()
    }
}

/// Audio file extension taken from the source URL path, defaulting to "mp3"
pub fn audio_extension(source_url: &str) -> String {
    Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(String::from))
        })
        .and_then(|filename| {
            filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
        })
        .filter(|ext| is_valid_audio_extension(ext))
        .unwrap_or_else(|| "mp3".to_string())
}

/// Check if a string is a valid audio file extension
fn is_valid_audio_extension(ext: &str) -> bool {
    matches!(
        ext,
        "mp3" | "m4a" | "mp4" | "aac" | "ogg" | "oga" | "opus" | "wav" | "flac"
    )
}
