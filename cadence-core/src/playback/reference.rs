//! Playback reference normalization.
//!
//! Lessons carry an opaque playback reference that has arrived in three
//! shapes over the platform's history: a bare stream id, a full
//! origin-qualified player URL, or a manifest-suffixed path. All three
//! normalize to the same canonical manifest URL,
//! `https://<stream-host>/<id>.m3u8`.

use tracing::debug;
use url::Url;

use crate::config::StreamConfig;

/// File suffix of an adaptive-stream manifest.
pub const MANIFEST_SUFFIX: &str = ".m3u8";

/// Extracts the bare stream id from any reference shape.
///
/// `None` means the reference is unusable (empty or reduces to nothing);
/// callers fail fast without throwing.
pub fn stream_id(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Origin-qualified URLs keep only their final path segment; the query
    // string and any player path prefix are noise.
    let segment = match Url::parse(trimmed) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .map(str::to_string)?,
        Err(_) => trimmed
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map(str::to_string)?,
    };

    let id = segment.strip_suffix(MANIFEST_SUFFIX).unwrap_or(&segment);
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Canonical manifest URL for a playback reference.
pub fn manifest_url(reference: &str, stream: &StreamConfig) -> Option<Url> {
    let id = stream_id(reference)?;
    let canonical = format!("https://{}/{id}{MANIFEST_SUFFIX}", stream.stream_host);

    match Url::parse(&canonical) {
        Ok(url) => Some(url),
        Err(error) => {
            debug!(%canonical, %error, "canonical manifest URL failed to parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_config() -> StreamConfig {
        StreamConfig {
            stream_host: "stream.example.com".to_string(),
        }
    }

    #[test]
    fn test_bare_id_normalizes() {
        let url = manifest_url("abc123", &stream_config()).unwrap();
        assert_eq!(url.as_str(), "https://stream.example.com/abc123.m3u8");
    }

    #[test]
    fn test_full_player_url_normalizes() {
        // Scenario D: player prefix and query string are discarded.
        let url = manifest_url(
            "https://stream.example.com/player/abc123.m3u8?query=1",
            &stream_config(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://stream.example.com/abc123.m3u8");
    }

    #[test]
    fn test_manifest_suffixed_path_normalizes() {
        let url = manifest_url("videos/abc123.m3u8", &stream_config()).unwrap();
        assert_eq!(url.as_str(), "https://stream.example.com/abc123.m3u8");
    }

    #[test]
    fn test_unusable_references_resolve_to_none() {
        assert!(stream_id("").is_none());
        assert!(stream_id("   ").is_none());
        assert!(stream_id("/").is_none());
        assert!(stream_id(".m3u8").is_none());
    }

    #[test]
    fn test_foreign_host_still_yields_canonical_url() {
        // The id wins over whatever host the reference pointed at.
        let url = manifest_url("https://cdn.other.net/v2/xyz789.m3u8", &stream_config()).unwrap();
        assert_eq!(url.as_str(), "https://stream.example.com/xyz789.m3u8");
    }
}
