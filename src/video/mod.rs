use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Query parameter that carries the video id on watch URLs
const VIDEO_ID_PARAM: &str = "v";

/// Resolves scheme-less input such as `www.youtube.com/watch?v=...`
const RELATIVE_BASE: &str = "https://www.youtube.com/";

/// Raised when no video id can be pulled out of the input
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("No video id found in URL: {url}")]
pub struct MalformedUrl {
    pub url: String,
}

/// Opaque video identifier taken from the `v` query parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this id
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the video id from a URL.
///
/// Only the `v` query parameter is consulted. Empty values are skipped, and
/// of the rest the first occurrence wins. Input without a scheme is read as a
/// path relative to youtube.com.
pub fn extract_video_id(url: &str) -> Result<VideoId, MalformedUrl> {
    let malformed = || MalformedUrl {
        url: url.to_string(),
    };

    let trimmed = url.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE).map_err(|_| malformed())?;
            Url::options()
                .base_url(Some(&base))
                .parse(trimmed)
                .map_err(|_| malformed())?
        }
        Err(_) => return Err(malformed()),
    };

    parsed
        .query_pairs()
        .find(|(key, value)| key == VIDEO_ID_PARAM && !value.is_empty())
        .map(|(_, value)| VideoId(value.into_owned()))
        .ok_or_else(malformed)
}
