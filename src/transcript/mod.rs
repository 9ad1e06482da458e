use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::video::{extract_video_id, MalformedUrl, VideoId};
use crate::Result;

pub mod captions;
pub mod fallback;
pub mod primary;

/// Outcome of a single fetch path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptResult {
    /// Full transcript text, never empty
    Text(String),
    /// No usable captions on this path
    Absent,
}

impl TranscriptResult {
    /// Space-join ordered caption segments. A blank join yields `Absent`.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = segments
            .into_iter()
            .map(|segment| segment.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        if text.trim().is_empty() {
            TranscriptResult::Absent
        } else {
            TranscriptResult::Text(text)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TranscriptResult::Absent)
    }
}

/// Which path produced the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptOrigin {
    /// Captions service
    Primary,
    /// Downloaded caption file
    Fallback,
}

impl std::fmt::Display for TranscriptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptOrigin::Primary => write!(f, "captions service"),
            TranscriptOrigin::Fallback => write!(f, "yt-dlp captions"),
        }
    }
}

/// An acquired transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: VideoId,
    pub language: String,
    pub origin: TranscriptOrigin,
    pub text: String,
}

/// Terminal states of an acquisition that are not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Transcript(Transcript),
    /// Both paths came back empty
    Unavailable,
}

/// Failures surfaced to the caller
#[derive(thiserror::Error, Debug)]
pub enum AcquireError {
    #[error(transparent)]
    MalformedUrl(#[from] MalformedUrl),

    #[error("{0:#}")]
    HardFailure(anyhow::Error),
}

/// Captions service lookup by id and language
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrimarySource: Send + Sync {
    /// Expected absence comes back as `Ok(Absent)`; only unexpected failures are errors
    async fn fetch_primary(&self, video_id: &VideoId, language: &str) -> Result<TranscriptResult>;
}

/// Secondary path that works from the original URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn fetch_fallback(&self, url: &str, language: &str) -> Result<TranscriptResult>;
}

/// Sequences the primary and fallback fetchers for one URL
pub struct TranscriptPipeline {
    primary: Box<dyn PrimarySource>,
    fallback: Box<dyn FallbackSource>,
    language: String,
}

impl TranscriptPipeline {
    pub fn new(
        primary: Box<dyn PrimarySource>,
        fallback: Box<dyn FallbackSource>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            language: language.into(),
        }
    }

    /// Build the default pipeline: YouTube captions service, then yt-dlp
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = primary::YoutubeCaptionService::new(&config.transcript)?;
        let downloader = fallback::YtDlpDownloader::from_config(&config.transcript)?;

        Ok(Self::new(
            Box::new(primary::PrimaryFetcher::new(service)),
            Box::new(downloader),
            config.transcript.language.clone(),
        ))
    }

    /// Override the configured language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Acquire the transcript for `url`.
    ///
    /// Extracts the id, tries the primary source and only falls back when it
    /// reports `Absent`. No retries.
    pub async fn acquire(&self, url: &str) -> std::result::Result<Acquisition, AcquireError> {
        let video_id = extract_video_id(url)?;
        tracing::info!("Acquiring {} transcript for video {}", self.language, video_id);

        let primary = self
            .primary
            .fetch_primary(&video_id, &self.language)
            .await
            .map_err(AcquireError::HardFailure)?;

        if let TranscriptResult::Text(text) = primary {
            tracing::info!("Transcript found via captions service ({} chars)", text.len());
            return Ok(self.found(video_id, TranscriptOrigin::Primary, text));
        }

        tracing::info!("Captions service had no transcript, falling back to yt-dlp");

        let fallback = self
            .fallback
            .fetch_fallback(url, &self.language)
            .await
            .map_err(AcquireError::HardFailure)?;

        match fallback {
            TranscriptResult::Text(text) => {
                tracing::info!("Transcript found via yt-dlp ({} chars)", text.len());
                Ok(self.found(video_id, TranscriptOrigin::Fallback, text))
            }
            TranscriptResult::Absent => {
                tracing::info!("No transcript available for video {}", video_id);
                Ok(Acquisition::Unavailable)
            }
        }
    }

    fn found(&self, video_id: VideoId, origin: TranscriptOrigin, text: String) -> Acquisition {
        Acquisition::Transcript(Transcript {
            video_id,
            language: self.language.clone(),
            origin,
            text,
        })
    }
}
