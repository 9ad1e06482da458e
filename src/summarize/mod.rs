use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SummarizerConfig;
use crate::transcript::{Acquisition, Transcript, TranscriptOrigin, TranscriptPipeline};
use crate::video::VideoId;
use crate::{Result, TubesumError};

/// Summary length bounds in model tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLength {
    min: u32,
    max: u32,
}

impl SummaryLength {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if max == 0 {
            anyhow::bail!("Summary max length must be greater than zero");
        }
        if min > max {
            anyhow::bail!("Summary min length ({}) exceeds max length ({})", min, max);
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// Opaque text summarization capability. Implementations must be deterministic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: SummaryParameters,
}

#[derive(Debug, Serialize)]
struct SummaryParameters {
    min_length: u32,
    max_length: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

/// Summarizer backed by the Hugging Face inference API
pub struct HuggingFaceSummarizer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
    max_input_chars: usize,
}

impl HuggingFaceSummarizer {
    /// Build from config, reading the API token from the configured env var
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to build summarizer HTTP client")?;

        let api_token = std::env::var(&config.api_token_env)
            .ok()
            .filter(|token| !token.trim().is_empty());
        if api_token.is_none() {
            tracing::debug!("{} not set, calling summarizer without a token", config.api_token_env);
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token,
            max_input_chars: config.max_input_chars,
        })
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token;
        self
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String> {
        let inputs = truncate_at_word(text, self.max_input_chars);
        if inputs.len() < text.len() {
            tracing::warn!(
                "Transcript cut from {} to {} bytes before summarizing",
                text.len(),
                inputs.len()
            );
        }

        let url = format!("{}/models/{}", self.endpoint, self.model);
        tracing::info!("Summarizing {} chars with {}", inputs.len(), self.model);

        let mut request = self.client.post(&url).json(&SummaryRequest {
            inputs,
            parameters: SummaryParameters {
                min_length: length.min(),
                max_length: length.max(),
                do_sample: false,
            },
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach summarization service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read summarization response")?;

        if !status.is_success() {
            anyhow::bail!("Summarization service returned HTTP {}: {}", status, body.trim());
        }

        let items: Vec<SummaryItem> = serde_json::from_str(&body)
            .with_context(|| format!("Unexpected summarization response: {}", body.trim()))?;

        items
            .into_iter()
            .map(|item| item.summary_text.trim().to_string())
            .find(|summary| !summary.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Summarization service returned no summary"))
    }
}

/// Cut `text` to at most `max_chars` bytes, backing up to a char and then a
/// word boundary
pub fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }

    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let cut = &text[..end];
    match cut.rfind(char::is_whitespace) {
        Some(space) if space > 0 => cut[..space].trim_end(),
        _ => cut,
    }
}

/// A finished summary with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: VideoId,
    pub language: String,
    pub origin: TranscriptOrigin,
    pub summary: String,
    pub transcript_chars: usize,
    pub generated_at: DateTime<Utc>,
}

impl VideoSummary {
    pub fn new(transcript: &Transcript, summary: String) -> Self {
        Self {
            video_id: transcript.video_id.clone(),
            language: transcript.language.clone(),
            origin: transcript.origin,
            summary,
            transcript_chars: transcript.text.chars().count(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Summary(VideoSummary),
    /// Neither path had captions; nothing was summarized
    NoTranscript,
}

/// Acquire the transcript for `url` and summarize it.
///
/// The summarizer only runs once a non-empty transcript exists.
pub async fn summarize_video(
    pipeline: &TranscriptPipeline,
    summarizer: &dyn Summarizer,
    url: &str,
    length: SummaryLength,
    progress: &ProgressBar,
) -> std::result::Result<Outcome, TubesumError> {
    progress.set_message("Fetching transcript...");

    let transcript = match pipeline.acquire(url).await? {
        Acquisition::Transcript(transcript) => transcript,
        Acquisition::Unavailable => return Ok(Outcome::NoTranscript),
    };

    progress.set_message(format!(
        "Summarizing {} chars from {}...",
        transcript.text.len(),
        transcript.origin
    ));

    let summary = summarizer
        .summarize(&transcript.text, length)
        .await
        .map_err(TubesumError::Summarization)?;

    Ok(Outcome::Summary(VideoSummary::new(&transcript, summary)))
}
