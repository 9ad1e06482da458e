//! tubesum - fetch the transcript of a YouTube video and summarize it
//!
//! Transcripts come from YouTube's captions service first and, when that has
//! nothing, from auto-generated captions downloaded with yt-dlp. The text is
//! then handed to a summarization model.

pub mod cli;
pub mod config;
pub mod output;
pub mod summarize;
pub mod transcript;
pub mod utils;
pub mod video;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use summarize::{summarize_video, HuggingFaceSummarizer, Outcome, Summarizer, SummaryLength, VideoSummary};
pub use transcript::{AcquireError, Acquisition, Transcript, TranscriptPipeline, TranscriptResult};
pub use video::{extract_video_id, MalformedUrl, VideoId};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to tubesum
#[derive(thiserror::Error, Debug)]
pub enum TubesumError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("Summarization failed: {0:#}")]
    Summarization(anyhow::Error),
}
