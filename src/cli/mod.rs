use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubesum",
    about = "tubesum - Summarize YouTube videos from their transcripts",
    version,
    long_about = "Fetches the transcript of a YouTube video (captions service first, yt-dlp auto-captions as a fallback) and produces a short abstractive summary."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./tubesum.yaml or the user config dir)
    #[arg(long, global = true, value_name = "FILE", env = "TUBESUM_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a video's transcript and summarize it
    Summarize {
        /// YouTube watch URL (must carry a `v` parameter)
        #[arg(value_name = "URL")]
        url: String,

        /// Caption language code (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Minimum summary length in tokens
        #[arg(long, value_name = "TOKENS")]
        min_length: Option<u32>,

        /// Maximum summary length in tokens
        #[arg(long, value_name = "TOKENS")]
        max_length: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Fetch and print a video's transcript without summarizing
    Transcript {
        /// YouTube watch URL (must carry a `v` parameter)
        #[arg(value_name = "URL")]
        url: String,

        /// Caption language code (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Write the configuration file, or show it
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that external tools are available
    Check,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with video metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
