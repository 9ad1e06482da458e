use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::summarize::VideoSummary;
use crate::transcript::Transcript;

/// Shown when neither fetch path produced captions
pub const NO_TRANSCRIPT_NOTICE: &str = "No transcript available for this video.";

/// Plain-text rendering of a summary
pub fn format_as_text(summary: &VideoSummary) -> String {
    format!(
        "Summary ({}, {}, via {}):\n{}\n",
        summary.video_id, summary.language, summary.origin, summary.summary
    )
}

pub fn format_as_json(summary: &VideoSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("Failed to serialize summary")
}

fn render(summary: &VideoSummary, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(summary)),
        OutputFormat::Json => format_as_json(summary),
    }
}

/// Save summary to file
pub async fn save_to_file(summary: &VideoSummary, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(summary, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print summary to console
pub fn print_to_console(summary: &VideoSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", style("Summary:").bold().cyan());
            println!("{}", summary.summary);
        }
        OutputFormat::Json => println!("{}", format_as_json(summary)?),
    }
    Ok(())
}

/// Write the raw transcript to `path`, or stdout when `None`
pub async fn write_transcript(transcript: &Transcript, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => fs_err::write(path, format!("{}\n", transcript.text))?,
        None => println!("{}", transcript.text),
    }
    Ok(())
}

/// Informational notice, not an error
pub fn print_no_transcript() {
    eprintln!("{}", style(NO_TRANSCRIPT_NOTICE).yellow());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptOrigin;
    use crate::video::extract_video_id;
    use tempfile::TempDir;

    fn transcript() -> Transcript {
        Transcript {
            video_id: extract_video_id("https://www.youtube.com/watch?v=abc123").unwrap(),
            language: "en".to_string(),
            origin: TranscriptOrigin::Fallback,
            text: "Hello world".to_string(),
        }
    }

    fn summary() -> VideoSummary {
        VideoSummary::new(&transcript(), "A greeting.".to_string())
    }

    #[test]
    fn test_format_as_text() {
        assert_eq!(
            format_as_text(&summary()),
            "Summary (abc123, en, via yt-dlp captions):\nA greeting.\n"
        );
    }

    #[test]
    fn test_format_as_json() {
        let json: serde_json::Value = serde_json::from_str(&format_as_json(&summary()).unwrap()).unwrap();
        assert_eq!(json["video_id"], "abc123");
        assert_eq!(json["origin"], "fallback");
        assert_eq!(json["summary"], "A greeting.");
        assert_eq!(json["transcript_chars"], 11);
        assert!(json["generated_at"].is_string());
    }

    #[tokio::test]
    async fn test_save_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        save_to_file(&summary(), &path, &OutputFormat::Json).await.unwrap();

        let saved: VideoSummary = serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, summary_with_time(saved.generated_at));
    }

    fn summary_with_time(at: chrono::DateTime<chrono::Utc>) -> VideoSummary {
        VideoSummary { generated_at: at, ..summary() }
    }

    #[tokio::test]
    async fn test_write_transcript_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transcript.txt");
        write_transcript(&transcript(), Some(&path)).await.unwrap();
        assert_eq!(fs_err::read_to_string(&path).unwrap(), "Hello world\n");
    }
}
