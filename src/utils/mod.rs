use crate::config::Config;
use crate::transcript::fallback::YtDlpDownloader;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Check if the current environment has the tools the fallback path needs
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    let downloader = YtDlpDownloader::new(config.transcript.yt_dlp_path.clone(), ".");
    if !downloader.check_availability().await {
        missing.push(format!(
            "{} - required for the caption download fallback",
            config.transcript.yt_dlp_path
        ));
    }

    missing
}
