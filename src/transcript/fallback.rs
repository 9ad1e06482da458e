use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use super::captions::{self, CaptionDocument};
use super::{FallbackSource, TranscriptResult};
use crate::config::TranscriptConfig;
use crate::video::extract_video_id;
use crate::Result;

/// Caption format requested from yt-dlp
const CAPTION_FORMAT: &str = "json3";

/// Removes the caption artifact when dropped, whether or not it was ever
/// written, along with the `.part` file of an interrupted download
struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut partial = self.path.clone().into_os_string();
        partial.push(".part");
        PathBuf::from(partial)
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed caption artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove caption artifact {}: {}", path.display(), e),
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        remove_artifact(&self.path);
        remove_artifact(&self.partial_path());
    }
}

/// Fallback fetcher that asks yt-dlp for auto-generated captions
pub struct YtDlpDownloader {
    yt_dlp_path: String,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            work_dir: work_dir.into(),
            timeout: None,
        }
    }

    /// Bound how long yt-dlp may run. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &TranscriptConfig) -> Result<Self> {
        let work_dir = match &config.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to resolve working directory")?,
        };

        Ok(Self::new(config.yt_dlp_path.clone(), work_dir)
            .with_timeout(config.downloader_timeout_secs.map(Duration::from_secs)))
    }

    /// Check if yt-dlp can be invoked
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// File stem unique to one invocation, so concurrent fallbacks for the
    /// same video never share an artifact
    fn artifact_stem(video_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        format!("{}.{}", video_id, &token[..8])
    }

    async fn run_downloader(&self, url: &str, language: &str, template: &Path) -> Result<()> {
        tracing::debug!("Downloading {} captions with {} for: {}", language, self.yt_dlp_path, url);

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args([
                "--skip-download",
                "--write-auto-subs",
                "--sub-lang",
                language,
                "--sub-format",
                CAPTION_FORMAT,
                "-o",
            ])
            .arg(template)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| anyhow!("{} timed out after {:?}", self.yt_dlp_path, limit))?,
            None => command.output().await,
        }
        .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        // Only the artifact's presence matters, not the exit status
        if !output.status.success() {
            tracing::debug!(
                "{} exited with {}: {}",
                self.yt_dlp_path,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl FallbackSource for YtDlpDownloader {
    async fn fetch_fallback(&self, url: &str, language: &str) -> Result<TranscriptResult> {
        let video_id = extract_video_id(url)?;

        let stem = Self::artifact_stem(video_id.as_str());
        let artifact = ArtifactGuard::new(
            self.work_dir
                .join(format!("{}.{}.{}", stem, language, CAPTION_FORMAT)),
        );
        let template = self.work_dir.join(format!("{}.%(ext)s", stem));

        self.run_downloader(url, language, &template).await?;

        if !artifact.path().exists() {
            tracing::info!("yt-dlp produced no {} captions for {}", language, video_id);
            return Ok(TranscriptResult::Absent);
        }

        let content = fs_err::read_to_string(artifact.path())
            .context("Failed to read caption artifact")?;
        let document = CaptionDocument::from_json(&content).with_context(|| {
            format!("Failed to parse caption artifact {}", artifact.path().display())
        })?;

        Ok(captions::first_fragment_text(&document))
    }
}
