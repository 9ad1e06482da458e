use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::captions::CaptionDocument;
use super::{PrimarySource, TranscriptResult};
use crate::config::TranscriptConfig;
use crate::video::VideoId;
use crate::Result;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const YOUTUBE_REFERER: &str = "https://www.youtube.com/";

/// Reasons the captions service could not produce a transcript
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("Transcripts are disabled for video {0}")]
    CaptionsDisabled(String),

    #[error("No transcript found for video {video_id} in language '{language}'")]
    NoTranscriptFound { video_id: String, language: String },

    #[error("Caption request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid caption response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid caption track URL: {0}")]
    TrackUrl(#[from] url::ParseError),
}

/// Remote lookup of the ordered caption segments for a video
#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn fetch_captions(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> std::result::Result<Vec<String>, CaptionError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_asr(&self) -> bool {
        self.kind.as_deref() == Some("asr") || self.base_url.contains("kind=asr")
    }
}

/// Captions service backed by YouTube's innertube player endpoint
pub struct YoutubeCaptionService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    client_version: String,
}

impl YoutubeCaptionService {
    pub fn new(config: &TranscriptConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to build captions HTTP client")?;

        Ok(Self {
            client,
            base_url: config.innertube_base_url.trim_end_matches('/').to_string(),
            api_key: config.innertube_api_key.clone(),
            client_version: config.innertube_client_version.clone(),
        })
    }

    async fn caption_tracks(
        &self,
        video_id: &VideoId,
    ) -> std::result::Result<Vec<CaptionTrack>, CaptionError> {
        let player_url = format!("{}/youtubei/v1/player", self.base_url);
        tracing::debug!("Requesting caption tracks for {}", video_id);

        let body = self
            .client
            .post(&player_url)
            .query(&[("key", self.api_key.as_str())])
            .header("Referer", YOUTUBE_REFERER)
            .json(&serde_json::json!({
                "context": {
                    "client": {
                        "clientName": "WEB",
                        "clientVersion": self.client_version,
                    }
                },
                "videoId": video_id.as_str(),
            }))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let player: PlayerResponse = serde_json::from_str(&body)?;

        player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks)
            .filter(|tracks| !tracks.is_empty())
            .ok_or_else(|| CaptionError::CaptionsDisabled(video_id.to_string()))
    }

    /// Prefer a manual track, then punctuated ASR, then plain ASR
    fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
        let matching = move || tracks.iter().filter(move |t| t.language_code == language);

        matching()
            .find(|t| !t.is_asr())
            .or_else(|| matching().find(|t| t.base_url.contains("variant=punctuated")))
            .or_else(|| matching().next())
    }

    fn json3_url(base_url: &str) -> std::result::Result<Url, url::ParseError> {
        let mut url = Url::parse(&base_url.replace("\\u0026", "&"))?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");

        Ok(url)
    }
}

#[async_trait]
impl CaptionService for YoutubeCaptionService {
    async fn fetch_captions(
        &self,
        video_id: &VideoId,
        language: &str,
    ) -> std::result::Result<Vec<String>, CaptionError> {
        let tracks = self.caption_tracks(video_id).await?;

        let track = Self::select_track(&tracks, language).ok_or_else(|| {
            CaptionError::NoTranscriptFound {
                video_id: video_id.to_string(),
                language: language.to_string(),
            }
        })?;

        let url = Self::json3_url(&track.base_url)?;
        let kind = if track.is_asr() { "asr" } else { "manual" };
        tracing::debug!("Fetching {} caption track ({})", track.language_code, kind);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let document = CaptionDocument::from_json(&body)?;
        Ok(document.event_texts())
    }
}

/// Primary fetch path.
///
/// Every service failure collapses into `Absent` so the caller falls back
/// uniformly. The real cause is logged.
pub struct PrimaryFetcher<S> {
    service: S,
}

impl<S: CaptionService> PrimaryFetcher<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S: CaptionService> PrimarySource for PrimaryFetcher<S> {
    async fn fetch_primary(&self, video_id: &VideoId, language: &str) -> Result<TranscriptResult> {
        match self.service.fetch_captions(video_id, language).await {
            Ok(segments) => Ok(TranscriptResult::from_segments(segments)),
            Err(e) => {
                tracing::warn!("Captions service unavailable for {}: {}", video_id, e);
                Ok(TranscriptResult::Absent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::extract_video_id;
    use httpmock::prelude::*;
    use serde_json::json;

    fn video_id() -> VideoId {
        extract_video_id("https://www.youtube.com/watch?v=abc123").unwrap()
    }

    fn service(server: &MockServer) -> YoutubeCaptionService {
        let config = TranscriptConfig {
            innertube_base_url: server.base_url(),
            innertube_api_key: "test-key".to_string(),
            request_timeout_secs: Some(5),
            ..TranscriptConfig::default()
        };
        YoutubeCaptionService::new(&config).unwrap()
    }

    fn track(base_url: &str, lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: base_url.to_string(),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    struct StubService(fn() -> std::result::Result<Vec<String>, CaptionError>);

    #[async_trait]
    impl CaptionService for StubService {
        async fn fetch_captions(
            &self,
            _video_id: &VideoId,
            _language: &str,
        ) -> std::result::Result<Vec<String>, CaptionError> {
            (self.0)()
        }
    }

    #[test]
    fn test_select_track_prefers_manual() {
        let tracks = vec![
            track("https://x/t?kind=asr&lang=en", "en", Some("asr")),
            track("https://x/t?lang=de", "de", None),
            track("https://x/t?lang=en", "en", None),
        ];
        let chosen = YoutubeCaptionService::select_track(&tracks, "en").unwrap();
        assert_eq!(chosen.base_url, "https://x/t?lang=en");
    }

    #[test]
    fn test_select_track_falls_back_to_asr() {
        let tracks = vec![
            track("https://x/t?kind=asr&lang=en", "en", Some("asr")),
            track("https://x/t?kind=asr&lang=en&variant=punctuated", "en", Some("asr")),
        ];
        let chosen = YoutubeCaptionService::select_track(&tracks, "en").unwrap();
        assert!(chosen.base_url.contains("variant=punctuated"));

        assert!(YoutubeCaptionService::select_track(&tracks, "fr").is_none());
    }

    #[test]
    fn test_json3_url_replaces_format() {
        let url = YoutubeCaptionService::json3_url("https://www.youtube.com/api/timedtext?v=abc\\u0026lang=en\\u0026fmt=srv3").unwrap();
        let pairs: Vec<_> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(
            pairs,
            vec![
                ("v".to_string(), "abc".to_string()),
                ("lang".to_string(), "en".to_string()),
                ("fmt".to_string(), "json3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetches_captions_in_order() {
        let server = MockServer::start_async().await;
        let track_url = server.url("/api/timedtext?v=abc123&lang=en");

        let player = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/youtubei/v1/player")
                    .query_param("key", "test-key");
                then.status(200).json_body(json!({
                    "captions": {
                        "playerCaptionsTracklistRenderer": {
                            "captionTracks": [
                                {"baseUrl": track_url, "languageCode": "en"}
                            ]
                        }
                    }
                }));
            })
            .await;

        let timedtext = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/timedtext")
                    .query_param("lang", "en")
                    .query_param("fmt", "json3");
                then.status(200).json_body(json!({
                    "events": [
                        {"tStartMs": 0},
                        {"segs": [{"utf8": "Hello"}, {"utf8": " there"}]},
                        {"segs": [{"utf8": "\n"}]},
                        {"segs": [{"utf8": "world"}]}
                    ]
                }));
            })
            .await;

        let segments = service(&server)
            .fetch_captions(&video_id(), "en")
            .await
            .unwrap();

        player.assert_async().await;
        timedtext.assert_async().await;
        assert_eq!(segments, vec!["Hello there", "world"]);
    }

    #[tokio::test]
    async fn test_missing_captions_is_disabled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/youtubei/v1/player");
                then.status(200).json_body(json!({"videoDetails": {"title": "t"}}));
            })
            .await;

        let err = service(&server)
            .fetch_captions(&video_id(), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::CaptionsDisabled(_)));
    }

    #[tokio::test]
    async fn test_wrong_language_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/youtubei/v1/player");
                then.status(200).json_body(json!({
                    "captions": {
                        "playerCaptionsTracklistRenderer": {
                            "captionTracks": [{"baseUrl": "https://example.com/t?lang=de", "languageCode": "de"}]
                        }
                    }
                }));
            })
            .await;

        let err = service(&server)
            .fetch_captions(&video_id(), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::NoTranscriptFound { ref language, .. } if language == "en"));
    }

    #[tokio::test]
    async fn test_http_error_is_request_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/youtubei/v1/player");
                then.status(429);
            })
            .await;

        let err = service(&server)
            .fetch_captions(&video_id(), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::Request(_)));
    }

    #[tokio::test]
    async fn test_fetcher_joins_segments() {
        let fetcher = PrimaryFetcher::new(StubService(|| Ok(vec!["a".into(), "b".into()])));
        let result = fetcher.fetch_primary(&video_id(), "en").await.unwrap();
        assert_eq!(result, TranscriptResult::Text("a b".to_string()));
    }

    #[tokio::test]
    async fn test_fetcher_collapses_every_error_to_absent() {
        let disabled = PrimaryFetcher::new(StubService(|| {
            Err(CaptionError::CaptionsDisabled("abc123".into()))
        }));
        let not_found = PrimaryFetcher::new(StubService(|| {
            Err(CaptionError::NoTranscriptFound {
                video_id: "abc123".into(),
                language: "en".into(),
            })
        }));
        let parse = PrimaryFetcher::new(StubService(|| {
            Err(CaptionError::Parse(serde_json::from_str::<serde_json::Value>("{").unwrap_err()))
        }));
        let empty = PrimaryFetcher::new(StubService(|| Ok(Vec::new())));

        for fetcher in [disabled, not_found, parse, empty] {
            let result = fetcher.fetch_primary(&video_id(), "en").await.unwrap();
            assert!(result.is_absent());
        }
    }
}
