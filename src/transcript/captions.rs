use serde::Deserialize;

use super::TranscriptResult;

/// Caption document in YouTube's `json3` format
#[derive(Debug, Deserialize)]
pub struct CaptionDocument {
    pub events: Vec<CaptionEvent>,
}

/// One timed entry. Window and style events carry no `segs`.
#[derive(Debug, Deserialize)]
pub struct CaptionEvent {
    #[serde(default)]
    pub segs: Option<Vec<CaptionFragment>>,
}

#[derive(Debug, Deserialize)]
pub struct CaptionFragment {
    #[serde(default)]
    pub utf8: String,
}

impl CaptionDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// First fragment of every event that has fragments, in document order.
    ///
    /// This is the reconstruction used for downloaded caption files, where
    /// auto-generated captions put the whole utterance in the first fragment.
    pub fn first_fragments(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| event.segs.as_deref())
            .filter_map(|segs| segs.first())
            .map(|seg| seg.utf8.as_str())
            .collect()
    }

    /// Full text of each event (all fragments concatenated), skipping events
    /// that are blank after trimming.
    pub fn event_texts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.segs.as_deref())
            .map(|segs| {
                segs.iter()
                    .map(|seg| seg.utf8.as_str())
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Join the first fragments of a document into a transcript
pub fn first_fragment_text(doc: &CaptionDocument) -> TranscriptResult {
    TranscriptResult::from_segments(doc.first_fragments())
}
