use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SummaryStatus;

/// Stored in place of a transcript once retrieval has given up on a video.
pub const TRANSCRIPT_UNAVAILABLE: &str = "UNAVAILABLE";

/// An upload taken from a channel feed, before it is stored for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: String,
    pub views: Option<u64>,
    pub duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TranscriptState {
    #[default]
    Pending,
    Fetched(String),
    Unavailable,
}

impl TranscriptState {
    pub fn from_column(value: Option<String>) -> Self {
        match value {
            None => TranscriptState::Pending,
            Some(s) if s == TRANSCRIPT_UNAVAILABLE => TranscriptState::Unavailable,
            Some(s) => TranscriptState::Fetched(s),
        }
    }

    pub fn to_column(&self) -> Option<String> {
        match self {
            TranscriptState::Pending => None,
            TranscriptState::Fetched(text) => Some(text.clone()),
            TranscriptState::Unavailable => Some(TRANSCRIPT_UNAVAILABLE.to_string()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TranscriptState::Fetched(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TranscriptState::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct Video {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: String,
    pub views: Option<u64>,
    pub duration_seconds: Option<u64>,
    pub transcript: TranscriptState,
    pub summary: Option<String>,
    pub summary_status: Option<SummaryStatus>,
    pub ai_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A summarized video with its channel, as fed to highlight synthesis.
#[derive(Debug, Clone)]
pub struct SummarizedVideo {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub channel_title: String,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_sentinel_maps_to_unavailable() {
        assert_eq!(TranscriptState::from_column(None), TranscriptState::Pending);
        assert_eq!(
            TranscriptState::from_column(Some(TRANSCRIPT_UNAVAILABLE.to_string())),
            TranscriptState::Unavailable
        );
        let fetched = TranscriptState::from_column(Some("hello".to_string()));
        assert_eq!(fetched.text(), Some("hello"));
        assert_eq!(TranscriptState::Unavailable.to_column().as_deref(), Some("UNAVAILABLE"));
    }
}
