use serde::{Deserialize, Serialize};

/// Editorial digest for one category of a user's videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub title: String,
    pub category: String,
    /// Bullet points with markdown emphasis kept as-is.
    pub summary: String,
    pub video_count: usize,
    /// Ids of the videos the summary was written from, in prompt order.
    pub related_videos: Vec<String>,
}
