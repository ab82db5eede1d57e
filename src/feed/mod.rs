mod fetcher;
mod shorts;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CandidateVideo;

pub use fetcher::{parse_channel_feed, ChannelFeedFetcher};
pub use shorts::is_short_form;

/// Source of a channel's recent uploads.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, channel_id: &str) -> Result<Vec<CandidateVideo>>;
}

/// Recent uploads for one channel. Any failure is logged and yields an empty list.
pub async fn fetch_recent_uploads(source: &dyn FeedSource, channel_id: &str) -> Vec<CandidateVideo> {
    match source.fetch_feed(channel_id).await {
        Ok(videos) => videos,
        Err(e) => {
            tracing::warn!("Failed to fetch feed for channel {}: {}", channel_id, e);
            Vec::new()
        }
    }
}
