use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use url::Url;

use crate::error::Result;
use crate::models::CandidateVideo;

use super::FeedSource;

const CHANNEL_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";
const VIDEO_ID_PREFIX: &str = "yt:video:";

pub struct ChannelFeedFetcher {
    client: Client,
}

impl ChannelFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("tube-digest/1.0")
            .build()?;

        Ok(Self { client })
    }

    fn feed_url(channel_id: &str) -> Result<Url> {
        Url::parse_with_params(CHANNEL_FEED_URL, &[("channel_id", channel_id)])
            .map_err(|e| anyhow::anyhow!("Invalid feed URL for {}: {}", channel_id, e).into())
    }
}

#[async_trait]
impl FeedSource for ChannelFeedFetcher {
    async fn fetch_feed(&self, channel_id: &str) -> Result<Vec<CandidateVideo>> {
        let url = Self::feed_url(channel_id)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let videos = parse_channel_feed(channel_id, &bytes)?;
        tracing::debug!("Fetched {} uploads from channel {}", videos.len(), channel_id);

        Ok(videos)
    }
}

/// Turn a channel's Atom feed into candidates, skipping entries without an
/// id, title or publish time.
pub fn parse_channel_feed(channel_id: &str, bytes: &[u8]) -> Result<Vec<CandidateVideo>> {
    let feed = parser::parse(bytes)?;

    let videos = feed
        .entries
        .into_iter()
        .filter_map(|entry| candidate_from_entry(channel_id, entry))
        .collect();

    Ok(videos)
}

fn candidate_from_entry(channel_id: &str, entry: Entry) -> Option<CandidateVideo> {
    let id = entry
        .id
        .strip_prefix(VIDEO_ID_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty())?
        .to_string();

    let title = entry
        .title
        .map(|t| decode_text(&t.content))
        .filter(|t| !t.is_empty())?;

    let published_at = entry.published?;

    let media = entry.media.first();
    let description = media
        .and_then(|m| m.description.as_ref())
        .map(|d| decode_text(&d.content))
        .or_else(|| entry.summary.map(|s| decode_text(&s.content)))
        .unwrap_or_default();
    let thumbnail_url = media
        .and_then(|m| m.thumbnails.first())
        .map(|t| t.image.uri.clone())
        .unwrap_or_default();
    let views = media
        .and_then(|m| m.community.as_ref())
        .and_then(|c| c.stats_views);
    let duration_seconds = media.and_then(|m| m.duration).map(|d| d.as_secs());

    Some(CandidateVideo {
        id,
        channel_id: channel_id.to_string(),
        title,
        description,
        published_at,
        thumbnail_url,
        views,
        duration_seconds,
    })
}

/// Feed text is sometimes entity-encoded twice; decode what is left after XML parsing.
fn decode_text(text: &str) -> String {
    html_escape::decode_html_entities(text.trim()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <id>yt:channel:UC123</id>
 <title>Rust Weekly</title>
 <entry>
  <id>yt:video:abc123</id>
  <yt:videoId>abc123</yt:videoId>
  <title>Borrowing &amp;amp; lifetimes</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=abc123"/>
  <published>2026-10-15T10:00:00+00:00</published>
  <updated>2026-10-15T11:00:00+00:00</updated>
  <media:group>
   <media:title>Borrowing &amp; lifetimes</media:title>
   <media:thumbnail url="https://i.ytimg.com/vi/abc123/hqdefault.jpg" width="480" height="360"/>
   <media:description>We walk through &amp;quot;borrowck&amp;quot; errors.</media:description>
   <media:community>
    <media:starRating count="10" average="5.00" min="1" max="5"/>
    <media:statistics views="1234"/>
   </media:community>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:notitle</id>
  <published>2026-10-15T09:00:00+00:00</published>
 </entry>
 <entry>
  <id>yt:video:nodate</id>
  <title>No publish date</title>
 </entry>
 <entry>
  <title>No id at all</title>
  <published>2026-10-15T08:00:00+00:00</published>
 </entry>
</feed>"#;

    #[test]
    fn keeps_complete_entries_only() {
        let videos = parse_channel_feed("UC123", FEED.as_bytes()).unwrap();
        assert_eq!(videos.len(), 1);

        let video = &videos[0];
        assert_eq!(video.id, "abc123");
        assert_eq!(video.channel_id, "UC123");
        assert_eq!(video.title, "Borrowing & lifetimes");
        assert_eq!(video.description, "We walk through \"borrowck\" errors.");
        assert_eq!(video.published_at, Utc.with_ymd_and_hms(2026, 10, 15, 10, 0, 0).unwrap());
        assert_eq!(video.thumbnail_url, "https://i.ytimg.com/vi/abc123/hqdefault.jpg");
        assert_eq!(video.views, Some(1234));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(parse_channel_feed("UC123", b"<html>not a feed").is_err());
    }

    #[test]
    fn feed_url_carries_channel_id() {
        let url = ChannelFeedFetcher::feed_url("UC_x-1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC_x-1"
        );
    }
}
