use std::collections::HashMap;

use serde::Serialize;

use super::{SummaryStatus, Video};

#[derive(Debug, Clone, Serialize)]
pub struct DigestVideo {
    pub id: String,
    pub channel_id: String,
    pub channel_title: String,
    pub channel_thumbnail: String,
    pub category: String,
    pub title: String,
    pub ai_title: Option<String>,
    pub description: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub thumbnail_url: String,
    pub summary: Option<String>,
    pub summary_status: Option<SummaryStatus>,
}

impl DigestVideo {
    pub fn from_video(video: Video, channel_title: String, channel_thumbnail: String, category: String) -> Self {
        Self {
            id: video.id,
            channel_id: video.channel_id,
            channel_title,
            channel_thumbnail,
            category,
            title: video.title,
            ai_title: video.ai_title,
            description: video.description,
            published_at: video.published_at,
            thumbnail_url: video.thumbnail_url,
            summary: video.summary,
            summary_status: video.summary_status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestCategory {
    pub category: String,
    pub videos: Vec<DigestVideo>,
}

/// A user's current digest, grouped the way it is presented.
#[derive(Debug, Clone, Serialize)]
pub struct DigestView {
    pub total_videos: usize,
    pub categories: Vec<DigestCategory>,
}

impl DigestView {
    /// Largest categories first; inside a category, summarized videos first, then newest.
    pub fn group(videos: Vec<DigestVideo>) -> Self {
        let total_videos = videos.len();
        let mut by_category: HashMap<String, Vec<DigestVideo>> = HashMap::new();
        for video in videos {
            by_category.entry(video.category.clone()).or_default().push(video);
        }

        let mut categories: Vec<DigestCategory> = by_category
            .into_iter()
            .map(|(category, mut videos)| {
                videos.sort_by(|a, b| {
                    b.summary
                        .is_some()
                        .cmp(&a.summary.is_some())
                        .then_with(|| b.published_at.cmp(&a.published_at))
                });
                DigestCategory { category, videos }
            })
            .collect();

        categories.sort_by(|a, b| {
            b.videos
                .len()
                .cmp(&a.videos.len())
                .then_with(|| a.category.cmp(&b.category))
        });

        Self {
            total_videos,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn video(id: &str, category: &str, hour: u32, summary: Option<&str>) -> DigestVideo {
        DigestVideo {
            id: id.to_string(),
            channel_id: "c".to_string(),
            channel_title: "Channel".to_string(),
            channel_thumbnail: String::new(),
            category: category.to_string(),
            title: id.to_string(),
            ai_title: None,
            description: String::new(),
            published_at: Some(Utc.with_ymd_and_hms(2026, 10, 15, hour, 0, 0).unwrap()),
            thumbnail_url: String::new(),
            summary: summary.map(str::to_string),
            summary_status: None,
        }
    }

    #[test]
    fn groups_by_size_then_summary_then_recency() {
        let view = DigestView::group(vec![
            video("news-1", "News", 9, None),
            video("tech-old", "Technology", 8, Some("s")),
            video("tech-new", "Technology", 12, None),
            video("tech-mid", "Technology", 10, Some("s")),
        ]);

        assert_eq!(view.total_videos, 4);
        assert_eq!(view.categories[0].category, "Technology");
        let ids: Vec<_> = view.categories[0].videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["tech-mid", "tech-old", "tech-new"]);
        assert_eq!(view.categories[1].category, "News");
    }
}
