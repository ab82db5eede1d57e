use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::db::Repository;
use crate::models::{Highlight, SummarizedVideo};

use super::client::{CompletionRequest, LlmClient};
use super::prompts::{self, HighlightItem};

/// Writes the per-category editorial bullets from a user's summaries.
pub struct HighlightSynthesizer {
    repository: Repository,
    llm: Arc<dyn LlmClient>,
    video_limit: usize,
}

impl HighlightSynthesizer {
    pub fn new(repository: Repository, llm: Arc<dyn LlmClient>, video_limit: usize) -> Self {
        Self {
            repository,
            llm,
            video_limit: video_limit.max(1),
        }
    }

    /// One highlight per category that has summarized videos, in category
    /// name order. Categories whose call fails or comes back empty are left out.
    pub async fn generate_highlights(&self, user_id: &str) -> Vec<Highlight> {
        let videos = match self.repository.summarized_videos(user_id).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!("Failed to load summaries for highlights of {}: {}", user_id, e);
                return Vec::new();
            }
        };

        let mut by_category: BTreeMap<String, Vec<SummarizedVideo>> = BTreeMap::new();
        for video in videos {
            by_category.entry(video.category.clone()).or_default().push(video);
        }

        let mut highlights = Vec::new();
        for (category, videos) in by_category {
            if let Some(highlight) = self.category_highlight(&category, &videos).await {
                highlights.push(highlight);
            }
        }

        tracing::info!("Generated {} highlights for user {}", highlights.len(), user_id);
        highlights
    }

    async fn category_highlight(&self, category: &str, videos: &[SummarizedVideo]) -> Option<Highlight> {
        let videos = &videos[..videos.len().min(self.video_limit)];
        let items: Vec<HighlightItem<'_>> = videos
            .iter()
            .map(|v| HighlightItem {
                title: &v.title,
                channel: &v.channel_title,
                summary: &v.summary,
            })
            .collect();
        let prompt = prompts::highlight_prompt(category, prompts::category_emoji(category), &items);

        let response = match self.llm.complete(CompletionRequest::new(prompt, 0.1, 350)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Highlight call failed for category {}: {}", category, e);
                return None;
            }
        };
        let summary = response.trim();
        if summary.is_empty() {
            tracing::warn!("Empty highlight for category {}", category);
            return None;
        }

        Some(Highlight {
            title: category.to_string(),
            category: category.to_string(),
            summary: summary.to_string(),
            video_count: videos.len(),
            related_videos: videos.iter().map(|v| v.id.clone()).collect(),
        })
    }

    /// Saves today's highlights, replacing any stored earlier today.
    pub async fn store_highlights(&self, user_id: &str, highlights: &[Highlight]) -> bool {
        self.store_highlights_on(user_id, Utc::now().date_naive(), highlights)
            .await
    }

    pub async fn store_highlights_on(&self, user_id: &str, date: NaiveDate, highlights: &[Highlight]) -> bool {
        let json = match serde_json::to_string(highlights) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize highlights for {}: {}", user_id, e);
                return false;
            }
        };

        match self.repository.store_highlights_json(user_id, date, json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to store highlights for {}: {}", user_id, e);
                false
            }
        }
    }

    /// Today's highlights, or the most recent earlier day's when today has none.
    pub async fn stored_highlights(&self, user_id: &str, today: NaiveDate) -> Vec<Highlight> {
        load_highlights(&self.repository, user_id, today).await
    }
}

/// Reads stored highlights without needing an LLM, see
/// [`HighlightSynthesizer::stored_highlights`].
pub async fn load_highlights(repository: &Repository, user_id: &str, today: NaiveDate) -> Vec<Highlight> {
    let (day, json) = match repository.latest_highlights_json(user_id, today).await {
        Ok(Some(found)) => found,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::error!("Failed to load highlights for {}: {}", user_id, e);
            return Vec::new();
        }
    };

    if day != today {
        tracing::debug!("Using highlights from {} for {}", day, user_id);
    }
    serde_json::from_str(&json).unwrap_or_else(|e| {
        tracing::warn!("Stored highlights for {} on {} are unreadable: {}", user_id, day, e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{CandidateVideo, Subscription, SummaryStatus, User};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct CategoryEcho {
        fail_on: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for CategoryEcho {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if let Some(category) = self.fail_on {
                if request.prompt.contains(&format!("the {category} section")) {
                    return Err(AppError::LlmApi("boom".into()));
                }
            }
            Ok("• **Chan** did a thing".to_string())
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    async fn seeded_repo() -> Repository {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_user(User {
            id: "u1".into(),
            email: "u1@example.com".into(),
            timezone: "UTC".into(),
            last_digest_at: None,
        })
        .await
        .unwrap();
        repo.upsert_subscriptions(vec![
            Subscription {
                id: "tech".into(),
                user_id: "u1".into(),
                title: "Tech Chan".into(),
                thumbnail_url: String::new(),
                category: Some("Technology".into()),
            },
            Subscription {
                id: "misc".into(),
                user_id: "u1".into(),
                title: "Misc Chan".into(),
                thumbnail_url: String::new(),
                category: None,
            },
        ])
        .await
        .unwrap();

        let published = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let videos = [("t1", "tech"), ("t2", "tech"), ("m1", "misc"), ("m2", "misc")]
            .into_iter()
            .enumerate()
            .map(|(i, (id, channel))| CandidateVideo {
                id: id.into(),
                channel_id: channel.into(),
                title: format!("Video {id}"),
                description: String::new(),
                published_at: published - Duration::minutes(i as i64),
                thumbnail_url: String::new(),
                views: None,
                duration_seconds: None,
            })
            .collect();
        repo.upsert_videos("u1", videos).await.unwrap();

        for id in ["t1", "t2", "m1"] {
            repo.save_summary("u1", id, Some(format!("summary of {id}")), SummaryStatus::Success)
                .await
                .unwrap();
        }
        repo.save_summary("u1", "m2", None, SummaryStatus::LlmFailed)
            .await
            .unwrap();
        repo
    }

    fn echo(fail_on: Option<&'static str>) -> Arc<CategoryEcho> {
        Arc::new(CategoryEcho {
            fail_on,
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn one_highlight_per_category_with_sources() {
        let llm = echo(None);
        let synth = HighlightSynthesizer::new(seeded_repo().await, llm.clone(), 12);
        let highlights = synth.generate_highlights("u1").await;

        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].category, "Other");
        assert_eq!(highlights[0].related_videos, vec!["m1".to_string()]);
        assert_eq!(highlights[1].category, "Technology");
        assert_eq!(highlights[1].title, "Technology");
        assert_eq!(highlights[1].video_count, 2);
        assert_eq!(highlights[1].related_videos, vec!["t1".to_string(), "t2".to_string()]);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[1].contains("\"Video t1\" by Tech Chan: summary of t1"));
        assert!(!prompts.iter().any(|p| p.contains("m2")));
    }

    #[tokio::test]
    async fn failing_category_is_skipped() {
        let synth = HighlightSynthesizer::new(seeded_repo().await, echo(Some("Technology")), 12);
        let highlights = synth.generate_highlights("u1").await;
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].category, "Other");
    }

    #[tokio::test]
    async fn limit_caps_videos_per_category() {
        let synth = HighlightSynthesizer::new(seeded_repo().await, echo(None), 1);
        let highlights = synth.generate_highlights("u1").await;
        let tech = highlights.iter().find(|h| h.category == "Technology").unwrap();
        assert_eq!(tech.video_count, 1);
        assert_eq!(tech.related_videos, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn stored_highlights_fall_back_to_earlier_days() {
        let synth = HighlightSynthesizer::new(seeded_repo().await, echo(None), 12);
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let yesterday = today.pred_opt().unwrap();
        assert!(synth.stored_highlights("u1", today).await.is_empty());

        let highlights = synth.generate_highlights("u1").await;
        assert!(synth.store_highlights_on("u1", yesterday, &highlights).await);
        assert_eq!(synth.stored_highlights("u1", today).await, highlights);

        let replacement = vec![highlights[0].clone()];
        assert!(synth.store_highlights_on("u1", today, &highlights).await);
        assert!(synth.store_highlights_on("u1", today, &replacement).await);
        assert_eq!(synth.stored_highlights("u1", today).await, replacement);
        assert_eq!(synth.stored_highlights("u1", yesterday).await, highlights);
    }
}
