use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use crate::ai::{generate_ai_titles_for_user, LlmClient};
use crate::config::PipelineConfig;
use crate::db::Repository;
use crate::feed::{fetch_recent_uploads, is_short_form, FeedSource};
use crate::models::{CandidateVideo, UsageMetric};
use crate::schedule::video_time_window;

use super::jobs::BackgroundJobs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestOutcome {
    pub success: bool,
    pub video_count: usize,
    pub duration_seconds: u64,
}

/// Rebuilds a user's video list from their subscriptions' feeds.
pub struct VideoAggregator {
    repository: Repository,
    feeds: Arc<dyn FeedSource>,
    llm: Arc<dyn LlmClient>,
    jobs: Arc<BackgroundJobs>,
    config: PipelineConfig,
}

impl VideoAggregator {
    pub fn new(
        repository: Repository,
        feeds: Arc<dyn FeedSource>,
        llm: Arc<dyn LlmClient>,
        jobs: Arc<BackgroundJobs>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repository,
            feeds,
            llm,
            jobs,
            config,
        }
    }

    /// Replaces yesterday's videos with the last day of uploads. Never fails
    /// loudly: storage trouble is reported as `success: false`.
    pub async fn generate_digest(&self, user_id: &str, timezone: Option<&str>) -> DigestOutcome {
        let started = Instant::now();
        let failed = || DigestOutcome {
            success: false,
            video_count: 0,
            duration_seconds: started.elapsed().as_secs(),
        };

        match self.repository.delete_user_videos(user_id).await {
            Ok(deleted) => tracing::debug!("Cleared {} previous videos for {}", deleted, user_id),
            Err(e) => {
                tracing::error!("Failed to clear videos for {}: {}", user_id, e);
                return failed();
            }
        }

        let subscriptions = match self.repository.get_user_subscriptions(user_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::error!("Failed to load subscriptions for {}: {}", user_id, e);
                return failed();
            }
        };

        if subscriptions.is_empty() {
            tracing::info!("No subscriptions for user {}", user_id);
            let duration_seconds = started.elapsed().as_secs();
            let metric = UsageMetric {
                user_id: user_id.to_string(),
                date: Utc::now().date_naive(),
                total_videos: 0,
                total_summaries: 0,
                summary_model: "none".to_string(),
                duration_seconds,
            };
            if let Err(e) = self.repository.record_usage(metric).await {
                tracing::warn!("Failed to record usage for {}: {}", user_id, e);
            }
            return DigestOutcome {
                success: true,
                video_count: 0,
                duration_seconds,
            };
        }

        let window_start = video_time_window(timezone, Utc::now());
        tracing::debug!("Collecting uploads since {} for {}", window_start, user_id);

        let mut collected: Vec<CandidateVideo> = Vec::new();
        for subscription in &subscriptions {
            let uploads = fetch_recent_uploads(self.feeds.as_ref(), &subscription.id).await;
            let total = uploads.len();
            let recent: Vec<CandidateVideo> = uploads
                .into_iter()
                .filter(|v| v.published_at >= window_start)
                .filter(|v| {
                    let short = is_short_form(&v.title, &v.description);
                    if short {
                        tracing::debug!("Skipping short-form upload {:?}", v.title);
                    }
                    !short
                })
                .map(|mut v| {
                    v.channel_id = subscription.id.clone();
                    v
                })
                .collect();
            tracing::debug!(
                "{}: {} of {} uploads are recent full-length videos",
                subscription.title,
                recent.len(),
                total
            );
            collected.extend(recent);
        }

        let video_count = if collected.is_empty() {
            tracing::info!("No new videos for user {}", user_id);
            0
        } else {
            match self.repository.upsert_videos(user_id, collected).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!("Failed to store videos for {}: {}", user_id, e);
                    return failed();
                }
            }
        };

        if video_count > 0 && self.config.ai_titles {
            let job = generate_ai_titles_for_user(
                self.repository.clone(),
                Arc::clone(&self.llm),
                user_id.to_string(),
                Duration::from_millis(self.config.ai_title_pause_ms),
            );
            self.jobs.spawn(format!("headlines for {user_id}"), job).await;
        }

        if let Err(e) = self.repository.update_last_digest(user_id, Utc::now()).await {
            tracing::warn!("Failed to update last digest time for {}: {}", user_id, e);
        }

        let duration_seconds = started.elapsed().as_secs();
        tracing::info!(
            "Digest for user {}: {} videos in {}s",
            user_id,
            video_count,
            duration_seconds
        );
        DigestOutcome {
            success: true,
            video_count,
            duration_seconds,
        }
    }
}
