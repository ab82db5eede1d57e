use std::time::Duration;

use futures::future::join_all;

use crate::config::PipelineConfig;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{TranscriptState, Video};
use crate::transcript::TranscriptRetriever;

/// Fills in transcripts for a user's freshly aggregated videos.
pub struct TranscriptStage {
    repository: Repository,
    retriever: TranscriptRetriever,
    batch_size: usize,
    batch_pause: Duration,
}

impl TranscriptStage {
    pub fn new(repository: Repository, retriever: TranscriptRetriever, config: &PipelineConfig) -> Self {
        Self {
            repository,
            retriever,
            batch_size: config.transcript_batch_size.max(1),
            batch_pause: Duration::from_millis(config.transcript_batch_pause_ms),
        }
    }

    /// Looks up every pending transcript, a group at a time. Videos without
    /// one are marked unavailable so they are not looked up again. Returns
    /// how many transcripts were found.
    pub async fn fetch_transcripts_for_user(&self, user_id: &str) -> Result<usize> {
        let videos = self.repository.videos_pending_transcript(user_id).await?;
        if videos.is_empty() {
            tracing::debug!("No pending transcripts for {}", user_id);
            return Ok(0);
        }
        tracing::info!("Fetching transcripts for {} videos of {}", videos.len(), user_id);

        let mut fetched = 0;
        for (index, group) in videos.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }

            let lookups = group.iter().map(|video| async move {
                let transcript = self.retriever.fetch_with_retry(&video.id).await;
                (video, transcript)
            });

            for (video, transcript) in join_all(lookups).await {
                if self.store(user_id, video, transcript).await? {
                    fetched += 1;
                }
            }
        }

        tracing::info!("Fetched {}/{} transcripts for {}", fetched, videos.len(), user_id);
        Ok(fetched)
    }

    async fn store(&self, user_id: &str, video: &Video, transcript: Option<String>) -> Result<bool> {
        match transcript {
            Some(text) => {
                self.repository
                    .update_transcript(user_id, &video.id, TranscriptState::Fetched(text))
                    .await?;
                Ok(true)
            }
            None => {
                self.repository
                    .update_transcript(user_id, &video.id, TranscriptState::Unavailable)
                    .await?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CandidateVideo, SummaryStatus, User};
    use crate::transcript::TranscriptSource;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// `bad` fails on every attempt, `good` answers straight away.
    #[derive(Default)]
    struct HalfBroken {
        bad_calls: AtomicU32,
    }

    #[async_trait]
    impl TranscriptSource for HalfBroken {
        async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>> {
            if video_id == "bad" {
                self.bad_calls.fetch_add(1, Ordering::SeqCst);
                return Err(AppError::Transcript("connection reset".into()));
            }
            Ok(Some("hello world".to_string()))
        }
    }

    async fn repo_with_videos(ids: &[&str]) -> Repository {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_user(User {
            id: "u1".into(),
            email: "u1@example.com".into(),
            timezone: "UTC".into(),
            last_digest_at: None,
        })
        .await
        .unwrap();
        let videos = ids
            .iter()
            .map(|id| CandidateVideo {
                id: id.to_string(),
                channel_id: "UC1".into(),
                title: format!("Video {id}"),
                description: String::new(),
                published_at: Utc::now(),
                thumbnail_url: String::new(),
                views: None,
                duration_seconds: None,
            })
            .collect();
        repo.upsert_videos("u1", videos).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn failing_video_does_not_block_its_group() {
        let repo = repo_with_videos(&["bad", "good"]).await;
        let source = Arc::new(HalfBroken::default());
        let retriever = TranscriptRetriever::new(source.clone(), 3, Duration::ZERO);
        let stage = TranscriptStage::new(repo.clone(), retriever, &PipelineConfig::without_pauses());

        assert_eq!(stage.fetch_transcripts_for_user("u1").await.unwrap(), 1);
        assert_eq!(source.bad_calls.load(Ordering::SeqCst), 3);

        let videos: HashMap<String, Video> = repo
            .get_user_videos("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        assert_eq!(videos["good"].transcript, TranscriptState::Fetched("hello world".into()));
        assert_eq!(videos["good"].summary_status, Some(SummaryStatus::Processing));
        assert_eq!(videos["bad"].transcript, TranscriptState::Unavailable);
        assert_eq!(videos["bad"].summary_status, Some(SummaryStatus::TranscriptMissing));
        let stats = repo.daily_stats(Utc::now().date_naive()).await.unwrap();
        assert!(stats.errors_by_type.is_empty());

        // the unavailable marker keeps the video out of later lookups
        assert_eq!(stage.fetch_transcripts_for_user("u1").await.unwrap(), 0);
        assert_eq!(source.bad_calls.load(Ordering::SeqCst), 3);
    }
}
