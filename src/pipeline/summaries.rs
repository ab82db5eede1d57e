use std::time::Duration;

use crate::ai::{Summarizer, SummaryOutcome, SummaryRequest};
use crate::config::PipelineConfig;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{SummaryError, SummaryErrorKind, SummaryStatus, Video};

impl From<&Video> for SummaryRequest {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            transcript: video.transcript.text().map(str::to_string),
            description: Some(video.description.clone()).filter(|d| !d.trim().is_empty()),
        }
    }
}

pub struct SummaryStage {
    repository: Repository,
    summarizer: Summarizer,
    group_size: usize,
    group_pause: Duration,
}

impl SummaryStage {
    pub fn new(repository: Repository, summarizer: Summarizer, config: &PipelineConfig) -> Self {
        Self {
            repository,
            summarizer,
            group_size: config.summary_group_size.max(1),
            group_pause: Duration::from_millis(config.summary_batch_pause_ms),
        }
    }

    pub fn model(&self) -> &str {
        self.summarizer.model()
    }

    /// Summarizes every video whose transcript lookup has finished and
    /// stores each outcome. Returns the number of successful summaries.
    pub async fn summarize_videos_for_user(&self, user_id: &str) -> Result<usize> {
        let videos = self.repository.videos_needing_summary(user_id).await?;
        if videos.is_empty() {
            tracing::debug!("Nothing to summarize for {}", user_id);
            return Ok(0);
        }
        tracing::info!("Summarizing {} videos for {}", videos.len(), user_id);

        let mut succeeded = 0;
        for (index, group) in videos.chunks(self.group_size).enumerate() {
            if index > 0 && !self.group_pause.is_zero() {
                tokio::time::sleep(self.group_pause).await;
            }

            let requests = group.iter().map(SummaryRequest::from).collect();
            for (video_id, outcome) in self.summarizer.summarize_with_fallback(requests).await {
                if self.store(user_id, &video_id, outcome).await? {
                    succeeded += 1;
                }
            }
        }

        tracing::info!("Summarized {}/{} videos for {}", succeeded, videos.len(), user_id);
        Ok(succeeded)
    }

    async fn store(&self, user_id: &str, video_id: &str, outcome: SummaryOutcome) -> Result<bool> {
        match outcome {
            SummaryOutcome::Summary(summary) => {
                self.repository
                    .save_summary(user_id, video_id, Some(summary), SummaryStatus::Success)
                    .await?;
                Ok(true)
            }
            SummaryOutcome::TranscriptMissing => {
                self.repository
                    .save_summary(user_id, video_id, None, SummaryStatus::TranscriptMissing)
                    .await?;
                self.record_error(
                    user_id,
                    video_id,
                    SummaryErrorKind::TranscriptMissing,
                    "No transcript or description to summarize".to_string(),
                )
                .await;
                Ok(false)
            }
            SummaryOutcome::LlmFailed { kind, reason } => {
                self.repository
                    .save_summary(user_id, video_id, None, SummaryStatus::LlmFailed)
                    .await?;
                self.record_error(user_id, video_id, kind, reason).await;
                Ok(false)
            }
        }
    }

    async fn record_error(&self, user_id: &str, video_id: &str, kind: SummaryErrorKind, message: String) {
        let error = SummaryError {
            video_id: video_id.to_string(),
            user_id: user_id.to_string(),
            kind,
            message,
        };
        if let Err(e) = self.repository.record_summary_error(error).await {
            tracing::warn!("Failed to record summary error for {}: {}", video_id, e);
        }
    }
}
