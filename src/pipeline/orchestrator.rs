use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;

use crate::ai::{HighlightSynthesizer, LlmClient, Summarizer, SummarizerSettings};
use crate::config::PipelineConfig;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedSource;
use crate::models::{UsageMetric, User};
use crate::schedule::{format_user_time, should_run};
use crate::transcript::{TranscriptRetriever, TranscriptSource};

use super::aggregator::{DigestOutcome, VideoAggregator};
use super::jobs::BackgroundJobs;
use super::summaries::SummaryStage;
use super::transcripts::TranscriptStage;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_users: usize,
    pub eligible_users: usize,
    pub processed_users: usize,
    pub skipped_users: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightsReport {
    pub total_users: usize,
    pub processed_users: usize,
    pub highlights_generated: usize,
    pub errors: Vec<String>,
}

/// What one user's run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRun {
    pub user_id: String,
    pub video_count: usize,
    pub transcripts: usize,
    pub summaries: usize,
    pub highlights: usize,
    pub duration_seconds: u64,
}

/// Runs the daily pipeline for every user: aggregate, transcribe, summarize,
/// write highlights, record usage.
pub struct DigestOrchestrator {
    repository: Repository,
    aggregator: VideoAggregator,
    transcripts: TranscriptStage,
    summaries: SummaryStage,
    highlights: HighlightSynthesizer,
    jobs: Arc<BackgroundJobs>,
}

impl DigestOrchestrator {
    pub fn new(
        repository: Repository,
        feeds: Arc<dyn FeedSource>,
        transcripts: Arc<dyn TranscriptSource>,
        llm: Arc<dyn LlmClient>,
        config: &PipelineConfig,
    ) -> Self {
        let jobs = Arc::new(BackgroundJobs::new(config.background_job_limit));
        let retriever = TranscriptRetriever::new(
            transcripts,
            config.transcript_max_attempts,
            Duration::from_millis(config.transcript_retry_base_ms),
        );
        let summarizer = Summarizer::new(Arc::clone(&llm), SummarizerSettings::from(config));

        Self {
            aggregator: VideoAggregator::new(
                repository.clone(),
                feeds,
                Arc::clone(&llm),
                Arc::clone(&jobs),
                config.clone(),
            ),
            transcripts: TranscriptStage::new(repository.clone(), retriever, config),
            summaries: SummaryStage::new(repository.clone(), summarizer, config),
            highlights: HighlightSynthesizer::new(repository.clone(), llm, config.highlight_video_limit),
            repository,
            jobs,
        }
    }

    pub fn aggregator(&self) -> &VideoAggregator {
        &self.aggregator
    }

    pub fn highlights(&self) -> &HighlightSynthesizer {
        &self.highlights
    }

    /// Every user gets a run unless `timezone_aware` is set and they had one
    /// recently. Only failing to list the users is an error; anything that
    /// goes wrong for one user is recorded in the report.
    pub async fn run_digest_for_all_users(&self, timezone_aware: bool) -> Result<BatchReport> {
        let users = self.repository.get_all_users().await?;
        let mut report = BatchReport {
            total_users: users.len(),
            ..BatchReport::default()
        };
        tracing::info!("Starting digest run for {} users", users.len());

        for user in &users {
            let now = Utc::now();
            if timezone_aware && !should_run(user.last_digest_at, &user.timezone, now) {
                tracing::info!("Skipping {}: digest already sent recently", user.email);
                report.skipped_users += 1;
                continue;
            }

            report.eligible_users += 1;
            tracing::info!(
                "Processing {} at {}",
                user.email,
                format_user_time(&user.timezone, now)
            );

            match self.guarded_run(user).await {
                Ok(run) => {
                    tracing::info!(
                        "Completed {}: {} videos, {} summaries, {} highlights",
                        user.email,
                        run.video_count,
                        run.summaries,
                        run.highlights
                    );
                    report.processed_users += 1;
                }
                Err(message) => {
                    tracing::error!("{}", message);
                    report.errors.push(message);
                }
            }
        }

        self.finish_background_jobs().await;

        tracing::info!(
            "Digest run finished: {}/{} eligible users processed ({} skipped, {} total, {} errors)",
            report.processed_users,
            report.eligible_users,
            report.skipped_users,
            report.total_users,
            report.errors.len()
        );
        Ok(report)
    }

    /// Forced run for one user, ignoring when they last had a digest.
    pub async fn run_for_user(&self, user_id: &str) -> Result<UserRun> {
        let user = self
            .repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Other(anyhow::anyhow!("Unknown user: {user_id}")))?;

        let result = self.process_user(&user).await;
        self.finish_background_jobs().await;
        result
    }

    /// Rewrites today's highlights for every user from their current summaries.
    pub async fn run_highlights_for_all_users(&self) -> Result<HighlightsReport> {
        let users = self.repository.get_all_users().await?;
        let mut report = HighlightsReport {
            total_users: users.len(),
            ..HighlightsReport::default()
        };

        for user in &users {
            let highlights = self.highlights.generate_highlights(&user.id).await;
            if highlights.is_empty() {
                tracing::info!("No highlights for {}", user.email);
            } else if self.highlights.store_highlights(&user.id, &highlights).await {
                report.highlights_generated += highlights.len();
            } else {
                report
                    .errors
                    .push(format!("{}: failed to store highlights", user.email));
                continue;
            }
            report.processed_users += 1;
        }

        tracing::info!(
            "Highlights refresh: {}/{} users, {} highlights",
            report.processed_users,
            report.total_users,
            report.highlights_generated
        );
        Ok(report)
    }

    /// `process_user` with errors and panics turned into a report line.
    async fn guarded_run(&self, user: &User) -> std::result::Result<UserRun, String> {
        match AssertUnwindSafe(self.process_user(user)).catch_unwind().await {
            Ok(Ok(run)) => Ok(run),
            Ok(Err(e)) => Err(format!("{}: {}", user.email, e)),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(format!("{}: panicked: {}", user.email, message))
            }
        }
    }

    async fn process_user(&self, user: &User) -> Result<UserRun> {
        let started = Instant::now();

        let DigestOutcome {
            success,
            video_count,
            ..
        } = self
            .aggregator
            .generate_digest(&user.id, Some(user.timezone.as_str()))
            .await;
        if !success {
            return Err(anyhow::anyhow!("digest generation failed").into());
        }

        let transcripts = self.transcripts.fetch_transcripts_for_user(&user.id).await?;
        let summaries = self.summaries.summarize_videos_for_user(&user.id).await?;

        let highlights = self.highlights.generate_highlights(&user.id).await;
        if !highlights.is_empty() && !self.highlights.store_highlights(&user.id, &highlights).await {
            tracing::warn!("Highlights for {} were generated but not stored", user.email);
        }

        let duration_seconds = started.elapsed().as_secs();
        let summary_model = if summaries > 0 {
            self.summaries.model().to_string()
        } else {
            "none".to_string()
        };
        self.repository
            .record_usage(UsageMetric {
                user_id: user.id.clone(),
                date: Utc::now().date_naive(),
                total_videos: video_count as u32,
                total_summaries: summaries as u32,
                summary_model,
                duration_seconds,
            })
            .await?;

        Ok(UserRun {
            user_id: user.id.clone(),
            video_count,
            transcripts,
            summaries,
            highlights: highlights.len(),
            duration_seconds,
        })
    }

    async fn finish_background_jobs(&self) {
        let summary = self.jobs.drain().await;
        if summary.failed > 0 {
            tracing::warn!(
                "{} of {} background jobs failed",
                summary.failed,
                summary.completed + summary.failed
            );
        }
    }
}
