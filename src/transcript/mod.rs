mod captions;
mod innertube;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use captions::{extract_api_key, parse_caption_xml};
pub use innertube::InnertubeTranscriptClient;

/// Where transcripts come from.
///
/// `Ok(None)` means the video has no usable captions, which is an ordinary
/// answer. `Err` is reserved for transport trouble worth another attempt.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>>;
}

/// Wraps a [`TranscriptSource`] with a bounded retry loop and linear backoff.
#[derive(Clone)]
pub struct TranscriptRetriever {
    source: Arc<dyn TranscriptSource>,
    max_attempts: u32,
    base_delay: Duration,
}

impl TranscriptRetriever {
    pub fn new(source: Arc<dyn TranscriptSource>, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Each attempt re-runs the whole lookup. Gives up with `None`.
    pub async fn fetch_with_retry(&self, video_id: &str) -> Option<String> {
        for attempt in 1..=self.max_attempts {
            match self.source.fetch_transcript(video_id).await {
                Ok(transcript) => return transcript,
                Err(e) => {
                    tracing::warn!(
                        "Transcript attempt {}/{} failed for {}: {}",
                        attempt,
                        self.max_attempts,
                        video_id,
                        e
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.base_delay * attempt).await;
                    }
                }
            }
        }

        tracing::info!("Giving up on transcript for {}", video_id);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures_before_success: u32,
        calls: AtomicU32,
        answer: Option<String>,
    }

    #[async_trait]
    impl TranscriptSource for Flaky {
        async fn fetch_transcript(&self, _video_id: &str) -> Result<Option<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                Err(AppError::Transcript(format!("timeout #{call}")))
            } else {
                Ok(self.answer.clone())
            }
        }
    }

    fn retriever(source: Arc<Flaky>) -> TranscriptRetriever {
        TranscriptRetriever::new(source, 3, Duration::ZERO)
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let source = Arc::new(Flaky {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
            answer: Some("hello world".to_string()),
        });
        let result = retriever(source.clone()).fetch_with_retry("v").await;
        assert_eq!(result.as_deref(), Some("hello world"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let source = Arc::new(Flaky {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
            answer: None,
        });
        assert_eq!(retriever(source.clone()).fetch_with_retry("v").await, None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_captions_are_not_retried() {
        let source = Arc::new(Flaky {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            answer: None,
        });
        assert_eq!(retriever(source.clone()).fetch_with_retry("v").await, None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
