use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::error::{AppError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub completed: usize,
    pub failed: usize,
}

/// Fire-and-forget work that is still accounted for: every job is kept in a
/// `JoinSet` until [`BackgroundJobs::drain`] collects it. At most `limit`
/// jobs run at once; the rest wait for a permit.
pub struct BackgroundJobs {
    set: Mutex<JoinSet<(String, Result<usize>)>>,
    permits: Arc<Semaphore>,
}

impl Default for BackgroundJobs {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BackgroundJobs {
    pub fn new(limit: usize) -> Self {
        Self {
            set: Mutex::new(JoinSet::new()),
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    pub async fn spawn<F>(&self, label: String, job: F)
    where
        F: Future<Output = Result<usize>> + Send + 'static,
    {
        tracing::debug!("Spawning background job {}", label);
        let permits = Arc::clone(&self.permits);
        self.set.lock().await.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (label, Err(AppError::Other(anyhow::anyhow!(e)))),
            };
            (label, job.await)
        });
    }

    pub async fn pending(&self) -> usize {
        self.set.lock().await.len()
    }

    /// Waits for every job spawned so far and logs the ones that failed or panicked.
    pub async fn drain(&self) -> DrainSummary {
        let mut set = std::mem::take(&mut *self.set.lock().await);
        let mut summary = DrainSummary::default();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((label, Ok(count))) => {
                    tracing::debug!("Background job {} finished ({} items)", label, count);
                    summary.completed += 1;
                }
                Ok((label, Err(e))) => {
                    tracing::error!("Background job {} failed: {}", label, e);
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Background job panicked or was cancelled: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn jobs_should_panic() -> bool {
        true
    }

    #[tokio::test]
    async fn drain_counts_failures_and_panics() {
        let jobs = BackgroundJobs::new(3);
        jobs.spawn("ok".into(), async { Ok::<usize, AppError>(3) }).await;
        jobs.spawn("err".into(), async { Err::<usize, AppError>(AppError::LlmApi("down".into())) })
            .await;
        jobs.spawn("panic".into(), async {
            if jobs_should_panic() {
                panic!("boom");
            }
            Ok::<usize, AppError>(0)
        })
        .await;
        assert_eq!(jobs.pending().await, 3);

        let summary = jobs.drain().await;
        assert_eq!(summary, DrainSummary { completed: 1, failed: 2 });
        assert_eq!(jobs.pending().await, 0);
    }

    #[test]
    fn drain_with_nothing_spawned() {
        let jobs = BackgroundJobs::default();
        let summary = tokio_test::block_on(jobs.drain());
        assert_eq!(summary, DrainSummary::default());
    }

    #[derive(Default)]
    struct Gauge {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        async fn hold(&self) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn limit_caps_jobs_running_at_once() {
        for limit in [1, 2] {
            let jobs = BackgroundJobs::new(limit);
            let gauge = Arc::new(Gauge::default());
            for n in 0..6 {
                let gauge = Arc::clone(&gauge);
                jobs.spawn(format!("job {n}"), async move {
                    gauge.hold().await;
                    Ok::<usize, AppError>(1)
                })
                .await;
            }

            let summary = jobs.drain().await;
            assert_eq!(summary, DrainSummary { completed: 6, failed: 0 });
            let peak = gauge.peak.load(Ordering::SeqCst);
            assert!(peak >= 1 && peak <= limit, "peak {peak} with limit {limit}");
        }
    }
}
