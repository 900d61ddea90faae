//! Bulk-wait protocol: wait on a batch of jobs in submission order.

use std::collections::VecDeque;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::job::JobHandle;

/// How many job identifiers the pre-wait summary line shows.
const MAX_JOB_IDS_SHOWN: usize = 8;

/// Waits for every job in the batch to complete.
///
/// Handles are processed strictly in submission order regardless of actual
/// completion order, so an early slow job delays progress logging for later
/// already-finished jobs. Simplicity over latency.
///
/// With `cancel_on_error` disabled, the first retrieval failure propagates to
/// the caller and no cancellation is attempted on the remaining handles;
/// local work cannot be preempted anyway, so the failure simply aborts the
/// wait.
///
/// With `cancel_on_error` enabled, a retrieval failure is logged, the failing
/// handle is requeued, and every still-queued handle (the failing one
/// included) is canceled exactly once; the protocol then returns without
/// error. Failed jobs are never retried.
pub async fn wait_on_jobs<T>(
    jobs: Vec<JobHandle<T>>,
    executor_name: &str,
    cancel_on_error: bool,
) -> Result<()>
where
    T: Send + Default + 'static,
{
    let njobs = jobs.len();
    let mut jobs: VecDeque<JobHandle<T>> = jobs.into();

    let shown: Vec<String> = jobs
        .iter()
        .take(MAX_JOB_IDS_SHOWN)
        .map(|job| job.id().to_string())
        .collect();
    let label = if njobs == 1 { "job ID" } else { "job IDs" };
    let mut ids = shown.join(", ");
    if njobs > MAX_JOB_IDS_SHOWN {
        ids.push_str(" ...");
    }
    info!("Waiting for {njobs} {executor_name} jobs to complete with {label}: {ids}");

    let mut completed = 0usize;
    while let Some(job) = jobs.pop_front() {
        if cancel_on_error {
            match job.result().await {
                Ok(_) => {
                    completed += 1;
                    info!("Jobs completed = {completed} of {njobs} ...");
                }
                Err(e) => {
                    error!("Caught: {e}");
                    jobs.push_back(job);
                    cancel_all_jobs(jobs, executor_name).await;
                    return Ok(());
                }
            }
        } else {
            job.result().await?;
            completed += 1;
            info!("Jobs completed = {completed} of {njobs} ...");
        }
    }
    info!("All done.");
    Ok(())
}

async fn cancel_all_jobs<T>(jobs: VecDeque<JobHandle<T>>, executor_name: &str)
where
    T: Send + Default + 'static,
{
    warn!("Cancelling {} {executor_name} jobs", jobs.len());
    for job in jobs {
        if let Err(e) = job.cancel().await {
            debug!("Failed to cancel job {}: {e}", job.id());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::cluster::ClusterJob;
    use crate::backend::synchronous::LocalSynchronousBackend;
    use crate::backend::BoxFuture;
    use crate::error::TunepoolError;
    use crate::job::{JobHandle, JobId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn failing_job() -> crate::error::Result<i32> {
        Err(TunepoolError::ExecutionFailed {
            message: "search diverged".to_string(),
        })
    }

    struct CountingJob {
        outcome: Option<crate::error::Result<i32>>,
        results: Arc<AtomicUsize>,
        cancels: Arc<AtomicUsize>,
    }

    impl ClusterJob<i32> for CountingJob {
        fn result(&mut self) -> BoxFuture<'_, crate::error::Result<i32>> {
            Box::pin(async move {
                self.results.fetch_add(1, Ordering::SeqCst);
                self.outcome.take().unwrap_or(Ok(0))
            })
        }

        fn cancel(&mut self) -> BoxFuture<'_, crate::error::Result<()>> {
            Box::pin(async move {
                self.cancels.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    fn counting_handle(
        id: u64,
        outcome: crate::error::Result<i32>,
        results: &Arc<AtomicUsize>,
        cancels: &Arc<AtomicUsize>,
    ) -> JobHandle<i32> {
        JobHandle::cluster(
            JobId::new(id),
            Box::new(CountingJob {
                outcome: Some(outcome),
                results: Arc::clone(results),
                cancels: Arc::clone(cancels),
            }),
        )
    }

    #[tokio::test]
    async fn test_all_jobs_complete() {
        let backend = LocalSynchronousBackend::new();
        let jobs: Vec<JobHandle<i32>> = (0..3)
            .map(|i| backend.submit(Box::new(move || Ok(i))))
            .collect();
        wait_on_jobs(jobs, "local", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_propagates_without_cancellation() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(AtomicUsize::new(0));
        let jobs = vec![
            counting_handle(1, Ok(1), &results, &cancels),
            counting_handle(2, failing_job(), &results, &cancels),
            counting_handle(3, Ok(3), &results, &cancels),
        ];

        let err = wait_on_jobs(jobs, "local", false).await.unwrap_err();
        assert!(matches!(err, TunepoolError::ExecutionFailed { .. }));
        assert_eq!(cancels.load(Ordering::SeqCst), 0);
        // The third job was never waited on.
        assert_eq!(results.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_remainder() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(AtomicUsize::new(0));
        // Five jobs; the third fails.
        let jobs: Vec<JobHandle<i32>> = (1..=5)
            .map(|i| {
                let outcome = if i == 3 { failing_job() } else { Ok(i) };
                counting_handle(i as u64, outcome, &results, &cancels)
            })
            .collect();

        wait_on_jobs(jobs, "research", true).await.unwrap();
        // Jobs 3, 4 and 5 were canceled; 1 and 2 completed first.
        assert_eq!(cancels.load(Ordering::SeqCst), 3);
        assert_eq!(results.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_with_failure_on_last_job() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(AtomicUsize::new(0));
        let jobs = vec![
            counting_handle(1, Ok(1), &results, &cancels),
            counting_handle(2, failing_job(), &results, &cancels),
        ];

        wait_on_jobs(jobs, "research", true).await.unwrap();
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        wait_on_jobs(Vec::<JobHandle<i32>>::new(), "noop", false)
            .await
            .unwrap();
    }
}
