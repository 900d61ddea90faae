//! Job handles: uniform references to submitted units of work.
//!
//! Every backend adapter returns a [`JobHandle`] from `submit`. The handle
//! supports blocking result retrieval and best-effort cancellation, hiding
//! whether the work runs on a pool worker, a remote cluster node, or not
//! until retrieval time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tokio::time;

use crate::backend::cluster::ClusterJob;
use crate::error::{Result, TunepoolError};

/// Identifier of one submitted job.
///
/// Assigned sequentially starting at 1 within each backend adapter instance.
/// Used for human-readable logging only, never for correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value of the identifier.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of submitted work: a closure plus its captured arguments.
///
/// The closure's captures take the place of positional and keyword arguments;
/// the return value must be transferable across the chosen backend's
/// execution boundary (`Send + 'static`).
pub type JobFn<T> = Box<dyn FnOnce() -> Result<T> + Send + 'static>;

/// The means of retrieving one job's result.
enum HandleInner<T> {
    /// Result arrives from a pool worker; retrieval waits up to the timeout.
    Pool {
        reply: Option<oneshot::Receiver<Result<T>>>,
        timeout: Duration,
    },
    /// Deferred closure, executed on first retrieval.
    Deferred { job: Option<JobFn<T>> },
    /// Discarded work; retrieval yields the fixed null value.
    Noop,
    /// Native job object of the external cluster scheduler.
    Cluster { job: Box<dyn ClusterJob<T>> },
}

/// Uniform handle to one submitted unit of work.
///
/// Handles are cheaply cloneable: the tracking executor's submission history
/// and the submitting caller share the same underlying state, so a result
/// retrieved through one clone is observed as consumed by the others.
pub struct JobHandle<T> {
    id: JobId,
    inner: Arc<Mutex<HandleInner<T>>>,
}

impl<T> Clone for JobHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle").field("id", &self.id).finish()
    }
}

impl<T> JobHandle<T> {
    pub(crate) fn pool(id: JobId, timeout: Duration, reply: oneshot::Receiver<Result<T>>) -> Self {
        Self::with_inner(
            id,
            HandleInner::Pool {
                reply: Some(reply),
                timeout,
            },
        )
    }

    pub(crate) fn deferred(id: JobId, job: JobFn<T>) -> Self {
        Self::with_inner(id, HandleInner::Deferred { job: Some(job) })
    }

    pub(crate) fn noop(id: JobId) -> Self {
        Self::with_inner(id, HandleInner::Noop)
    }

    pub(crate) fn cluster(id: JobId, job: Box<dyn ClusterJob<T>>) -> Self {
        Self::with_inner(id, HandleInner::Cluster { job })
    }

    fn with_inner(id: JobId, inner: HandleInner<T>) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns the identifier assigned at submission.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Best-effort cancellation.
    ///
    /// Only meaningful for cluster jobs, where it delegates to the
    /// scheduler's native job object. Local work is either already dispatched
    /// to a worker or executes synchronously on retrieval, so cancellation is
    /// accepted but has no effect.
    pub async fn cancel(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match &mut *inner {
            HandleInner::Cluster { job } => job.cancel().await,
            _ => Ok(()),
        }
    }
}

impl<T: Default> JobHandle<T> {
    /// Blocks until the job's result is available and returns it.
    ///
    /// This is the sole blocking operation of the job layer. For pool-backed
    /// jobs it waits up to the configured timeout and fails with
    /// [`TunepoolError::Timeout`] when exceeded; for deferred jobs the first
    /// call executes the closure; for no-op jobs the null value is returned
    /// immediately. Pool-backed and deferred results can be taken once;
    /// a later call reports [`TunepoolError::ResultRetrieved`].
    pub async fn result(&self) -> Result<T> {
        let mut inner = self.inner.lock().await;
        match &mut *inner {
            HandleInner::Pool { reply, timeout } => {
                let reply = reply
                    .take()
                    .ok_or(TunepoolError::ResultRetrieved { id: self.id })?;
                match time::timeout(*timeout, reply).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => Err(TunepoolError::ExecutionFailed {
                        message: format!("worker exited before reporting a result for job {}", self.id),
                    }),
                    Err(_) => Err(TunepoolError::Timeout {
                        seconds: timeout.as_secs(),
                    }),
                }
            }
            HandleInner::Deferred { job } => {
                let job = job
                    .take()
                    .ok_or(TunepoolError::ResultRetrieved { id: self.id })?;
                job()
            }
            HandleInner::Noop => Ok(T::default()),
            HandleInner::Cluster { job } => job.result().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_handle_returns_sent_value() {
        let (tx, rx) = oneshot::channel();
        let handle = JobHandle::pool(JobId::new(1), Duration::from_secs(5), rx);
        tx.send(Ok(7)).unwrap();
        assert_eq!(handle.result().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_pool_handle_times_out() {
        let (tx, rx) = oneshot::channel::<Result<i32>>();
        let handle = JobHandle::pool(JobId::new(1), Duration::from_millis(20), rx);
        let err = handle.result().await.unwrap_err();
        assert!(matches!(err, TunepoolError::Timeout { .. }));
        drop(tx);
    }

    #[tokio::test]
    async fn test_pool_handle_single_retrieval() {
        let (tx, rx) = oneshot::channel();
        let handle = JobHandle::pool(JobId::new(3), Duration::from_secs(5), rx);
        tx.send(Ok(1)).unwrap();
        handle.result().await.unwrap();
        let err = handle.result().await.unwrap_err();
        assert!(matches!(err, TunepoolError::ResultRetrieved { id } if id == JobId::new(3)));
    }

    #[tokio::test]
    async fn test_deferred_handle_runs_once() {
        let handle: JobHandle<i32> = JobHandle::deferred(JobId::new(1), Box::new(|| Ok(41 + 1)));
        assert_eq!(handle.result().await.unwrap(), 42);
        assert!(matches!(
            handle.result().await.unwrap_err(),
            TunepoolError::ResultRetrieved { .. }
        ));
    }

    #[tokio::test]
    async fn test_noop_handle_always_returns_default() {
        let handle: JobHandle<i32> = JobHandle::noop(JobId::new(1));
        assert_eq!(handle.result().await.unwrap(), 0);
        assert_eq!(handle.result().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_retrieval_state() {
        let handle: JobHandle<i32> = JobHandle::deferred(JobId::new(1), Box::new(|| Ok(5)));
        let tracked = handle.clone();
        assert_eq!(tracked.result().await.unwrap(), 5);
        assert!(handle.result().await.is_err());
    }

    #[tokio::test]
    async fn test_local_cancel_is_noop() {
        let handle: JobHandle<i32> = JobHandle::deferred(JobId::new(1), Box::new(|| Ok(5)));
        handle.cancel().await.unwrap();
        assert_eq!(handle.result().await.unwrap(), 5);
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId::new(17).to_string(), "17");
    }
}
