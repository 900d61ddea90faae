//! No-op backend: jobs are discarded without executing.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::job::{JobFn, JobHandle, JobId};

/// Backend that discards submitted work.
///
/// `result()` on the returned handle yields `T::default()` immediately and
/// the submitted closure is never invoked. Useful for dry-run validation of
/// configuration and call sites without incurring compute cost.
#[derive(Debug, Default)]
pub struct NoopBackend {
    last_job_id: AtomicU64,
}

impl NoopBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the job and returns a handle to the fixed null result.
    pub fn submit<T: Send + Default + 'static>(&self, job: JobFn<T>) -> JobHandle<T> {
        drop(job);
        let id = JobId::new(self.last_job_id.fetch_add(1, Ordering::SeqCst) + 1);
        JobHandle::noop(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_job_is_never_invoked() {
        let backend = NoopBackend::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_job = Arc::clone(&calls);
        let handle = backend.submit(Box::new(move || {
            calls_in_job.fetch_add(1, Ordering::SeqCst);
            Ok(123)
        }));

        assert_eq!(handle.result().await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_job_ids_start_at_one() {
        let backend = NoopBackend::new();
        let first = backend.submit::<i32>(Box::new(|| Ok(0)));
        let second = backend.submit::<i32>(Box::new(|| Ok(0)));
        assert_eq!(first.id().as_u64(), 1);
        assert_eq!(second.id().as_u64(), 2);
    }
}
