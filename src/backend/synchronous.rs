//! Local synchronous backend: jobs execute when their result is retrieved.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::job::{JobFn, JobHandle, JobId};

/// Backend where each job runs synchronously on the first `result()` call.
///
/// `submit` captures the closure without executing it, so submission-time
/// side effects are impossible and failures surface only at retrieval.
/// Useful for debugging call sites without worker-pool indirection.
#[derive(Debug, Default)]
pub struct LocalSynchronousBackend {
    last_job_id: AtomicU64,
}

impl LocalSynchronousBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures a job for deferred execution.
    pub fn submit<T: Send + 'static>(&self, job: JobFn<T>) -> JobHandle<T> {
        let id = JobId::new(self.last_job_id.fetch_add(1, Ordering::SeqCst) + 1);
        JobHandle::deferred(id, job)
    }
}
