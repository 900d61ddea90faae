//! Tracking executor: records every submission for later bulk-waiting.

use std::fmt;

use tracing::info;

use crate::backend::Backend;
use crate::batch::wait_on_jobs;
use crate::error::Result;
use crate::job::JobHandle;

/// Transparent decorator over a backend adapter that records all jobs
/// submitted through it.
///
/// Created per experiment batch by [`ExecutorConfig`](crate::ExecutorConfig).
/// The submission history is append-only and preserves submission order.
/// Tear the executor down with [`join`](Self::join) once the batch has been
/// submitted; `join` is the scope-exit step of the execution context.
pub struct TrackingExecutor<T> {
    backend: Backend<T>,
    jobs: Vec<JobHandle<T>>,
    name: String,
    block: bool,
}

impl<T: Send + Default + 'static> TrackingExecutor<T> {
    pub(crate) fn new(backend: Backend<T>, name: String, block: bool) -> Self {
        Self {
            backend,
            jobs: Vec::new(),
            name,
            block,
        }
    }

    /// Submits a job, records its handle, and returns the same handle.
    ///
    /// Arguments are forwarded to the backend unchanged and any submission
    /// failure propagates untranslated.
    pub async fn submit<F>(&mut self, job: F) -> Result<JobHandle<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let handle = self.backend.submit(Box::new(job)).await?;
        info!("Submitting job {} to {} ...", handle.id(), self.name);
        self.jobs.push(handle.clone());
        Ok(handle)
    }

    /// Returns the submission history in submission order.
    #[must_use]
    pub fn jobs(&self) -> &[JobHandle<T>] {
        &self.jobs
    }

    /// Returns the executor's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tears the executor down.
    ///
    /// Closes the worker pool of a local-parallel backend (stopping new
    /// submissions; in-flight work still drains), then, if the execution
    /// context is blocking, runs the bulk-wait protocol over every tracked
    /// job. Fail-fast cancellation is enabled only for the cluster backend;
    /// local backends cannot meaningfully cancel in-flight work, so their
    /// failures are surfaced by waiting on each handle to completion.
    ///
    /// # Errors
    ///
    /// Propagates the first retrieval failure when fail-fast is disabled.
    pub async fn join(mut self) -> Result<()> {
        if let Backend::LocalParallel(pool) = &self.backend {
            pool.close().await;
        }
        if self.block {
            let cancel_on_error = matches!(self.backend, Backend::Cluster(_));
            let jobs = std::mem::take(&mut self.jobs);
            wait_on_jobs(jobs, &self.name, cancel_on_error).await?;
        }
        Ok(())
    }
}

impl<T> fmt::Display for TrackingExecutor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
