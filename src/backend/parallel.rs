//! Local parallel backend: a fixed-size worker pool on the current machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task;
use tracing::debug;

use crate::error::{Result, TunepoolError};
use crate::job::{JobFn, JobHandle, JobId};

struct Work<T> {
    id: JobId,
    job: JobFn<T>,
    reply: oneshot::Sender<Result<T>>,
}

/// Backend that processes jobs in parallel on a fixed pool of workers.
///
/// `submit` enqueues the job and returns immediately; result retrieval blocks
/// up to the configured timeout. After [`close`](Self::close), new
/// submissions are rejected while already-queued work still drains.
///
/// Workers are detached tasks, so in-flight jobs keep running even while the
/// backend itself is being torn down. Must be created within a Tokio runtime.
pub struct LocalParallelBackend<T> {
    last_job_id: AtomicU64,
    timeout: Duration,
    queue: Mutex<Option<mpsc::UnboundedSender<Work<T>>>>,
}

impl<T: Send + 'static> LocalParallelBackend<T> {
    /// Creates the backend and spawns `cpus` workers.
    #[must_use]
    pub fn new(cpus: usize, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));

        debug!("Starting local pool with {cpus} workers");
        for worker_id in 0..cpus {
            let rx = Arc::clone(&rx);
            task::spawn(async move {
                debug!("Worker {worker_id} started");
                loop {
                    // Holding the receiver lock across recv serializes the
                    // dequeue, not the job execution.
                    let work: Option<Work<T>> = rx.lock().await.recv().await;
                    let Some(Work { id, job, reply }) = work else {
                        break;
                    };
                    let outcome = match task::spawn_blocking(job).await {
                        Ok(outcome) => outcome,
                        Err(e) => Err(TunepoolError::ExecutionFailed {
                            message: format!("job {id} panicked in worker {worker_id}: {e}"),
                        }),
                    };
                    if reply.send(outcome).is_err() {
                        debug!("Result of job {id} dropped before retrieval");
                    }
                }
                debug!("Worker {worker_id} drained");
            });
        }

        Self {
            last_job_id: AtomicU64::new(0),
            timeout,
            queue: Mutex::new(Some(tx)),
        }
    }

    /// Enqueues a job for asynchronous execution.
    ///
    /// # Errors
    ///
    /// Returns [`TunepoolError::PoolClosed`] after [`close`](Self::close).
    pub async fn submit(&self, job: JobFn<T>) -> Result<JobHandle<T>> {
        let id = JobId::new(self.last_job_id.fetch_add(1, Ordering::SeqCst) + 1);
        let (tx, rx) = oneshot::channel();
        let queue = self.queue.lock().await;
        let sender = queue.as_ref().ok_or(TunepoolError::PoolClosed)?;
        sender
            .send(Work { id, job, reply: tx })
            .map_err(|_| TunepoolError::PoolClosed)?;
        Ok(JobHandle::pool(id, self.timeout, rx))
    }

    /// Stops accepting new work. Already-submitted jobs still complete.
    pub async fn close(&self) {
        if self.queue.lock().await.take().is_some() {
            debug!("Local pool closed");
        }
    }
}
