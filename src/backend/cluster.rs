//! Cluster backend: thin adapter over an external distributed scheduler.
//!
//! The scheduler itself (SLURM or similar) is an external collaborator. It
//! enters the crate through the [`ClusterClient`] trait, and its native job
//! objects through [`ClusterJob`]; this module only forwards submissions with
//! the configured parameters and wraps the native job in a uniform handle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::BoxFuture;
use crate::error::{Result, TunepoolError};
use crate::job::{JobFn, JobHandle, JobId};

/// Submission parameters forwarded to the external scheduler.
#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// Directory the scheduler writes job logs into.
    pub folder: PathBuf,
    /// Per-job timeout in minutes.
    pub timeout_min: u64,
    /// Node count per job. Fixed at 1 by the execution context.
    pub nodes: u32,
    /// CPU threads to provision per job.
    pub cpus_per_task: usize,
    /// Scheduler partition to submit into.
    pub partition: String,
}

/// Native job object of the external scheduler.
///
/// Result retrieval and cancellation delegate to whatever the scheduler
/// provides; timeout semantics are the scheduler's own.
pub trait ClusterJob<T>: Send {
    /// Blocks until the remote job completes and returns its result.
    fn result(&mut self) -> BoxFuture<'_, Result<T>>;

    /// Cancels the remotely scheduled job.
    fn cancel(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Submission facility of the external scheduler.
pub trait ClusterClient<T>: Send + Sync {
    /// Submits a job with the given parameters, returning the scheduler's
    /// native job object.
    fn submit(&self, params: ClusterParams, job: JobFn<T>)
        -> BoxFuture<'_, Result<Box<dyn ClusterJob<T>>>>;
}

/// Backend that forwards submissions to an external scheduler.
pub struct ClusterBackend<T> {
    last_job_id: AtomicU64,
    client: Arc<dyn ClusterClient<T>>,
    params: ClusterParams,
}

impl<T: Send + 'static> ClusterBackend<T> {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the partition name is empty.
    pub fn new(client: Arc<dyn ClusterClient<T>>, params: ClusterParams) -> Result<Self> {
        if params.partition.is_empty() {
            return Err(TunepoolError::InvalidConfig {
                reason: "must specify a partition for the cluster backend".to_string(),
            });
        }
        Ok(Self {
            last_job_id: AtomicU64::new(0),
            client,
            params,
        })
    }

    /// Forwards the job to the scheduler's submission API.
    ///
    /// # Errors
    ///
    /// Propagates submission failures from the scheduler unchanged.
    pub async fn submit(&self, job: JobFn<T>) -> Result<JobHandle<T>> {
        let id = JobId::new(self.last_job_id.fetch_add(1, Ordering::SeqCst) + 1);
        let native = self.client.submit(self.params.clone(), job).await?;
        Ok(JobHandle::cluster(id, native))
    }
}
