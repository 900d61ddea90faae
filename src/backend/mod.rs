//! Execution backends for tunepool.
//!
//! A backend adapter exposes exactly one operation: submit a job, get back a
//! [`JobHandle`](crate::job::JobHandle). The closed set of adapters is
//! dispatched through the [`Backend`] enum, resolved once when the execution
//! context constructs an executor.

pub mod cluster;
pub mod noop;
pub mod parallel;
pub mod synchronous;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::job::{JobFn, JobHandle};

use cluster::ClusterBackend;
use noop::NoopBackend;
use parallel::LocalParallelBackend;
use synchronous::LocalSynchronousBackend;

/// Type alias for boxed async futures.
///
/// Used to enable dynamic dispatch for async trait methods at the cluster
/// scheduler seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One concrete execution strategy.
///
/// Variants differ wildly in execution model (remote asynchronous cluster
/// jobs, local worker tasks, immediate synchronous calls, or nothing at all)
/// but all provide identical submit/result/cancel semantics through the
/// handles they return.
pub enum Backend<T> {
    /// Submit jobs to an external distributed scheduler.
    Cluster(ClusterBackend<T>),
    /// Submit jobs to a fixed-size worker pool on the current machine.
    LocalParallel(LocalParallelBackend<T>),
    /// Execute jobs synchronously on first result retrieval.
    LocalSynchronous(LocalSynchronousBackend),
    /// Discard jobs without executing them.
    Noop(NoopBackend),
}

impl<T: Send + Default + 'static> Backend<T> {
    /// Submits a job and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying adapter rejects the submission,
    /// e.g. a closed pool or a scheduler submission failure. Failures of the
    /// job itself are never surfaced here.
    pub async fn submit(&self, job: JobFn<T>) -> Result<JobHandle<T>> {
        match self {
            Self::Cluster(backend) => backend.submit(job).await,
            Self::LocalParallel(backend) => backend.submit(job).await,
            Self::LocalSynchronous(backend) => Ok(backend.submit(job)),
            Self::Noop(backend) => Ok(backend.submit(job)),
        }
    }
}
