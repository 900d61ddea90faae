//! # Tunepool: job execution for autotuning experiments
//!
//! Tunepool is the job-execution layer of an autotuning experiment
//! orchestrator. It provides a uniform submit/wait/cancel interface over
//! heterogeneous execution backends (an external cluster scheduler, a local
//! worker pool, a synchronous debug runner, and a no-op stub), together with
//! a bulk job-waiting protocol that supports fail-fast cancellation of
//! in-flight work.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use tunepool::{BackendKind, ExecutorConfig};
//!
//! #[tokio::main]
//! async fn main() -> tunepool::Result<()> {
//!     let config = ExecutorConfig::builder()
//!         .kind(BackendKind::LocalParallel)
//!         .cpus(8)
//!         .block(true)
//!         .build()?;
//!
//!     let mut executor = config.executor::<f64>(Path::new("logs"), None)?;
//!     for benchmark in 0..32 {
//!         executor.submit(move || Ok(tune(benchmark))).await?;
//!     }
//!     // Scope exit: close the pool, then wait on every submitted job.
//!     executor.join().await
//! }
//!
//! fn tune(_benchmark: u32) -> f64 {
//!     1.0
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`job`]: uniform [`JobHandle`] with blocking result retrieval and
//!   best-effort cancellation.
//! - [`backend`]: the four adapters behind one dispatch enum.
//! - [`config`]: the validated execution context, used as an executor
//!   factory.
//! - [`executor`]: the tracking decorator recording submission history.
//! - [`batch`]: the bulk-wait protocol.
//! - [`env`]: wrappers at the external environment boundary.
//!
//! All backends provide identical semantics: failures of the submitted work
//! surface only at result retrieval, submission order is preserved for
//! waiting, and cancellation is meaningful only where the backend can
//! actually preempt work (the cluster).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)]

pub mod backend;
pub mod batch;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod job;

pub use backend::Backend;
pub use batch::wait_on_jobs;
pub use config::{BackendKind, ExecutorConfig};
pub use error::{Result, TunepoolError};
pub use executor::TrackingExecutor;
pub use job::{JobFn, JobHandle, JobId};
