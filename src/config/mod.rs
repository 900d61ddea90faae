//! Execution-context configuration.
//!
//! An [`ExecutorConfig`] is built once per experiment run from user
//! configuration, validated eagerly, and then used as a factory for
//! [`TrackingExecutor`]s scoped to a logging directory.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::cluster::{ClusterBackend, ClusterClient, ClusterParams};
use crate::backend::noop::NoopBackend;
use crate::backend::parallel::LocalParallelBackend;
use crate::backend::synchronous::LocalSynchronousBackend;
use crate::backend::Backend;
use crate::error::{Result, TunepoolError};
use crate::executor::TrackingExecutor;

/// Kinds of execution environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Submit jobs to a cluster scheduler.
    Cluster,
    /// Submit jobs to a worker pool on the current machine.
    LocalParallel,
    /// Submit jobs to run synchronously on first result retrieval.
    LocalSynchronous,
    /// Submitted jobs return immediately without executing.
    NoOp,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cluster => "cluster",
            Self::LocalParallel => "local-parallel",
            Self::LocalSynchronous => "local-synchronous",
            Self::NoOp => "no-op",
        };
        f.write_str(name)
    }
}

/// Defines the execution environment for jobs.
///
/// E.g. a partition on a cluster, the local machine, etc. Construct it with
/// the builder, then use it as a factory for executors:
///
/// ```no_run
/// use tunepool::{BackendKind, ExecutorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> tunepool::Result<()> {
/// let config = ExecutorConfig::builder()
///     .kind(BackendKind::LocalParallel)
///     .cpus(4)
///     .block(true)
///     .build()?;
///
/// let mut executor = config.executor::<f64>(std::path::Path::new("logs"), None)?;
/// executor.submit(|| Ok(1.0)).await?;
/// executor.join().await?;
/// # Ok(())
/// # }
/// ```
///
/// Immutable once built; all fields are validated at construction, never at
/// submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawExecutorConfig")]
pub struct ExecutorConfig {
    kind: BackendKind,
    partition: Option<String>,
    cpus: usize,
    timeout_hours: f64,
    block: bool,
}

impl ExecutorConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    /// Returns the configured backend kind.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Returns the cluster partition name, if any.
    #[must_use]
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Returns the worker/thread count.
    #[must_use]
    pub const fn cpus(&self) -> usize {
        self.cpus
    }

    /// Returns the per-job timeout in hours.
    #[must_use]
    pub const fn timeout_hours(&self) -> f64 {
        self.timeout_hours
    }

    /// Whether scope exit waits on all submitted jobs.
    ///
    /// Always true for the local-synchronous and no-op backends, which have
    /// no meaningful async benefit.
    #[must_use]
    pub const fn block(&self) -> bool {
        self.block
    }

    /// Constructs a tracking executor for a non-cluster backend.
    ///
    /// `logs_dir` scopes the executor's logging; `cpus` overrides the
    /// configured worker count when given.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for the cluster kind, which needs a
    /// scheduler client; use [`executor_with_client`](Self::executor_with_client).
    pub fn executor<T>(&self, logs_dir: &Path, cpus: Option<usize>) -> Result<TrackingExecutor<T>>
    where
        T: Send + Default + 'static,
    {
        if self.kind == BackendKind::Cluster {
            return Err(TunepoolError::InvalidConfig {
                reason: "the cluster backend requires a scheduler client".to_string(),
            });
        }
        self.build_executor(logs_dir, cpus, None)
    }

    /// Constructs a tracking executor, providing the external scheduler
    /// client used by the cluster backend. Other kinds ignore the client.
    ///
    /// # Errors
    ///
    /// Propagates backend construction failures.
    pub fn executor_with_client<T>(
        &self,
        logs_dir: &Path,
        cpus: Option<usize>,
        client: Arc<dyn ClusterClient<T>>,
    ) -> Result<TrackingExecutor<T>>
    where
        T: Send + Default + 'static,
    {
        self.build_executor(logs_dir, cpus, Some(client))
    }

    fn build_executor<T>(
        &self,
        logs_dir: &Path,
        cpus: Option<usize>,
        client: Option<Arc<dyn ClusterClient<T>>>,
    ) -> Result<TrackingExecutor<T>>
    where
        T: Send + Default + 'static,
    {
        let cpus = cpus.unwrap_or(self.cpus);
        let (backend, name) = match self.kind {
            BackendKind::Cluster => {
                let client = client.ok_or_else(|| TunepoolError::InvalidConfig {
                    reason: "the cluster backend requires a scheduler client".to_string(),
                })?;
                let partition =
                    self.partition
                        .clone()
                        .ok_or_else(|| TunepoolError::InvalidConfig {
                            reason: "must specify a partition for the cluster backend".to_string(),
                        })?;
                let params = ClusterParams {
                    folder: logs_dir.to_path_buf(),
                    timeout_min: (self.timeout_hours * 60.0).round() as u64,
                    nodes: 1,
                    cpus_per_task: cpus,
                    partition: partition.clone(),
                };
                (Backend::Cluster(ClusterBackend::new(client, params)?), partition)
            }
            BackendKind::LocalParallel => {
                let timeout = Duration::from_secs((self.timeout_hours * 3600.0).round() as u64);
                (
                    Backend::LocalParallel(LocalParallelBackend::new(cpus, timeout)),
                    "local".to_string(),
                )
            }
            BackendKind::LocalSynchronous => (
                Backend::LocalSynchronous(LocalSynchronousBackend::new()),
                "local".to_string(),
            ),
            BackendKind::NoOp => (Backend::Noop(NoopBackend::new()), "noop".to_string()),
        };
        Ok(TrackingExecutor::new(backend, name, self.block))
    }
}

/// Builder for [`ExecutorConfig`].
#[derive(Debug)]
pub struct ExecutorConfigBuilder {
    kind: Option<BackendKind>,
    partition: Option<String>,
    cpus: usize,
    timeout_hours: f64,
    block: bool,
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self {
            kind: None,
            partition: None,
            cpus: 1,
            timeout_hours: 12.0,
            block: false,
        }
    }
}

impl ExecutorConfigBuilder {
    /// Sets the backend kind. Required.
    #[must_use]
    pub const fn kind(mut self, kind: BackendKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the cluster partition name.
    #[must_use]
    pub fn partition<S: Into<String>>(mut self, partition: S) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Sets the worker/thread count.
    #[must_use]
    pub const fn cpus(mut self, cpus: usize) -> Self {
        self.cpus = cpus;
        self
    }

    /// Sets the worker count to the number of available cores.
    #[must_use]
    pub fn all_cores(mut self) -> Self {
        self.cpus = num_cpus::get();
        self
    }

    /// Sets the per-job timeout in hours.
    #[must_use]
    pub const fn timeout_hours(mut self, hours: f64) -> Self {
        self.timeout_hours = hours;
        self
    }

    /// Sets whether scope exit waits on all submitted jobs.
    #[must_use]
    pub const fn block(mut self, block: bool) -> Self {
        self.block = block;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the kind is unset, the worker count
    /// is zero, the timeout is not positive, or the cluster kind has no
    /// partition.
    pub fn build(self) -> Result<ExecutorConfig> {
        let kind = self.kind.ok_or_else(|| TunepoolError::InvalidConfig {
            reason: "backend kind not set".to_string(),
        })?;
        if self.cpus < 1 {
            return Err(TunepoolError::InvalidConfig {
                reason: "cpus must be at least 1".to_string(),
            });
        }
        if !(self.timeout_hours > 0.0) || !self.timeout_hours.is_finite() {
            return Err(TunepoolError::InvalidConfig {
                reason: "timeout must be a positive number of hours".to_string(),
            });
        }
        if kind == BackendKind::Cluster && self.partition.as_deref().map_or(true, str::is_empty) {
            return Err(TunepoolError::InvalidConfig {
                reason: "must specify a partition for the cluster backend".to_string(),
            });
        }

        // Synchronous and no-op execution gains nothing from detaching, so
        // these kinds always wait on scope exit.
        let block = match kind {
            BackendKind::LocalSynchronous | BackendKind::NoOp => true,
            BackendKind::Cluster | BackendKind::LocalParallel => self.block,
        };

        Ok(ExecutorConfig {
            kind,
            partition: self.partition,
            cpus: self.cpus,
            timeout_hours: self.timeout_hours,
            block,
        })
    }
}

/// Unvalidated mirror of [`ExecutorConfig`] used during deserialization so
/// configuration errors surface at parse time.
#[derive(Deserialize)]
struct RawExecutorConfig {
    kind: BackendKind,
    #[serde(default)]
    partition: Option<String>,
    #[serde(default = "default_cpus")]
    cpus: usize,
    #[serde(default = "default_timeout_hours")]
    timeout_hours: f64,
    #[serde(default)]
    block: bool,
}

const fn default_cpus() -> usize {
    1
}

const fn default_timeout_hours() -> f64 {
    12.0
}

impl TryFrom<RawExecutorConfig> for ExecutorConfig {
    type Error = TunepoolError;

    fn try_from(raw: RawExecutorConfig) -> Result<Self> {
        let mut builder = ExecutorConfig::builder()
            .kind(raw.kind)
            .cpus(raw.cpus)
            .timeout_hours(raw.timeout_hours)
            .block(raw.block);
        if let Some(partition) = raw.partition {
            builder = builder.partition(partition);
        }
        builder.build()
    }
}
