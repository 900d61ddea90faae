//! Environment-boundary wrappers.
//!
//! The RL environment driving the autotuning search is an external
//! collaborator; this module only specifies its seam ([`Environment`]) and
//! the two pieces of plumbing the orchestration layer needs around it:
//! serialized stepping for environments that share one underlying service
//! process ([`LockedEnv`]), and the wall-clock-bounded runtime sampling loop
//! ([`measure_runtimes`]).

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Result, TunepoolError};

/// Outcome of one environment step.
#[derive(Debug, Clone)]
pub struct EnvStep<O> {
    /// Observation after the step.
    pub observation: O,
    /// Reward for the step.
    pub reward: f64,
    /// Whether the episode terminated.
    pub done: bool,
}

/// Seam for the external RL environment.
///
/// Transition dynamics, action spaces and reward computation live on the
/// other side of this trait.
pub trait Environment: Send {
    /// Action type accepted by `step`.
    type Action;
    /// Observation type produced by `reset` and `step`.
    type Observation;

    /// Resets the environment to its initial state.
    fn reset(&mut self) -> Result<Self::Observation>;

    /// Applies one action.
    fn step(&mut self, action: &Self::Action) -> Result<EnvStep<Self::Observation>>;

    /// Duplicates the environment, preserving its current state.
    fn fork(&self) -> Result<Self>
    where
        Self: Sized;
}

/// Shared step lock, created on first use.
static GLOBAL_STEP_LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();

fn global_step_lock() -> Arc<Mutex<()>> {
    Arc::clone(GLOBAL_STEP_LOCK.get_or_init(|| Arc::new(Mutex::new(()))))
}

/// Wrapper that serializes all stepping calls through a shared lock.
///
/// Environments sharing one underlying service process must not step
/// concurrently. Every `reset`, `step` and `fork` on this wrapper acquires
/// the lock first, and `fork` hands the same lock instance to the forked
/// copy so the two remain mutually exclusive with each other.
///
/// By default all wrappers in the process share one lock; pass an explicit
/// lock to [`with_lock`](Self::with_lock) to scope the exclusion to a
/// smaller group of environments.
pub struct LockedEnv<E> {
    env: E,
    lock: Arc<Mutex<()>>,
}

impl<E> LockedEnv<E> {
    /// Wraps `env`, sharing the process-wide step lock.
    pub fn new(env: E) -> Self {
        Self::with_lock(env, global_step_lock())
    }

    /// Wraps `env` with an explicit lock.
    pub const fn with_lock(env: E, lock: Arc<Mutex<()>>) -> Self {
        Self { env, lock }
    }

    /// Returns the lock serializing this wrapper's stepping calls.
    #[must_use]
    pub fn step_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }

    /// Returns the wrapped environment.
    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: Environment> Environment for LockedEnv<E> {
    type Action = E::Action;
    type Observation = E::Observation;

    fn reset(&mut self) -> Result<Self::Observation> {
        let _step = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.env.reset()
    }

    fn step(&mut self, action: &Self::Action) -> Result<EnvStep<Self::Observation>> {
        let _step = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.env.step(action)
    }

    fn fork(&self) -> Result<Self> {
        let _step = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let forked = self.env.fork()?;
        Ok(Self {
            env: forked,
            lock: Arc::clone(&self.lock),
        })
    }
}

/// Source of runtime measurements for the current benchmark.
pub trait RuntimeObservation {
    /// Measures `count` runtimes of the compiled benchmark, in seconds.
    fn runtimes(&mut self, count: usize) -> Result<Vec<f64>>;
}

/// Collects runtime samples until a minimum wall-clock duration has elapsed.
///
/// Each observation is expected to carry exactly `samples_per_observation`
/// runtimes; a short or long batch is a service error. When the service
/// reports a deadline-exceeded condition, an infinite runtime is recorded as
/// a sentinel and the samples collected so far are returned, letting the
/// caller score the configuration as unusably slow instead of aborting the
/// search.
///
/// # Errors
///
/// Propagates any non-timeout service failure.
pub fn measure_runtimes<E: RuntimeObservation>(
    env: &mut E,
    samples_per_observation: usize,
    min_measurement: Duration,
) -> Result<Vec<f64>> {
    let mut runtimes = Vec::new();
    let deadline = Instant::now() + min_measurement;
    while Instant::now() < deadline {
        match env.runtimes(samples_per_observation) {
            Ok(batch) => {
                if batch.len() != samples_per_observation {
                    return Err(TunepoolError::Service {
                        message: format!(
                            "expected {samples_per_observation} runtimes but received {}",
                            batch.len()
                        ),
                    });
                }
                runtimes.extend(batch);
            }
            Err(TunepoolError::Timeout { .. }) => {
                runtimes.push(f64::INFINITY);
                return Ok(runtimes);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(runtimes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[derive(Clone)]
    struct CountingEnv {
        steps: Arc<AtomicUsize>,
        in_critical: Arc<AtomicBool>,
    }

    impl Environment for CountingEnv {
        type Action = usize;
        type Observation = usize;

        fn reset(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn step(&mut self, _action: &usize) -> Result<EnvStep<usize>> {
            assert!(
                !self.in_critical.swap(true, Ordering::SeqCst),
                "concurrent step detected"
            );
            thread::sleep(Duration::from_millis(5));
            self.in_critical.store(false, Ordering::SeqCst);
            let steps = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(EnvStep {
                observation: steps,
                reward: 1.0,
                done: false,
            })
        }

        fn fork(&self) -> Result<Self> {
            Ok(self.clone())
        }
    }

    fn counting_env() -> CountingEnv {
        CountingEnv {
            steps: Arc::new(AtomicUsize::new(0)),
            in_critical: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn test_default_lock_is_shared_process_wide() {
        let a = LockedEnv::new(counting_env());
        let b = LockedEnv::new(counting_env());
        assert!(Arc::ptr_eq(&a.step_lock(), &b.step_lock()));
    }

    #[test]
    fn test_fork_shares_the_parent_lock() {
        let lock = Arc::new(Mutex::new(()));
        let parent = LockedEnv::with_lock(counting_env(), Arc::clone(&lock));
        let forked = parent.fork().unwrap();
        assert!(Arc::ptr_eq(&parent.step_lock(), &forked.step_lock()));
    }

    #[test]
    fn test_steps_are_mutually_exclusive_across_fork() {
        let lock = Arc::new(Mutex::new(()));
        let mut parent = LockedEnv::with_lock(counting_env(), Arc::clone(&lock));
        let mut forked = parent.fork().unwrap();

        let handle = thread::spawn(move || {
            for _ in 0..10 {
                forked.step(&0).unwrap();
            }
        });
        for _ in 0..10 {
            parent.step(&0).unwrap();
        }
        handle.join().unwrap();
    }

    struct ScriptedRuntimes {
        batches: Vec<Result<Vec<f64>>>,
    }

    impl RuntimeObservation for ScriptedRuntimes {
        fn runtimes(&mut self, _count: usize) -> Result<Vec<f64>> {
            if self.batches.is_empty() {
                Ok(vec![0.1, 0.2, 0.3])
            } else {
                self.batches.remove(0)
            }
        }
    }

    #[test]
    fn test_measure_runtimes_collects_full_batches() {
        let mut env = ScriptedRuntimes { batches: vec![] };
        let runtimes = measure_runtimes(&mut env, 3, Duration::from_millis(50)).unwrap();
        assert!(!runtimes.is_empty());
        assert_eq!(runtimes.len() % 3, 0);
    }

    #[test]
    fn test_measure_runtimes_records_sentinel_on_timeout() {
        let mut env = ScriptedRuntimes {
            batches: vec![
                Ok(vec![0.5, 0.5, 0.5]),
                Err(TunepoolError::Timeout { seconds: 900 }),
            ],
        };
        let runtimes = measure_runtimes(&mut env, 3, Duration::from_secs(60)).unwrap();
        assert_eq!(runtimes, vec![0.5, 0.5, 0.5, f64::INFINITY]);
    }

    #[test]
    fn test_measure_runtimes_rejects_short_batch() {
        let mut env = ScriptedRuntimes {
            batches: vec![Ok(vec![0.5])],
        };
        let err = measure_runtimes(&mut env, 3, Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, TunepoolError::Service { .. }));
    }

    #[test]
    fn test_measure_runtimes_propagates_other_failures() {
        let mut env = ScriptedRuntimes {
            batches: vec![Err(TunepoolError::Service {
                message: "connection reset".to_string(),
            })],
        };
        let err = measure_runtimes(&mut env, 3, Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, TunepoolError::Service { .. }));
    }
}
