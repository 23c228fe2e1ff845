use crate::strategy::{Policy, PolicyUpdate, RotationInputs, RunMetrics};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Minimum latency samples before the latency signal can fire
pub const MIN_LATENCY_SAMPLES: usize = 3;

/// Individually observable rotation conditions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSignals {
    /// Time since the last rotation reached the rotation interval
    pub time_based: bool,

    /// The failure streak reached the fail threshold
    pub failure_based: bool,

    /// At least three samples and their mean reached the delay threshold
    pub latency_based: bool,

    pub elapsed: Duration,
    pub consecutive_failures: u32,
    pub avg_latency: Option<f64>,
}

impl RotationSignals {
    pub fn any(&self) -> bool {
        self.time_based || self.failure_based || self.latency_based
    }
}

/// Holds the adaptive policy and decides when to rotate identities
pub struct StrategyStore {
    policy: Mutex<Policy>,
    metrics: Arc<RunMetrics>,
}

impl StrategyStore {
    pub fn new(policy: Policy, metrics: Arc<RunMetrics>) -> Self {
        Self {
            policy: Mutex::new(policy),
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Policy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Returns a copy of the current policy
    pub fn get(&self) -> Policy {
        self.lock().clone()
    }

    /// Applies a partial update and returns the resulting policy
    ///
    /// Numbers are clamped into range and an invalid subject is skipped.
    /// An update with no recognised fields leaves the policy unchanged.
    pub fn update(&self, update: &PolicyUpdate) -> Policy {
        let mut policy = self.lock();
        if update.is_empty() {
            tracing::info!("policy update carried no recognised fields, nothing changed");
            return policy.clone();
        }

        let applied = policy.apply(update);
        tracing::info!(fields = ?applied, "policy updated");
        policy.clone()
    }

    /// Evaluates each rotation condition against `inputs` at time `now`
    pub fn rotation_signals(&self, now: Instant, inputs: &RotationInputs) -> RotationSignals {
        let policy = self.get();

        let elapsed = now.saturating_duration_since(inputs.last_rotation_at);
        let avg_latency = mean(&inputs.recent_latencies);

        RotationSignals {
            time_based: elapsed >= policy.rotation_interval(),
            failure_based: inputs.consecutive_failures >= policy.fail_threshold,
            latency_based: inputs.recent_latencies.len() >= MIN_LATENCY_SAMPLES
                && avg_latency.is_some_and(|avg| avg >= f64::from(policy.delay_threshold_secs)),
            elapsed,
            consecutive_failures: inputs.consecutive_failures,
            avg_latency,
        }
    }

    /// True when any rotation condition holds; each one is logged
    pub fn should_rotate(&self, now: Instant, inputs: &RotationInputs) -> bool {
        self.evaluate(now, inputs).any()
    }

    /// Like `should_rotate`, but hands back the individual signals
    pub fn evaluate(&self, now: Instant, inputs: &RotationInputs) -> RotationSignals {
        let signals = self.rotation_signals(now, inputs);

        if signals.time_based {
            tracing::info!(elapsed_secs = signals.elapsed.as_secs(), "rotation due: interval elapsed");
        }
        if signals.failure_based {
            tracing::info!(
                failures = signals.consecutive_failures,
                "rotation due: consecutive failures"
            );
        }
        if signals.latency_based {
            tracing::info!(avg_latency = ?signals.avg_latency, "rotation due: latency degraded");
        }

        signals
    }

    /// Records a cycle outcome into the run metrics
    pub fn record_outcome(&self, success: bool, latency: Duration) {
        let failures = self.metrics.record_outcome(success, latency);
        if !success {
            tracing::debug!(failures, "cycle failed");
        }
    }

    pub fn mark_rotated(&self, now: Instant) {
        self.metrics.mark_rotated(now);
    }

    pub fn record_push(&self, latency: Duration, count: u64) {
        self.metrics.record_push(latency, count);
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
