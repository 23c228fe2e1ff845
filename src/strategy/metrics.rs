//! Run metrics: rolling latency window, failure streak, cumulative counts
//! and the admission-control slot counter.

use crate::orchestrator::OrchestratorState;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Number of cycle latencies kept in the rolling window
pub const LATENCY_WINDOW: usize = 10;

/// Average cycle latency (seconds) considered healthy
pub const DELAY_QUALIFIED_SECS: f64 = 3.0;

/// Push latency (seconds) considered healthy
pub const PUSH_QUALIFIED_SECS: f64 = 120.0;

#[derive(Debug)]
struct MetricsState {
    recent_latencies: VecDeque<f64>,
    consecutive_failures: u32,
    last_rotation_at: Instant,
    current_concurrency: u32,
    total_processed: u64,
    total_pushed: u64,
    last_push_latency: Option<f64>,
    rotations: u64,
}

/// Inputs of the rotation decision, copied out under the metrics lock
#[derive(Debug, Clone, PartialEq)]
pub struct RotationInputs {
    pub last_rotation_at: Instant,
    pub consecutive_failures: u32,
    pub recent_latencies: Vec<f64>,
}

/// Read-only health view exposed to the control surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub is_running: bool,
    pub state: OrchestratorState,
    pub current_concurrency: u32,
    pub total_processed: u64,
    pub total_pushed: u64,
    pub recent_latencies: Vec<f64>,
    /// Mean of `recent_latencies`, two decimals, 0 when empty
    pub avg_latency: f64,
    pub last_push_latency: Option<f64>,
    pub delay_qualified: bool,
    pub push_qualified: bool,
    pub consecutive_failures: u32,
    pub rotations: u64,
}

/// Shared run metrics
///
/// Written only by the orchestrator loop and the strategy store; external
/// callers get snapshots.
#[derive(Debug)]
pub struct RunMetrics {
    state: Mutex<MetricsState>,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    /// Fresh metrics; the rotation clock starts now
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MetricsState {
                recent_latencies: VecDeque::with_capacity(LATENCY_WINDOW + 1),
                consecutive_failures: 0,
                last_rotation_at: Instant::now(),
                current_concurrency: 0,
                total_processed: 0,
                total_pushed: 0,
                last_push_latency: None,
                rotations: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a cycle outcome
    ///
    /// Success resets the failure streak and pushes the latency into the
    /// window; failure only extends the streak. Returns the streak length.
    pub fn record_outcome(&self, success: bool, latency: Duration) -> u32 {
        let mut state = self.lock();
        if success {
            state.consecutive_failures = 0;
            state.recent_latencies.push_back(latency.as_secs_f64());
            while state.recent_latencies.len() > LATENCY_WINDOW {
                state.recent_latencies.pop_front();
            }
        } else {
            state.consecutive_failures += 1;
        }
        state.consecutive_failures
    }

    pub fn mark_rotated(&self, now: Instant) {
        let mut state = self.lock();
        state.last_rotation_at = now;
        state.rotations += 1;
    }

    pub fn rotation_inputs(&self) -> RotationInputs {
        let state = self.lock();
        RotationInputs {
            last_rotation_at: state.last_rotation_at,
            consecutive_failures: state.consecutive_failures,
            recent_latencies: state.recent_latencies.iter().copied().collect(),
        }
    }

    /// Takes one admission slot if fewer than `limit` are held
    ///
    /// The slot is released when the returned guard drops, on every exit
    /// path including panics and cancellation.
    pub fn try_acquire_slot(&self, limit: u32) -> Option<SlotGuard<'_>> {
        let mut state = self.lock();
        if state.current_concurrency >= limit {
            return None;
        }
        state.current_concurrency += 1;
        Some(SlotGuard { metrics: self })
    }

    fn release_slot(&self) {
        let mut state = self.lock();
        state.current_concurrency = state.current_concurrency.saturating_sub(1);
    }

    pub fn current_concurrency(&self) -> u32 {
        self.lock().current_concurrency
    }

    pub fn add_processed(&self, items: u64) {
        self.lock().total_processed += items;
    }

    pub fn total_processed(&self) -> u64 {
        self.lock().total_processed
    }

    /// Records delivery of `count` items downstream
    pub fn record_push(&self, latency: Duration, count: u64) {
        let mut state = self.lock();
        state.last_push_latency = Some(round2(latency.as_secs_f64()));
        state.total_pushed += count;
    }

    pub fn rotations(&self) -> u64 {
        self.lock().rotations
    }

    pub fn snapshot(&self, loop_state: OrchestratorState) -> HealthSnapshot {
        let state = self.lock();

        let window = &state.recent_latencies;
        let avg_latency = if window.is_empty() {
            0.0
        } else {
            round2(window.iter().sum::<f64>() / window.len() as f64)
        };
        let recent_latencies: Vec<f64> = window.iter().copied().map(round2).collect();

        HealthSnapshot {
            is_running: loop_state == OrchestratorState::Running,
            state: loop_state,
            current_concurrency: state.current_concurrency,
            total_processed: state.total_processed,
            total_pushed: state.total_pushed,
            recent_latencies,
            avg_latency,
            last_push_latency: state.last_push_latency,
            delay_qualified: avg_latency <= DELAY_QUALIFIED_SECS,
            push_qualified: !matches!(
                state.last_push_latency,
                Some(latency) if latency > PUSH_QUALIFIED_SECS
            ),
            consecutive_failures: state.consecutive_failures,
            rotations: state.rotations,
        }
    }
}

/// One held admission slot; dropping it releases the slot
#[derive(Debug)]
pub struct SlotGuard<'a> {
    metrics: &'a RunMetrics,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.metrics.release_slot();
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
