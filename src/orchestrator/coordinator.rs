//! Orchestrator coordinator - the crawl control loop
//!
//! This module owns the background task that repeatedly:
//! - Decides whether to rotate to a fresh identity
//! - Takes an admission slot under the policy's concurrency limit
//! - Runs the work callback under a timeout, racing it against stop
//! - Records the outcome and paces itself by the cycle interval
//!
//! A failing cycle never ends the loop; only `stop` does.

use crate::config::OrchestratorConfig;
use crate::orchestrator::{OrchestratorState, WorkCallback, WorkOutcome};
use crate::pool::{Identity, IdentityPool};
use crate::strategy::{HealthSnapshot, RotationSignals, StrategyStore};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Fixed delays and bounds of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Pause before retrying when no admission slot is free
    pub slot_backoff: Duration,

    /// Pause after a failed cycle, used instead of the cycle interval
    pub recovery_delay: Duration,

    /// Wall-clock bound on one work callback invocation
    pub work_timeout: Duration,

    /// How long `stop` waits for the loop task before aborting it
    pub shutdown_grace: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for LoopSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            slot_backoff: Duration::from_millis(config.slot_backoff_ms),
            recovery_delay: Duration::from_secs(config.recovery_delay_secs),
            work_timeout: Duration::from_secs(config.work_timeout_secs),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }
}

/// Notified every time the loop rotates identities
pub trait RotationObserver: Send + Sync {
    /// `identity` is `None` when the rotation found no valid identity
    fn on_rotation(&self, signals: &RotationSignals, identity: Option<&Identity>);
}

/// What one cycle did, as reported to callers of a test cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub success: bool,
    pub item_count: u64,

    /// Address of the identity used, `None` in direct mode
    pub identity: Option<String>,

    pub rotated: bool,
    pub latency_secs: f64,
    pub error: Option<String>,
}

#[derive(Debug)]
enum CycleOutcome {
    Completed(CycleReport),
    SlotUnavailable,
    Cancelled,
}

struct LoopControl {
    state: OrchestratorState,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

/// Components the loop task shares with the control side
struct Shared {
    pool: Arc<IdentityPool>,
    strategy: Arc<StrategyStore>,
    work: Arc<dyn WorkCallback>,
    settings: LoopSettings,
    observer: Option<Arc<dyn RotationObserver>>,
}

/// Runs the crawl control loop on a background tokio task
pub struct Orchestrator {
    shared: Arc<Shared>,
    control: Arc<Mutex<LoopControl>>,
}

impl Orchestrator {
    pub fn new(
        pool: Arc<IdentityPool>,
        strategy: Arc<StrategyStore>,
        work: Arc<dyn WorkCallback>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool,
                strategy,
                work,
                settings,
                observer: None,
            }),
            control: Arc::new(Mutex::new(LoopControl {
                state: OrchestratorState::Idle,
                token: None,
                handle: None,
            })),
        }
    }

    /// Registers a hook that sees every rotation
    ///
    /// Must be called before the orchestrator is shared.
    pub fn with_observer(mut self, observer: Arc<dyn RotationObserver>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.observer = Some(observer);
        } else {
            tracing::warn!("orchestrator already shared, rotation observer ignored");
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, LoopControl> {
        lock_control(&self.control)
    }

    pub fn pool(&self) -> &Arc<IdentityPool> {
        &self.shared.pool
    }

    pub fn strategy(&self) -> &Arc<StrategyStore> {
        &self.shared.strategy
    }

    pub fn settings(&self) -> LoopSettings {
        self.shared.settings
    }

    pub fn state(&self) -> OrchestratorState {
        self.lock().state
    }

    pub fn health(&self) -> HealthSnapshot {
        self.shared.strategy.metrics().snapshot(self.state())
    }

    /// Spawns the loop task
    ///
    /// Returns `false` (and does nothing) unless the orchestrator is idle.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut control = self.lock();
        if !control.state.can_transition_to(OrchestratorState::Running) {
            tracing::warn!(state = %control.state, "start rejected, loop not idle");
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared), token.clone()));

        control.state = OrchestratorState::Running;
        control.token = Some(token);
        control.handle = Some(handle);

        tracing::info!("orchestrator started");
        true
    }

    /// Signals the loop to stop and waits up to the grace period for it
    ///
    /// Returns `false` unless the loop was running. If the task does not
    /// exit within the grace period it is aborted.
    ///
    /// The wait runs on its own task, so dropping this future (for example
    /// when an HTTP client disconnects) still returns the loop to `Idle`.
    pub async fn stop(&self) -> bool {
        let (token, handle) = {
            let mut control = self.lock();
            if !control.state.can_transition_to(OrchestratorState::Stopping) {
                tracing::warn!(state = %control.state, "stop rejected, loop not running");
                return false;
            }
            control.state = OrchestratorState::Stopping;
            (control.token.take(), control.handle.take())
        };

        tracing::info!("stopping orchestrator");
        if let Some(token) = token {
            token.cancel();
        }

        let control = Arc::clone(&self.control);
        let grace = self.shared.settings.shutdown_grace;
        let finish = tokio::spawn(async move {
            if let Some(mut handle) = handle {
                match tokio::time::timeout(grace, &mut handle).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "orchestrator task failed"),
                    Err(_) => {
                        tracing::warn!(?grace, "orchestrator did not exit in time, aborting");
                        handle.abort();
                    }
                }
            }

            lock_control(&control).state = OrchestratorState::Idle;
            tracing::info!("orchestrator stopped");
        });

        if let Err(e) = finish.await {
            tracing::error!(error = %e, "orchestrator shutdown task failed");
            lock_control(&self.control).state = OrchestratorState::Idle;
        }
        true
    }

    /// Runs exactly one cycle outside the loop
    ///
    /// Goes through the same identity selection, admission and recording
    /// path as a loop cycle. A saturated slot counter yields a failed
    /// report without invoking the work callback.
    pub async fn run_single_cycle(&self) -> CycleReport {
        let token = CancellationToken::new();
        match self.shared.run_cycle(&token).await {
            CycleOutcome::Completed(report) => report,
            CycleOutcome::SlotUnavailable | CycleOutcome::Cancelled => CycleReport {
                success: false,
                item_count: 0,
                identity: None,
                rotated: false,
                latency_secs: 0.0,
                error: Some("no admission slot available".to_string()),
            },
        }
    }
}

fn lock_control(control: &Mutex<LoopControl>) -> MutexGuard<'_, LoopControl> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_loop(shared: Arc<Shared>, token: CancellationToken) {
    tracing::info!("orchestrator loop running");

    loop {
        let pause = match shared.run_cycle(&token).await {
            CycleOutcome::Cancelled => break,
            CycleOutcome::SlotUnavailable => {
                tracing::debug!("no admission slot, backing off");
                shared.settings.slot_backoff
            }
            CycleOutcome::Completed(report) if report.success => {
                shared.strategy.get().cycle_interval()
            }
            CycleOutcome::Completed(report) => {
                tracing::warn!(
                    error = report.error.as_deref().unwrap_or("unknown"),
                    identity = report.identity.as_deref().unwrap_or("direct"),
                    "cycle failed, recovering"
                );
                shared.settings.recovery_delay
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::info!("orchestrator loop exited");
}

impl Shared {
    async fn run_cycle(&self, token: &CancellationToken) -> CycleOutcome {
        let policy = self.strategy.get();
        let metrics = self.strategy.metrics();

        let signals = self
            .strategy
            .evaluate(Instant::now(), &metrics.rotation_inputs());
        let rotated = signals.any();

        let identity = if rotated {
            self.pool.select_valid()
        } else {
            self.pool.current().or_else(|| self.pool.select_valid())
        };
        if identity.is_none() {
            tracing::debug!("no valid identity, running direct");
        }

        if token.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        let Some(slot) = metrics.try_acquire_slot(policy.concurrency_limit) else {
            return CycleOutcome::SlotUnavailable;
        };

        let started = Instant::now();
        let work = AssertUnwindSafe(self.work.execute(
            identity.as_ref(),
            &policy.target_subject,
            policy.max_items_per_cycle,
        ))
        .catch_unwind();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return CycleOutcome::Cancelled,
            result = tokio::time::timeout(self.settings.work_timeout, work) => match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => WorkOutcome::failed("work callback panicked"),
                Err(_) => WorkOutcome::failed(format!(
                    "work timed out after {}s",
                    self.settings.work_timeout.as_secs()
                )),
            },
        };
        let latency = started.elapsed();
        drop(slot);

        self.strategy.record_outcome(outcome.success, latency);
        if rotated {
            self.strategy.mark_rotated(Instant::now());
            if let Some(observer) = &self.observer {
                observer.on_rotation(&signals, identity.as_ref());
            }
            tracing::info!(
                identity = identity.as_ref().map_or("direct", |i| i.address.as_str()),
                "rotated identity"
            );
        }

        metrics.add_processed(outcome.item_count);
        if let Some(push_latency) = outcome.push_latency {
            self.strategy.record_push(push_latency, outcome.pushed_count);
        }

        tracing::debug!(
            success = outcome.success,
            items = outcome.item_count,
            latency_ms = latency.as_millis() as u64,
            "cycle complete"
        );

        CycleOutcome::Completed(CycleReport {
            success: outcome.success,
            item_count: outcome.item_count,
            identity: identity.map(|i| i.address),
            rotated,
            latency_secs: (latency.as_secs_f64() * 100.0).round() / 100.0,
            error: outcome.error,
        })
    }
}
