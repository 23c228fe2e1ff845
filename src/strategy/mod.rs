//! Strategy module: adaptive policy, run metrics and rotation decisions
//!
//! # Components
//!
//! - `Policy` / `PolicyUpdate`: typed policy with per-field clamping
//! - `RunMetrics`: latency window, failure streak, counters, admission slots
//! - `StrategyStore`: owns the policy and decides when to rotate identities

mod metrics;
mod policy;
mod store;

pub use metrics::{
    HealthSnapshot, RotationInputs, RunMetrics, SlotGuard, DELAY_QUALIFIED_SECS, LATENCY_WINDOW,
    PUSH_QUALIFIED_SECS,
};
pub use policy::{normalize_subject, Policy, PolicyUpdate};
pub use store::{RotationSignals, StrategyStore, MIN_LATENCY_SAMPLES};
