//! Orchestrator module: the crawl control loop and its work boundary
//!
//! # Components
//!
//! - `coordinator`: lifecycle, identity selection, admission and pacing
//! - `work`: the `WorkCallback` trait and `WorkOutcome`
//! - `fetcher`: a ready-made HTTP `WorkCallback`
//! - `state`: loop lifecycle states

mod coordinator;
mod fetcher;
mod state;
mod work;

pub use coordinator::{CycleReport, LoopSettings, Orchestrator, RotationObserver};
pub use fetcher::{count_items, HttpWork};
pub use state::OrchestratorState;
pub use work::{WorkCallback, WorkOutcome};
