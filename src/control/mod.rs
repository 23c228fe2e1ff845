//! Control surface: the typed operations exposed to operators
//!
//! Every operation validates its input before touching shared state, and
//! returns plain values (copies) rather than references into the stores.
//! The REST layer in `server` is a thin mapping onto these methods.

mod types;

pub use types::{AddIdentityRequest, AddResponse, RemoveResponse, StartResponse, StopResponse};

use crate::config::{validate, Config};
use crate::orchestrator::{CycleReport, HttpWork, LoopSettings, Orchestrator};
use crate::pool::{validate_address, HttpProbe, IdentityPool, PoolStatus, Protocol};
use crate::strategy::{HealthSnapshot, Policy, PolicyUpdate, RunMetrics, StrategyStore};
use crate::{ValidationError, ValidationResult};
use std::sync::Arc;

/// Operator-facing facade over the orchestrator and its stores
pub struct ControlSurface {
    orchestrator: Arc<Orchestrator>,
}

impl ControlSurface {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Wires the pool, strategy store, HTTP work callback and orchestrator
    /// described by `config`
    ///
    /// The config is validated again since it may have been built in code
    /// rather than parsed.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        validate(config)?;
        let settings = LoopSettings::from(&config.orchestrator);

        let pool = Arc::new(IdentityPool::new(Arc::new(HttpProbe::from_config(
            &config.probe,
        ))));
        let strategy = Arc::new(StrategyStore::new(
            Policy::from_overrides(&config.policy),
            Arc::new(RunMetrics::new()),
        ));
        let work = Arc::new(HttpWork::new(&config.work, settings.work_timeout));

        Ok(Self::new(Arc::new(Orchestrator::new(
            pool, strategy, work, settings,
        ))))
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn start_loop(&self) -> StartResponse {
        StartResponse {
            started: self.orchestrator.start(),
        }
    }

    pub async fn stop_loop(&self) -> StopResponse {
        StopResponse {
            stopped: self.orchestrator.stop().await,
        }
    }

    /// Runs one cycle on demand, independent of the loop state
    pub async fn test_cycle(&self) -> CycleReport {
        self.orchestrator.run_single_cycle().await
    }

    pub fn get_health(&self) -> HealthSnapshot {
        self.orchestrator.health()
    }

    pub fn get_policy(&self) -> Policy {
        self.orchestrator.strategy().get()
    }

    /// Applies a partial policy update; out-of-range numbers are clamped
    pub fn update_policy(&self, update: &PolicyUpdate) -> Policy {
        self.orchestrator.strategy().update(update)
    }

    /// Validates, probes and pools a new identity
    ///
    /// `added` is false for a duplicate address or a failed probe; in the
    /// latter case the identity is still recorded as invalid.
    pub async fn add_identity(&self, request: &AddIdentityRequest) -> ValidationResult<AddResponse> {
        let address = request.address.trim();
        validate_address(address).inspect_err(|e| tracing::warn!(error = %e, "add rejected"))?;

        let protocol = match request.protocol.as_deref().map(str::trim) {
            None | Some("") => Protocol::Http,
            Some(raw) => raw
                .parse::<Protocol>()
                .inspect_err(|e| tracing::warn!(error = %e, "add rejected"))?,
        };

        let added = self.orchestrator.pool().add(address, protocol).await;
        Ok(AddResponse { added })
    }

    /// Removes an identity; `removed` is false if it was not pooled
    pub fn remove_identity(&self, address: &str) -> ValidationResult<RemoveResponse> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ValidationError::MalformedAddress(address.to_string()));
        }

        Ok(RemoveResponse {
            removed: self.orchestrator.pool().remove(address),
        })
    }

    pub fn get_pool_status(&self) -> PoolStatus {
        self.orchestrator.pool().status()
    }
}
