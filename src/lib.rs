//! Crawl-Rotor: an adaptive crawl orchestrator
//!
//! This crate drives a single crawl control loop against a rotating pool of
//! outbound proxy identities. Live feedback from each cycle (failures and
//! latency) decides when the loop rotates to a fresh identity, while a
//! validated policy governs pacing and admission control.

pub mod config;
pub mod control;
pub mod orchestrator;
pub mod pool;
pub mod server;
pub mod strategy;

use thiserror::Error;

/// Main error type for Crawl-Rotor operations
#[derive(Debug, Error)]
pub enum RotorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors for malformed control-surface input
///
/// These are rejected at the boundary and never touch shared state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed address '{0}', expected 'host:port' (e.g. 1.2.3.4:7891)")]
    MalformedAddress(String),

    #[error("Unsupported protocol '{0}', expected 'http' or 'socks5'")]
    UnknownProtocol(String),
}

/// Result type alias for Crawl-Rotor operations
pub type Result<T> = std::result::Result<T, RotorError>;

/// Result type alias for boundary validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

// Re-export commonly used types
pub use config::Config;
pub use control::ControlSurface;
pub use orchestrator::{Orchestrator, OrchestratorState, WorkCallback, WorkOutcome};
pub use pool::{Identity, IdentityPool, Protocol};
pub use strategy::{Policy, PolicyUpdate, RunMetrics, StrategyStore};
