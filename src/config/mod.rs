//! Configuration module for Crawl-Rotor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crawl_rotor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("rotor.toml")).unwrap();
//! println!("Probe target: {}", config.probe.target_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, OrchestratorConfig, PolicyOverrides, ProbeConfig, ServerConfig, WorkConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

// Re-export validation for configs built in code
pub use validation::validate;
