//! Integration tests for Crawl-Rotor
//!
//! These drive the orchestrator loop end-to-end on a paused tokio clock and
//! exercise the REST control plane through `tower::ServiceExt::oneshot`.

mod api_tests;
mod orchestrator_tests;
mod support;
