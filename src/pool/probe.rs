//! Liveness probing for candidate identities
//!
//! A probe issues one bounded-timeout GET against a fixed reference URL,
//! routed through the candidate as a proxy. HTTP 200 or 302 means the
//! identity is usable.

use crate::config::ProbeConfig;
use crate::pool::identity::proxy_url;
use crate::pool::Protocol;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;

/// Checks whether a proxy can reach the reference target
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns `true` when the proxy is usable. Never errors: any failure
    /// to connect or an unexpected status counts as not live.
    async fn check(&self, address: &str, protocol: Protocol) -> bool;
}

/// Probe backed by a real HTTP request through the candidate proxy
#[derive(Debug, Clone)]
pub struct HttpProbe {
    target_url: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpProbe {
    pub fn new(target_url: impl Into<String>, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            timeout,
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.target_url.clone(),
            config.timeout(),
            config.user_agent.clone(),
        )
    }

    fn build_client(&self, address: &str, protocol: Protocol) -> Result<Client, reqwest::Error> {
        Client::builder()
            .proxy(Proxy::all(proxy_url(address, protocol))?)
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn check(&self, address: &str, protocol: Protocol) -> bool {
        let client = match self.build_client(address, protocol) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(%address, %protocol, error = %e, "could not build probe client");
                return false;
            }
        };

        match client.get(&self.target_url).send().await {
            Ok(response) => {
                let status = response.status();
                let live = is_live_status(status);
                tracing::info!(
                    %address,
                    %protocol,
                    status = status.as_u16(),
                    live,
                    "identity probe finished"
                );
                live
            }
            Err(e) => {
                tracing::info!(%address, %protocol, error = %e, "identity probe failed");
                false
            }
        }
    }
}

/// Status codes accepted as proof that the proxy works
pub fn is_live_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::FOUND
}
