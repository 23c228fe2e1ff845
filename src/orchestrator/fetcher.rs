//! Built-in HTTP work callback
//!
//! This module provides a generic `WorkCallback` that:
//! - Routes the request through the selected identity (or goes direct)
//! - Renders the target URL from a `{subject}` / `{limit}` template
//! - Classifies HTTP and network errors into failed outcomes
//! - Counts the items found at a JSON pointer in the response

use crate::config::WorkConfig;
use crate::orchestrator::{WorkCallback, WorkOutcome};
use crate::pool::Identity;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde_json::Value;
use std::time::Duration;

/// Fetches one JSON listing per cycle and counts its items
#[derive(Debug, Clone)]
pub struct HttpWork {
    url_template: String,
    items_pointer: String,
    user_agent: String,
    timeout: Duration,
}

impl HttpWork {
    pub fn new(config: &WorkConfig, timeout: Duration) -> Self {
        Self {
            url_template: config.url_template.clone(),
            items_pointer: config.items_pointer.clone(),
            user_agent: config.user_agent.clone(),
            timeout,
        }
    }

    /// Renders the request URL for a subject and item budget
    pub fn render_url(&self, subject: &str, max_items: u32) -> String {
        self.url_template
            .replace("{subject}", subject)
            .replace("{limit}", &max_items.to_string())
    }

    /// Builds a client for one cycle, proxied through `identity` if given
    fn build_client(&self, identity: Option<&Identity>) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(identity) = identity {
            builder = builder.proxy(Proxy::all(identity.proxy_url())?);
        }

        builder.build()
    }

    async fn fetch(&self, client: &Client, url: &str, max_items: u32) -> WorkOutcome {
        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return WorkOutcome::failed(describe_error(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            return WorkOutcome::failed(format!("HTTP {}", status.as_u16()));
        }

        match response.json::<Value>().await {
            Ok(body) => {
                let items = count_items(&body, &self.items_pointer).min(max_items as usize);
                WorkOutcome::succeeded(items as u64)
            }
            Err(e) => WorkOutcome::failed(format!("invalid JSON body: {}", e)),
        }
    }
}

#[async_trait]
impl WorkCallback for HttpWork {
    async fn execute(
        &self,
        identity: Option<&Identity>,
        subject: &str,
        max_items: u32,
    ) -> WorkOutcome {
        let url = self.render_url(subject, max_items);

        let client = match self.build_client(identity) {
            Ok(client) => client,
            Err(e) => return WorkOutcome::failed(format!("could not build client: {}", e)),
        };

        tracing::debug!(
            %url,
            proxy = identity.map(|i| i.address.as_str()).unwrap_or("direct"),
            "fetching work listing"
        );
        self.fetch(&client, &url, max_items).await
    }
}

/// Number of array elements at `pointer` (empty pointer = document root)
pub fn count_items(body: &Value, pointer: &str) -> usize {
    let target = if pointer.is_empty() {
        Some(body)
    } else {
        body.pointer(pointer)
    };
    target.and_then(Value::as_array).map_or(0, Vec::len)
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}
