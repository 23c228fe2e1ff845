//! Adaptive policy and its clamping rules
//!
//! Every numeric field has exactly one clamp function. Both the initial
//! policy (defaults plus config overrides) and runtime updates go through
//! `Policy::apply`, so the two paths cannot drift apart.

use crate::config::PolicyOverrides;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

pub const CONCURRENCY_LIMIT_RANGE: (u32, u32) = (1, 100);
pub const CYCLE_INTERVAL_RANGE: (u32, u32) = (10, 120);
pub const ROTATION_INTERVAL_RANGE: (u32, u32) = (60, 3600);
pub const RETRY_COUNT_RANGE: (u32, u32) = (1, 10);
pub const FAIL_THRESHOLD_RANGE: (u32, u32) = (1, 5);
pub const DELAY_THRESHOLD_RANGE: (u32, u32) = (3, 30);
pub const MAX_ITEMS_RANGE: (u32, u32) = (1, 20);

/// The current adaptive parameter set
///
/// Invariant: every numeric field lies inside its declared range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub concurrency_limit: u32,

    /// Seconds slept between successful cycles
    #[serde(rename = "cycleInterval")]
    pub cycle_interval_secs: u32,

    /// Seconds after which an identity is rotated regardless of health
    #[serde(rename = "rotationInterval")]
    pub rotation_interval_secs: u32,

    pub retry_count: u32,

    /// Consecutive failures that force a rotation
    pub fail_threshold: u32,

    /// Mean cycle latency (seconds) that forces a rotation
    #[serde(rename = "delayThreshold")]
    pub delay_threshold_secs: u32,

    /// Lowercase alphanumeric subject handed to the work callback
    pub target_subject: String,

    pub max_items_per_cycle: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            concurrency_limit: 50,
            cycle_interval_secs: 60,
            rotation_interval_secs: 300,
            retry_count: 3,
            fail_threshold: 3,
            delay_threshold_secs: 8,
            target_subject: "python".to_string(),
            max_items_per_cycle: 10,
        }
    }
}

impl Policy {
    /// Default policy with config overrides applied
    pub fn from_overrides(overrides: &PolicyOverrides) -> Self {
        let mut policy = Self::default();
        policy.apply(&PolicyUpdate::from(overrides));
        policy
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.cycle_interval_secs))
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.rotation_interval_secs))
    }

    /// Applies every present field of `update`, clamping numbers and
    /// skipping an invalid subject. Returns the names of fields applied.
    pub fn apply(&mut self, update: &PolicyUpdate) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(v) = update.concurrency_limit {
            self.concurrency_limit = clamp(v, CONCURRENCY_LIMIT_RANGE);
            applied.push("concurrencyLimit");
        }
        if let Some(v) = update.cycle_interval {
            self.cycle_interval_secs = clamp(v, CYCLE_INTERVAL_RANGE);
            applied.push("cycleInterval");
        }
        if let Some(v) = update.rotation_interval {
            self.rotation_interval_secs = clamp(v, ROTATION_INTERVAL_RANGE);
            applied.push("rotationInterval");
        }
        if let Some(v) = update.retry_count {
            self.retry_count = clamp(v, RETRY_COUNT_RANGE);
            applied.push("retryCount");
        }
        if let Some(v) = update.fail_threshold {
            self.fail_threshold = clamp(v, FAIL_THRESHOLD_RANGE);
            applied.push("failThreshold");
        }
        if let Some(v) = update.delay_threshold {
            self.delay_threshold_secs = clamp(v, DELAY_THRESHOLD_RANGE);
            applied.push("delayThreshold");
        }
        if let Some(subject) = &update.target_subject {
            match normalize_subject(subject) {
                Some(subject) => {
                    self.target_subject = subject;
                    applied.push("targetSubject");
                }
                None => {
                    tracing::warn!(%subject, "target subject must be alphanumeric, skipping");
                }
            }
        }
        if let Some(v) = update.max_items_per_cycle {
            self.max_items_per_cycle = clamp(v, MAX_ITEMS_RANGE);
            applied.push("maxItemsPerCycle");
        }

        applied
    }
}

/// Partial policy update; absent fields are left untouched
///
/// Unknown fields are ignored. The aliases accept the field names used by
/// earlier clients of the control surface. Numbers are read leniently
/// (floats truncate, numeric strings parse, anything else is skipped) so a
/// single odd field never discards the rest of the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    #[serde(
        default,
        deserialize_with = "lenient_int",
        alias = "concurrentLimit",
        alias = "concurrent_limit"
    )]
    pub concurrency_limit: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient_int",
        alias = "crawlInterval",
        alias = "crawl_interval"
    )]
    pub cycle_interval: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient_int",
        alias = "ipSwitchInterval",
        alias = "ip_switch_interval"
    )]
    pub rotation_interval: Option<i64>,

    #[serde(default, deserialize_with = "lenient_int", alias = "retry_count")]
    pub retry_count: Option<i64>,

    #[serde(default, deserialize_with = "lenient_int", alias = "fail_threshold")]
    pub fail_threshold: Option<i64>,

    #[serde(default, deserialize_with = "lenient_int", alias = "delay_threshold")]
    pub delay_threshold: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        alias = "targetSubreddit",
        alias = "target_subreddit"
    )]
    pub target_subject: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_int",
        alias = "maxPostsPerCrawl",
        alias = "max_posts_per_crawl"
    )]
    pub max_items_per_cycle: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Other(IgnoredAny),
}

/// Reads an integer field, saturating floats and huge values into `i64`
///
/// Values that are not numbers at all (booleans, arrays, unparsable
/// strings) read as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match LooseNumber::deserialize(deserializer)? {
        LooseNumber::Int(v) => Some(v),
        LooseNumber::Float(v) => float_to_int(v),
        LooseNumber::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(float_to_int))
        }
        LooseNumber::Other(_) => None,
    };
    if value.is_none() {
        tracing::warn!("non-numeric policy value, skipping");
    }
    Ok(value)
}

fn float_to_int(value: f64) -> Option<i64> {
    // `as` truncates toward zero and saturates at the i64 bounds
    (!value.is_nan()).then_some(value as i64)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match LooseText::deserialize(deserializer)? {
        LooseText::Text(text) => Ok(Some(text)),
        LooseText::Other(_) => {
            tracing::warn!("target subject must be a string, skipping");
            Ok(None)
        }
    }
}

impl PolicyUpdate {
    /// True when no recognised field is present
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<&PolicyOverrides> for PolicyUpdate {
    fn from(o: &PolicyOverrides) -> Self {
        Self {
            concurrency_limit: o.concurrency_limit,
            cycle_interval: o.cycle_interval,
            rotation_interval: o.rotation_interval,
            retry_count: o.retry_count,
            fail_threshold: o.fail_threshold,
            delay_threshold: o.delay_threshold,
            target_subject: o.target_subject.clone(),
            max_items_per_cycle: o.max_items_per_cycle,
        }
    }
}

fn clamp(value: i64, (min, max): (u32, u32)) -> u32 {
    // Bounds are u32, so the clamped value always fits
    value.clamp(i64::from(min), i64::from(max)) as u32
}

/// Trims and lowercases a subject; `None` unless non-empty and alphanumeric
pub fn normalize_subject(subject: &str) -> Option<String> {
    let trimmed = subject.trim();
    if trimmed.is_empty() || !trimmed.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some(trimmed.to_lowercase())
}
