use crate::pool::{Identity, LivenessProbe, Protocol};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Read-only snapshot of the pool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Percentage of valid identities, rounded to two decimals
    pub valid_rate: f64,
    pub identities: Vec<Identity>,
}

#[derive(Debug, Default)]
struct PoolInner {
    /// Kept in insertion order; ties in selection go to the earlier entry
    entries: Vec<Identity>,

    /// Address of the most recently selected identity
    current: Option<String>,
}

/// Tracks proxy identities and hands out the least-recently-used valid one
///
/// Every operation takes the single internal lock for the shortest possible
/// section and returns copies, never references into the pool.
pub struct IdentityPool {
    inner: Mutex<PoolInner>,
    probe: Arc<dyn LivenessProbe>,
}

impl IdentityPool {
    /// Creates an empty pool that checks new identities with `probe`
    pub fn new(probe: Arc<dyn LivenessProbe>) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            probe,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an identity after probing it
    ///
    /// Returns `false` without probing if the address is already pooled.
    /// Otherwise the identity is inserted with its probed validity and the
    /// probe result is returned, so an unreachable proxy is still recorded
    /// (as invalid) but reported as not added.
    pub async fn add(&self, address: &str, protocol: Protocol) -> bool {
        if self.contains(address) {
            tracing::info!(%address, "identity already pooled, skipping");
            return false;
        }

        // Probe outside the lock; it can take up to the probe timeout
        let valid = self.probe.check(address, protocol).await;

        if !self.insert(Identity::new(address, protocol, valid)) {
            tracing::info!(%address, "identity was added concurrently, skipping");
            return false;
        }

        tracing::info!(%address, %protocol, valid, "identity added to pool");
        valid
    }

    /// Inserts an already-probed identity; `false` on duplicate address
    pub fn insert(&self, identity: Identity) -> bool {
        let mut inner = self.lock();
        if inner.entries.iter().any(|e| e.address == identity.address) {
            return false;
        }
        inner.entries.push(identity);
        true
    }

    /// Removes an identity; `false` if it was not pooled
    pub fn remove(&self, address: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.address != address);
        let removed = inner.entries.len() < before;

        if removed && inner.current.as_deref() == Some(address) {
            inner.current = None;
        }
        drop(inner);

        if removed {
            tracing::info!(%address, "identity removed from pool");
        } else {
            tracing::warn!(%address, "identity not in pool, nothing removed");
        }
        removed
    }

    pub fn contains(&self, address: &str) -> bool {
        self.lock().entries.iter().any(|e| e.address == address)
    }

    /// Selects the valid identity with the oldest (or no) last-use time
    ///
    /// The chosen identity is stamped with the current time and becomes the
    /// current identity. Returns `None` when no valid identity exists.
    pub fn select_valid(&self) -> Option<Identity> {
        let mut inner = self.lock();

        // Option orders None first, so never-used identities win.
        // min_by_key keeps the first of equal keys, i.e. insertion order.
        let selected = inner
            .entries
            .iter_mut()
            .filter(|e| e.valid)
            .min_by_key(|e| e.last_used_at)?;

        selected.last_used_at = Some(Utc::now());
        let selected = selected.clone();
        inner.current = Some(selected.address.clone());
        drop(inner);

        tracing::debug!(
            address = %selected.address,
            protocol = %selected.protocol,
            "selected identity"
        );
        Some(selected)
    }

    /// Returns the current identity without re-selecting
    ///
    /// `None` if nothing was selected yet, or the current identity has been
    /// removed or is no longer valid.
    pub fn current(&self) -> Option<Identity> {
        let inner = self.lock();
        let address = inner.current.as_deref()?;
        inner
            .entries
            .iter()
            .find(|e| e.address == address && e.valid)
            .cloned()
    }

    pub fn status(&self) -> PoolStatus {
        let identities = self.lock().entries.clone();

        let total = identities.len();
        let valid = identities.iter().filter(|e| e.valid).count();
        let valid_rate = if total > 0 {
            (valid as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        PoolStatus {
            total,
            valid,
            invalid: total - valid,
            valid_rate,
            identities,
        }
    }
}
