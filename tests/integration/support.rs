//! Test doubles shared by the integration tests

use async_trait::async_trait;
use crawl_rotor::orchestrator::{LoopSettings, Orchestrator, RotationObserver};
use crawl_rotor::pool::{Identity, IdentityPool, LivenessProbe, Protocol};
use crawl_rotor::strategy::{Policy, RotationSignals, RunMetrics, StrategyStore};
use crawl_rotor::{WorkCallback, WorkOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Probe with a fixed answer
pub struct FixedProbe(pub bool);

#[async_trait]
impl LivenessProbe for FixedProbe {
    async fn check(&self, _address: &str, _protocol: Protocol) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed(u64),
    Fail,
    Panic,
}

/// Work callback that follows a fixed script and counts invocations
pub struct ScriptedWork {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedWork {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkCallback for ScriptedWork {
    async fn execute(
        &self,
        _identity: Option<&Identity>,
        _subject: &str,
        _max_items: u32,
    ) -> WorkOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Succeed(items) => WorkOutcome::succeeded(items),
            Script::Fail => WorkOutcome::failed("HTTP 429"),
            Script::Panic => panic!("scripted panic"),
        }
    }
}

/// Records every rotation with the identity it moved to
#[derive(Default)]
pub struct RotationLog {
    pub entries: Mutex<Vec<(RotationSignals, Option<String>)>>,
}

impl RotationLog {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl RotationObserver for RotationLog {
    fn on_rotation(&self, signals: &RotationSignals, identity: Option<&Identity>) {
        self.entries
            .lock()
            .unwrap()
            .push((*signals, identity.map(|i| i.address.clone())));
    }
}

pub fn settings() -> LoopSettings {
    LoopSettings {
        slot_backoff: Duration::from_secs(1),
        recovery_delay: Duration::from_secs(5),
        work_timeout: Duration::from_secs(30),
        shutdown_grace: Duration::from_secs(5),
    }
}

pub fn orchestrator(
    policy: Policy,
    probe_live: bool,
    work: Arc<dyn WorkCallback>,
) -> Orchestrator {
    let pool = Arc::new(IdentityPool::new(Arc::new(FixedProbe(probe_live))));
    let strategy = Arc::new(StrategyStore::new(policy, Arc::new(RunMetrics::new())));
    Orchestrator::new(pool, strategy, work, settings())
}
