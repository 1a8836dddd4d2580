//! Fake bundlers and helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quiver_compiler::{BundleConfig, BundleReport, Bundler, BundlerCrash, CompilerEvent};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Records every call, optionally blocks until released, and replays scripted reports.
pub struct FakeBundler {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Semaphore>,
    delay: Duration,
    script: Mutex<VecDeque<Result<BundleReport, BundlerCrash>>>,
    manifests: Mutex<Vec<String>>,
    started: mpsc::UnboundedSender<usize>,
}

impl FakeBundler {
    /// Succeeds immediately.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (started, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                gate: None,
                delay: Duration::ZERO,
                script: Mutex::new(VecDeque::new()),
                manifests: Mutex::new(Vec::new()),
                started,
            },
            rx,
        )
    }

    /// Each call waits for one [`FakeBundler::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_script(self, script: Vec<Result<BundleReport, BundlerCrash>>) -> Self {
        *self.script.lock() = script.into();
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Manifest text as seen by each call.
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().clone()
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, config: &BundleConfig) -> Result<BundleReport, BundlerCrash> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.manifests
            .lock()
            .push(std::fs::read_to_string(&config.entry).unwrap_or_default());
        let _ = self.started.send(call);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(BundleReport::success()))
    }
}

pub fn tool(root: &Path, name: &str) -> PathBuf {
    root.join("src/tools").join(name)
}

/// Wait for the next event matching `pred`, failing after five seconds.
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<CompilerEvent>,
    pred: impl Fn(&CompilerEvent) -> bool,
) -> CompilerEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for compiler event")
}

pub fn is_success(event: &CompilerEvent) -> bool {
    matches!(event, CompilerEvent::BuildSucceeded { .. })
}

pub fn is_failure(event: &CompilerEvent) -> bool {
    matches!(event, CompilerEvent::BuildFailed { .. })
}
