//! When to bring the network listener up.
//!
//! The first successful build runs the registered [`FirstBuildHook`]. Later
//! successful builds in development start the listener when HTTP is enabled
//! and no adapter owns serving. Starting is idempotent while the listener is
//! alive: both paths go through the same [`ListenerGuard`], and a listener that
//! has exited is started again.

use crate::context::Mode;
use crate::error::{Error, Result};
use async_trait::async_trait;
use quiver_config::QuiverConfig;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Something that serves the bundled runtime.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn start(&self) -> Result<()>;

    /// Whether a started listener is still serving.
    async fn is_running(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    Started,
    AlreadyRunning,
}

/// Serializes listener starts and remembers a successful one until the
/// listener stops running.
pub struct ListenerGuard {
    listener: Arc<dyn Listener>,
    started: Mutex<bool>,
}

impl ListenerGuard {
    pub fn new(listener: Arc<dyn Listener>) -> Self {
        Self {
            listener,
            started: Mutex::new(false),
        }
    }

    /// Start the listener unless it is already up.
    ///
    /// The lock is held across the start, so concurrent callers wait and then
    /// observe [`StartResult::AlreadyRunning`]. A failed start leaves the guard
    /// unstarted. A listener that has exited since its last start is started
    /// again.
    pub async fn ensure_started(&self) -> Result<StartResult> {
        let mut started = self.started.lock().await;
        if *started {
            if self.listener.is_running().await {
                return Ok(StartResult::AlreadyRunning);
            }
            tracing::warn!("listener is no longer running, restarting");
            *started = false;
        }
        self.listener.start().await.map_err(into_listener_error)?;
        *started = true;
        Ok(StartResult::Started)
    }
}

type HookFn = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

/// Runs once, after the first successful build.
pub struct FirstBuildHook(HookFn);

impl FirstBuildHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self(Box::new(move || Box::pin(hook())))
    }

    async fn run(self) -> Result<()> {
        (self.0)().await
    }
}

impl std::fmt::Debug for FirstBuildHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FirstBuildHook")
    }
}

/// What [`ServerLifecycle::on_success`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    FirstBuildHook,
    ListenerStarted,
    ListenerAlreadyRunning,
    None,
}

pub struct ServerLifecycle {
    mode: Mode,
    config: Arc<QuiverConfig>,
    hook: Option<FirstBuildHook>,
    listener: Option<Arc<ListenerGuard>>,
}

impl ServerLifecycle {
    pub fn new(mode: Mode, config: Arc<QuiverConfig>) -> Self {
        Self {
            mode,
            config,
            hook: None,
            listener: None,
        }
    }

    pub fn with_first_build_hook(mut self, hook: FirstBuildHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_listener(mut self, listener: Arc<ListenerGuard>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn listener(&self) -> Option<&Arc<ListenerGuard>> {
        self.listener.as_ref()
    }

    /// Whether a rebuild should make sure the listener is up.
    pub fn starts_on_rebuild(&self) -> bool {
        self.mode.is_development()
            && self.config.http_enabled()
            && !self.config.adapter_enabled()
            && self.listener.is_some()
    }

    /// React to a successful build.
    ///
    /// # Errors
    ///
    /// A failing hook or listener start is returned as [`Error::Listener`].
    pub async fn on_success(&mut self, first: bool) -> Result<LifecycleAction> {
        if first {
            if let Some(hook) = self.hook.take() {
                tracing::debug!("running first-build hook");
                hook.run().await.map_err(into_listener_error)?;
            }
            return Ok(LifecycleAction::FirstBuildHook);
        }

        if !self.starts_on_rebuild() {
            return Ok(LifecycleAction::None);
        }

        let Some(listener) = &self.listener else {
            return Ok(LifecycleAction::None);
        };

        match listener.ensure_started().await? {
            StartResult::Started => {
                tracing::info!("listener started after rebuild");
                Ok(LifecycleAction::ListenerStarted)
            }
            StartResult::AlreadyRunning => Ok(LifecycleAction::ListenerAlreadyRunning),
        }
    }
}

fn into_listener_error(error: Error) -> Error {
    match error {
        Error::Listener(_) => error,
        other => Error::Listener(other.to_string()),
    }
}
