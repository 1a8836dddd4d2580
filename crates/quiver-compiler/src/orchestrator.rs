//! The compile loop: scan, generate, build, react, and watch for more.
//!
//! The orchestrator is the only writer of the build context and the only place
//! that decides when a build runs. Builds never overlap. Membership changes
//! that arrive while a build is in flight are folded into the context right
//! away and produce exactly one follow-up build once it finishes.

use crate::bundler::{BundleConfig, Bundler};
use crate::context::{BuildContext, Mode, SharedContext};
use crate::error::{Error, Result};
use crate::generator::{ArtifactGenerator, ArtifactLayout};
use crate::lifecycle::{LifecycleAction, ServerLifecycle};
use crate::pipeline::{BuildOutcome, BuildPipeline};
use crate::watcher::{self, PathWatcher, WatchEvent, WatchOptions};
use quiver_config::QuiverConfig;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub mode: Mode,
    pub project_root: PathBuf,
    pub config: Arc<QuiverConfig>,
    /// Watch event channel capacity.
    pub channel_capacity: usize,
}

impl CompileOptions {
    pub fn new(mode: Mode, project_root: impl Into<PathBuf>, config: QuiverConfig) -> Self {
        Self {
            mode,
            project_root: project_root.into(),
            config: Arc::new(config),
            channel_capacity: 256,
        }
    }
}

/// Progress notifications for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CompilerEvent {
    /// The initial scan finished with this many handlers.
    ScanCompleted { tools: usize },

    BuildStarted,

    /// `duration_ms` is the bundler's own timing when it reports one, and
    /// wall-clock time otherwise.
    BuildSucceeded { duration_ms: u64, first: bool },

    BuildFailed { diagnostics: String },

    /// A rebuild brought the listener up.
    ListenerStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Scanning,
    Building,
    Idle,
    Watching,
    Terminated,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub builds: u64,
    pub successes: u64,
    pub last_outcome: Option<BuildOutcome>,
    pub state: RunState,
}

pub struct Compiler {
    mode: Mode,
    channel_capacity: usize,
    context: SharedContext,
    generator: ArtifactGenerator,
    pipeline: BuildPipeline,
    lifecycle: ServerLifecycle,
    events: Option<mpsc::UnboundedSender<CompilerEvent>>,
    state: RunState,
    successes: u64,
    last_outcome: Option<BuildOutcome>,
}

impl Compiler {
    /// The project root is canonicalized when it exists, so relative roots and
    /// watcher-reported paths agree.
    pub fn new(options: CompileOptions, bundler: Arc<dyn Bundler>, lifecycle: ServerLifecycle) -> Self {
        let project_root = std::fs::canonicalize(&options.project_root)
            .unwrap_or_else(|_| options.project_root.clone());
        let context = BuildContext::new(options.mode, &project_root, options.config);
        Self {
            mode: options.mode,
            channel_capacity: options.channel_capacity,
            context: SharedContext::new(context),
            generator: ArtifactGenerator::new(ArtifactLayout::new(&project_root)),
            pipeline: BuildPipeline::new(bundler),
            lifecycle,
            events: None,
            state: RunState::Initializing,
            successes: 0,
            last_outcome: None,
        }
    }

    /// Send progress notifications to `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<CompilerEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn layout(&self) -> &ArtifactLayout {
        self.generator.layout()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Validate the tools root, reset the runtime directory, start watching and
    /// drive the loop until it ends or `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// - [`Error::WatchSetup`] if the tools root is unusable
    /// - [`Error::GenerationIo`] if an artifact cannot be written
    /// - [`Error::Compile`] for bundler diagnostics in production mode
    /// - [`Error::Fatal`] and [`Error::Listener`] in any mode
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<RunSummary> {
        let span = tracing::info_span!("compile", mode = %self.mode);
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(&mut self, shutdown: impl Future<Output = ()>) -> Result<RunSummary> {
        self.state = RunState::Initializing;
        let ctx = self.context.get();

        if let Err(e) = watcher::check_root(&ctx.tools_root) {
            self.state = RunState::Terminated;
            return Err(e);
        }
        if let Err(e) = self.generator.prepare_runtime_dir() {
            self.state = RunState::Terminated;
            return Err(e);
        }

        let mut options = WatchOptions::new(&ctx.tools_root)
            .persistent(self.mode.is_development())
            .capacity(self.channel_capacity);
        // An adapter mounts the tools itself; the interceptor is not part of its bundle.
        if !ctx.config.adapter_enabled() {
            options = options.middleware(&ctx.middleware_path);
        }
        let (mut handle, rx) = match PathWatcher::new(options).spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                self.state = RunState::Terminated;
                return Err(e);
            }
        };
        tracing::debug!(
            root = %ctx.tools_root.display(),
            persistent = handle.is_persistent(),
            "watching handlers"
        );

        let result = self.drive(rx, shutdown).await;
        handle.stop();
        result
    }

    /// Consume watch events until the run ends.
    ///
    /// Exposed so the loop can be fed by hand in tests.
    pub async fn drive(
        &mut self,
        mut rx: mpsc::Receiver<WatchEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunSummary> {
        tokio::pin!(shutdown);
        let result = self.drive_inner(&mut rx, shutdown).await;
        self.state = RunState::Terminated;
        result.map(|()| self.summary())
    }

    async fn drive_inner(
        &mut self,
        rx: &mut mpsc::Receiver<WatchEvent>,
        mut shutdown: std::pin::Pin<&mut impl Future<Output = ()>>,
    ) -> Result<()> {
        self.state = RunState::Scanning;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::debug!("shutdown during initial scan");
                    return Ok(());
                }
                event = rx.recv() => match event {
                    Some(WatchEvent::InitialScanComplete) => break,
                    Some(event) => {
                        self.context.apply_event(&event);
                    }
                    None => {
                        return Err(Error::watch_setup(
                            &self.context.get().tools_root,
                            "watcher stopped before the initial scan completed",
                        ));
                    }
                },
            }
        }

        let tools = self.context.get().tool_paths.len();
        tracing::info!(tools, "initial scan complete");
        self.emit(CompilerEvent::ScanCompleted { tools });

        let mut open = true;
        self.cycle(rx, &mut open).await?;

        if !self.mode.is_development() {
            return Ok(());
        }

        loop {
            self.state = RunState::Watching;
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::debug!("shutdown requested");
                    return Ok(());
                }
                event = rx.recv(), if open => event,
            };

            let Some(event) = event else {
                tracing::debug!("watch channel closed");
                open = false;
                continue;
            };

            let mut changed = self.context.apply_event(&event);
            // Coalesce whatever is already queued.
            while let Ok(event) = rx.try_recv() {
                changed |= self.context.apply_event(&event);
            }

            if changed {
                self.cycle(rx, &mut open).await?;
            }
        }
    }

    /// Build, then keep rebuilding while changes arrived during the last build.
    async fn cycle(&mut self, rx: &mut mpsc::Receiver<WatchEvent>, open: &mut bool) -> Result<()> {
        loop {
            let pending = self.build_once(rx, open).await?;
            if !(pending && self.mode.is_development()) {
                return Ok(());
            }
            tracing::debug!("changes arrived during the build, rebuilding");
        }
    }

    /// One regenerate + build + react pass. Returns whether the context changed
    /// while the build was running.
    async fn build_once(&mut self, rx: &mut mpsc::Receiver<WatchEvent>, open: &mut bool) -> Result<bool> {
        self.state = RunState::Building;
        let ctx = self.context.get();

        self.generator.generate(&ctx)?;
        let config = BundleConfig::derive(&ctx, self.generator.layout());
        self.emit(CompilerEvent::BuildStarted);

        let mut pending = false;
        let outcome = {
            let build = self.pipeline.run_build(&config);
            tokio::pin!(build);
            loop {
                tokio::select! {
                    outcome = &mut build => break outcome,
                    event = rx.recv(), if *open => match event {
                        Some(event) => pending |= self.context.apply_event(&event),
                        None => *open = false,
                    },
                }
            }
        };

        self.last_outcome = Some(outcome.clone());
        self.state = RunState::Idle;

        if let BuildOutcome::Success {
            duration_ms,
            is_first_build,
            reported_ms,
        } = outcome
        {
            self.successes += 1;
            self.emit(CompilerEvent::BuildSucceeded {
                duration_ms: reported_ms.unwrap_or(duration_ms),
                first: is_first_build,
            });
            if self.lifecycle.on_success(is_first_build).await? == LifecycleAction::ListenerStarted {
                self.emit(CompilerEvent::ListenerStarted);
            }
            return Ok(pending);
        }

        if let BuildOutcome::CompileError { diagnostics } = &outcome {
            self.emit(CompilerEvent::BuildFailed {
                diagnostics: diagnostics.clone(),
            });
        }
        if let Some(error) = outcome.to_error() {
            if !error.is_recoverable(self.mode) {
                return Err(error);
            }
            tracing::debug!("compile error, waiting for changes");
        }

        Ok(pending)
    }

    fn emit(&self, event: CompilerEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            builds: self.pipeline.builds(),
            successes: self.successes,
            last_outcome: self.last_outcome.clone(),
            state: self.state,
        }
    }
}
