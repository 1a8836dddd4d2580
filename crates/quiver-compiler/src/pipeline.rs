//! Runs one bundler invocation and classifies the result.

use crate::bundler::{BundleConfig, Bundler};
use crate::error::Error;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Result of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success {
        /// Wall-clock time of the invocation.
        duration_ms: u64,
        is_first_build: bool,
        /// The bundler's own timing, when it reported one.
        reported_ms: Option<u64>,
    },
    CompileError {
        diagnostics: String,
    },
    FatalError {
        cause: String,
    },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }

    /// The error this outcome stands for, if any.
    pub fn to_error(&self) -> Option<Error> {
        match self {
            BuildOutcome::Success { .. } => None,
            BuildOutcome::CompileError { diagnostics } => Some(Error::Compile {
                diagnostics: diagnostics.clone(),
            }),
            BuildOutcome::FatalError { cause } => Some(Error::Fatal(cause.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Building,
    FirstBuildDone,
    Rebuilt,
    Failed,
}

pub struct BuildPipeline {
    bundler: Arc<dyn Bundler>,
    state: PipelineState,
    has_succeeded: bool,
    builds: u64,
}

impl BuildPipeline {
    pub fn new(bundler: Arc<dyn Bundler>) -> Self {
        Self {
            bundler,
            state: PipelineState::Idle,
            has_succeeded: false,
            builds: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Number of builds started so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Run the bundler on its own task and classify what it reports.
    pub async fn run_build(&mut self, config: &BundleConfig) -> BuildOutcome {
        self.state = PipelineState::Building;
        self.builds += 1;

        let span = tracing::info_span!("build", number = self.builds, mode = %config.mode);
        let bundler = Arc::clone(&self.bundler);
        let owned = config.clone();
        let started = Instant::now();

        let joined = tokio::spawn(async move { bundler.bundle(&owned).await }.instrument(span)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match joined {
            Err(join_error) => BuildOutcome::FatalError {
                cause: format!("bundler task failed: {join_error}"),
            },
            Ok(Err(crash)) => BuildOutcome::FatalError {
                cause: crash.message,
            },
            Ok(Ok(report)) if report.has_errors => BuildOutcome::CompileError {
                diagnostics: report
                    .diagnostics
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| "bundler reported errors".to_string()),
            },
            Ok(Ok(report)) => {
                let is_first_build = !self.has_succeeded;
                self.has_succeeded = true;
                BuildOutcome::Success {
                    duration_ms,
                    is_first_build,
                    reported_ms: report.reported_ms(),
                }
            }
        };

        self.state = match &outcome {
            BuildOutcome::Success {
                is_first_build: true,
                ..
            } => PipelineState::FirstBuildDone,
            BuildOutcome::Success { .. } => PipelineState::Rebuilt,
            _ => PipelineState::Failed,
        };

        match &outcome {
            BuildOutcome::Success { duration_ms, .. } => {
                tracing::debug!(build = self.builds, duration_ms, "build succeeded")
            }
            BuildOutcome::CompileError { .. } => {
                tracing::debug!(build = self.builds, "build reported errors")
            }
            BuildOutcome::FatalError { cause } => {
                tracing::error!(build = self.builds, "bundler failed: {}", cause)
            }
        }

        outcome
    }
}
