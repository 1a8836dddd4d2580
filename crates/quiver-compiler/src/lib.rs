//! Watch, regenerate, bundle and (re)start pipeline for quiver tool servers.
//!
//! A run discovers handler files under the configured tools directory, writes
//! the generated import manifest, runtime configuration and type declarations,
//! hands the manifest to an external bundler and, in development, keeps the
//! bundled runtime listening while it rebuilds on every membership change.
//!
//! # Architecture
//!
//! - [`watcher`] - handler discovery and file system events
//! - [`context`] - the shared build context folded from watch events
//! - [`generator`] - rendering and atomically writing generated artifacts
//! - [`bundler`] - the bundler seam and the process-backed implementation
//! - [`pipeline`] - running one build and classifying its outcome
//! - [`lifecycle`] - first-build hook and listener start policy
//! - [`listener`] - the process-backed runtime listener
//! - [`orchestrator`] - the event loop tying everything together
//!
//! # Example
//!
//! ```no_run
//! use quiver_compiler::{CompileOptions, Compiler, Mode, ProcessBundler, ServerLifecycle};
//! use quiver_config::QuiverConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> quiver_compiler::Result<()> {
//! let options = CompileOptions::new(Mode::Production, ".", QuiverConfig::default());
//! let lifecycle = ServerLifecycle::new(Mode::Production, Arc::clone(&options.config));
//! let mut compiler = Compiler::new(options, Arc::new(ProcessBundler::new()), lifecycle);
//! let summary = compiler.run(std::future::pending()).await?;
//! println!("{} builds", summary.builds);
//! # Ok(())
//! # }
//! ```

pub mod bundler;
pub mod context;
pub mod error;
pub mod generator;
pub mod lifecycle;
pub mod listener;
pub mod orchestrator;
pub mod pipeline;
pub mod watcher;

pub use bundler::{BundleConfig, BundleReport, Bundler, BundlerCrash, ProcessBundler};
pub use context::{BuildContext, ContextPatch, Mode, SharedContext};
pub use error::{Error, Result};
pub use generator::{ArtifactGenerator, ArtifactKind, ArtifactLayout, GeneratedArtifact};
pub use lifecycle::{
    FirstBuildHook, LifecycleAction, Listener, ListenerGuard, ServerLifecycle, StartResult,
};
pub use listener::ProcessListener;
pub use orchestrator::{CompileOptions, Compiler, CompilerEvent, RunState, RunSummary};
pub use pipeline::{BuildOutcome, BuildPipeline, PipelineState};
pub use watcher::{HandlerMatcher, PathWatcher, WatchEvent, WatchHandle, WatchOptions};

/// Runtime directory, relative to the project root. Recreated on every run.
pub const RUNTIME_DIR: &str = ".quiver";

/// Import manifest file name inside [`RUNTIME_DIR`].
pub const MANIFEST_FILE: &str = "import-map.js";

/// Runtime configuration file name inside [`RUNTIME_DIR`].
pub const RUNTIME_CONFIG_FILE: &str = "runtime-config.json";

/// Type declarations, relative to the project root.
pub const ENV_DECLARATIONS_FILE: &str = "quiver-env.d.ts";

/// Interceptor file, relative to the project root.
pub const MIDDLEWARE_PATH: &str = "src/middleware.ts";

/// Handler glob, relative to the tools directory.
pub const HANDLER_GLOB: &str = "**/*.ts";
