//! Shared build context for a single compile run.
//!
//! Readers take cheap immutable snapshots with [`SharedContext::get`]. Writers
//! publish a whole new snapshot under a `parking_lot::RwLock`, so a reader
//! never observes a half-applied update.

use crate::watcher::WatchEvent;
use parking_lot::RwLock;
use quiver_config::QuiverConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which kind of run this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Interactive: the watcher keeps running and compile errors are recoverable.
    Development,
    /// Batch: one scan, one build, then exit.
    Production,
}

impl Mode {
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of the current run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub mode: Mode,
    pub project_root: PathBuf,
    /// Absolute handler root; every entry of `tool_paths` lives below it.
    pub tools_root: PathBuf,
    /// Absolute path of the optional interceptor file.
    pub middleware_path: PathBuf,
    /// Discovered handler files, kept sorted.
    pub tool_paths: BTreeSet<PathBuf>,
    pub has_middleware: bool,
    pub config: Arc<QuiverConfig>,
}

impl BuildContext {
    pub fn new(
        mode: Mode,
        project_root: impl Into<PathBuf>,
        config: Arc<QuiverConfig>,
    ) -> Self {
        let project_root = project_root.into();
        let tools_root = project_root.join(&config.paths.tools);
        let middleware_path = project_root.join(crate::MIDDLEWARE_PATH);

        Self {
            mode,
            project_root,
            tools_root,
            middleware_path,
            tool_paths: BTreeSet::new(),
            has_middleware: false,
            config,
        }
    }

    /// Whether `path` may be recorded as a handler.
    pub fn is_tool_path(&self, path: &Path) -> bool {
        path.starts_with(&self.tools_root) && path != self.tools_root
    }

    /// Apply one watch event in place. Returns whether anything changed.
    ///
    /// Adding a present path and removing an absent one are both no-ops.
    pub fn apply_event(&mut self, event: &WatchEvent) -> bool {
        match event {
            WatchEvent::Added(path) if *path == self.middleware_path => {
                !std::mem::replace(&mut self.has_middleware, true)
            }
            WatchEvent::Removed(path) if *path == self.middleware_path => {
                std::mem::replace(&mut self.has_middleware, false)
            }
            WatchEvent::Added(path) => {
                if !self.is_tool_path(path) {
                    tracing::debug!(path = %path.display(), "ignoring path outside the tools root");
                    return false;
                }
                self.tool_paths.insert(path.clone())
            }
            WatchEvent::Removed(path) => self.tool_paths.remove(path),
            WatchEvent::InitialScanComplete => false,
        }
    }
}

/// Partial update for [`SharedContext::set`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub mode: Option<Mode>,
    pub config: Option<Arc<QuiverConfig>>,
    pub has_middleware: Option<bool>,
    pub tool_paths: Option<BTreeSet<PathBuf>>,
}

/// Handle to the run's build context.
///
/// Cloning the handle shares the same context.
#[derive(Debug, Clone)]
pub struct SharedContext {
    inner: Arc<RwLock<Arc<BuildContext>>>,
}

impl SharedContext {
    pub fn new(context: BuildContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(context))),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<BuildContext> {
        Arc::clone(&self.inner.read())
    }

    /// Merge the populated fields of `patch` into the context.
    pub fn set(&self, patch: ContextPatch) {
        self.update(|ctx| {
            if let Some(mode) = patch.mode {
                ctx.mode = mode;
            }
            if let Some(config) = patch.config {
                // The tools root is derived from the config.
                ctx.tools_root = ctx.project_root.join(&config.paths.tools);
                ctx.config = config;
            }
            if let Some(has_middleware) = patch.has_middleware {
                ctx.has_middleware = has_middleware;
            }
            if let Some(tool_paths) = patch.tool_paths {
                ctx.tool_paths = tool_paths;
            }
        });
    }

    /// Fold a watch event into the context. Returns whether it changed.
    pub fn apply_event(&self, event: &WatchEvent) -> bool {
        let mut changed = false;
        self.update(|ctx| changed = ctx.apply_event(event));
        changed
    }

    fn update(&self, f: impl FnOnce(&mut BuildContext)) {
        let mut guard = self.inner.write();
        let mut next = BuildContext::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}
