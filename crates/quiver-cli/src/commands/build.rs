//! `quiver build`: one production compile.

use super::report::Reporter;
use super::utils;
use crate::cli::BuildArgs;
use crate::error::Result;
use crate::ui::{self, Spinner};
use quiver_compiler::{
    CompileOptions, Compiler, FirstBuildHook, Mode, ProcessBundler, RunSummary, ServerLifecycle,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Scan, generate and bundle once, then exit.
///
/// # Errors
///
/// Fails on configuration errors, an unusable tools directory, artifact
/// write failures and any bundler diagnostic.
pub async fn execute(args: BuildArgs) -> Result<RunSummary> {
    let root = utils::resolve_project_root(args.cwd.as_deref())?;
    let config = utils::load_config(&root, args.config.as_deref())?;
    let env = utils::load_dotenv(&root)?;
    tracing::debug!(root = %root.display(), "starting production build");

    let options = CompileOptions::new(Mode::Production, &root, config);
    let config = Arc::clone(&options.config);

    let spinner = (!ui::is_ci()).then(|| Spinner::new("Scanning tools..."));
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let reporter = Reporter::spawn(event_rx, Mode::Production, spinner);

    let hook = {
        let ready = reporter.first_build();
        let tools = reporter.tools();
        let root = root.clone();
        FirstBuildHook::new(move || async move {
            ready.notified().await;
            ui::print_build_summary(&config, &root, tools.load(Ordering::Relaxed));
            Ok(())
        })
    };
    let lifecycle =
        ServerLifecycle::new(Mode::Production, Arc::clone(&options.config)).with_first_build_hook(hook);

    let bundler = Arc::new(ProcessBundler::new().with_env(env));
    let mut compiler = Compiler::new(options, bundler, lifecycle).with_events(event_tx);
    let result = compiler.run(std::future::pending()).await;
    drop(compiler);
    reporter.finish().await;

    let summary = result?;
    tracing::debug!(builds = summary.builds, "production build finished");
    Ok(summary)
}
