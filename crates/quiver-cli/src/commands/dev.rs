//! `quiver dev`: compile, watch, rebuild and serve until Ctrl+C.

use super::report::Reporter;
use super::utils;
use crate::cli::DevArgs;
use crate::error::Result;
use crate::ui;
use quiver_compiler::{
    CompileOptions, Compiler, FirstBuildHook, Listener, ListenerGuard, Mode, ProcessBundler,
    ProcessListener, ServerLifecycle,
};
use quiver_config::QuiverConfig;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;

/// Run the development loop.
///
/// The first successful build starts the HTTP runtime when the transport is
/// on and no adapter owns serving; otherwise it prints how to use what was
/// built. Later rebuilds bring the runtime back up through the same guard.
///
/// # Errors
///
/// Configuration errors, an unusable tools directory, bundler crashes and
/// runtime start failures end the session. Compile errors do not.
pub async fn execute(args: DevArgs) -> Result<()> {
    let root = utils::resolve_project_root(args.cwd.as_deref())?;
    let mut config = utils::load_config(&root, args.config.as_deref())?;
    if let Some(port) = args.port {
        config.override_port(port);
        config.validate()?;
    }
    let env = utils::load_dotenv(&root)?;

    let options = CompileOptions::new(Mode::Development, &root, config);
    let config = Arc::clone(&options.config);

    let listener = runtime_listener(&config, &root, &env);
    let guard = listener.as_ref().map(|listener| {
        let listener: Arc<dyn Listener> = Arc::<ProcessListener>::clone(listener);
        Arc::new(ListenerGuard::new(listener))
    });

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let reporter = Reporter::spawn(event_rx, Mode::Development, None);

    let hook = {
        let ready = reporter.first_build();
        let guard = guard.clone();
        let listener = listener.clone();
        let config = Arc::clone(&config);
        FirstBuildHook::new(move || async move {
            ready.notified().await;
            if let (Some(guard), Some(listener)) = (guard, listener) {
                guard.ensure_started().await?;
                ui::success(&format!("Server listening on {}", listener.address()));
            }
            print_transport_guidance(&config);
            Ok(())
        })
    };

    let mut lifecycle = ServerLifecycle::new(Mode::Development, Arc::clone(&config))
        .with_first_build_hook(hook);
    if let Some(guard) = guard {
        lifecycle = lifecycle.with_listener(guard);
    }

    ui::info(&format!(
        "Watching {} for changes",
        root.join(&config.paths.tools).display()
    ));

    let bundler = Arc::new(ProcessBundler::new().with_env(env));
    let mut compiler = Compiler::new(options, bundler, lifecycle).with_events(event_tx);
    let result = compiler
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            ui::info("Shutting down...");
        })
        .await;
    drop(compiler);
    reporter.finish().await;

    if let Some(listener) = listener {
        listener.shutdown().await?;
    }

    let summary = result?;
    tracing::debug!(builds = summary.builds, successes = summary.successes, "dev session ended");
    Ok(())
}

/// The HTTP runtime, when this session should serve it.
fn runtime_listener(
    config: &QuiverConfig,
    root: &std::path::Path,
    env: &[(String, String)],
) -> Option<Arc<ProcessListener>> {
    if config.adapter_enabled() {
        return None;
    }
    let http = config.http.resolve()?;
    Some(Arc::new(
        ProcessListener::new(config.runtime.command.clone(), root, http).with_env(env.to_vec()),
    ))
}

fn print_transport_guidance(config: &QuiverConfig) {
    if let Some(adapter) = config.experimental.adapter {
        let name = format!("{adapter:?}").to_lowercase();
        ui::info(&format!(
            "Built the {name} adapter into {}; mount it from your app",
            config.bundler.out_dir.display()
        ));
    }
    if config.stdio {
        ui::info(&format!(
            "STDIO transport built into {}; point your client at it",
            config.bundler.out_dir.display()
        ));
    }
    if !config.http_enabled() && !config.stdio && !config.adapter_enabled() {
        ui::warning("No transport enabled. Set \"http\" or \"stdio\" in quiver.config.json");
    }
}
