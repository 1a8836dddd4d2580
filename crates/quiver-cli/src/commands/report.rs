//! Turns compiler events into terminal output.

use crate::ui::{self, Spinner};
use quiver_compiler::{CompilerEvent, Mode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// A running reporter task.
pub(crate) struct Reporter {
    task: JoinHandle<()>,
    first_build: Arc<Notify>,
    tools: Arc<AtomicUsize>,
}

impl Reporter {
    /// Print events until the compiler drops its sender.
    ///
    /// With a spinner, build results finish the spinner and diagnostics are
    /// left to the final error report.
    pub(crate) fn spawn(
        mut events: mpsc::UnboundedReceiver<CompilerEvent>,
        mode: Mode,
        spinner: Option<Spinner>,
    ) -> Self {
        let first_build = Arc::new(Notify::new());
        let tools = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn({
            let first_build = Arc::clone(&first_build);
            let tools = Arc::clone(&tools);
            async move {
                while let Some(event) = events.recv().await {
                    tracing::debug!(?event, "compiler event");
                    match event {
                        CompilerEvent::ScanCompleted { tools: count } => {
                            tools.store(count, Ordering::Relaxed);
                            let message = match count {
                                0 => "No tools found yet".to_string(),
                                1 => "Found 1 tool".to_string(),
                                n => format!("Found {n} tools"),
                            };
                            match &spinner {
                                Some(spinner) => spinner.set_message(&format!("{message}, bundling...")),
                                None if count == 0 => ui::warning(&message),
                                None => ui::info(&message),
                            }
                        }
                        CompilerEvent::BuildStarted => {}
                        CompilerEvent::BuildSucceeded { duration_ms, first } => {
                            let line = format!(
                                "Compiled in {}",
                                ui::format_compile_time(duration_ms, mode.is_development())
                            );
                            match &spinner {
                                Some(spinner) => spinner.finish(&line),
                                None => ui::success(&line),
                            }
                            if first {
                                first_build.notify_one();
                            }
                        }
                        CompilerEvent::BuildFailed { diagnostics } => match &spinner {
                            Some(spinner) => spinner.fail("Compilation failed"),
                            None => {
                                ui::error("Compilation failed");
                                eprintln!("{}", diagnostics.trim_end());
                                ui::info("Waiting for changes...");
                            }
                        },
                        CompilerEvent::ListenerStarted => ui::success("Server started"),
                    }
                }
            }
        });

        Self {
            task,
            first_build,
            tools,
        }
    }

    /// Signalled once the first successful build has been printed.
    pub(crate) fn first_build(&self) -> Arc<Notify> {
        Arc::clone(&self.first_build)
    }

    /// Handler count from the initial scan.
    pub(crate) fn tools(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.tools)
    }

    /// Wait for the remaining events to be printed.
    pub(crate) async fn finish(self) {
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "reporter task ended abnormally");
        }
    }
}
