//! Process-backed runtime listener.

use crate::error::{Error, Result};
use crate::lifecycle::Listener;
use async_trait::async_trait;
use quiver_config::HttpConfig;
use std::path::PathBuf;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Spawns the bundled HTTP runtime and keeps its child process.
pub struct ProcessListener {
    command: Vec<String>,
    cwd: PathBuf,
    http: HttpConfig,
    env: Vec<(String, String)>,
    child: Mutex<Option<Child>>,
}

impl ProcessListener {
    pub fn new(command: Vec<String>, cwd: impl Into<PathBuf>, http: HttpConfig) -> Self {
        Self {
            command,
            cwd: cwd.into(),
            http,
            env: Vec::new(),
            child: Mutex::new(None),
        }
    }

    /// Extra environment for the runtime, such as values read from `.env`.
    /// `PORT` and `HOST` from the HTTP config still win.
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Address the runtime is told to bind.
    pub fn address(&self) -> String {
        format!("http://{}:{}{}", self.http.host, self.http.port, self.http.endpoint)
    }

    /// Kill the runtime if it is running.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(mut process) = self.child.lock().await.take() else {
            return Ok(());
        };
        if let Ok(Some(status)) = process.try_wait() {
            tracing::debug!(%status, "runtime already exited");
            return Ok(());
        }
        process
            .kill()
            .await
            .map_err(|e| Error::Listener(format!("failed to stop runtime: {e}")))?;
        tracing::debug!("runtime stopped");
        Ok(())
    }
}

#[async_trait]
impl Listener for ProcessListener {
    async fn start(&self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Listener("runtime command is empty".to_string()))?;

        let mut slot = self.child.lock().await;
        if let Some(process) = slot.as_mut() {
            if matches!(process.try_wait(), Ok(None)) {
                return Ok(());
            }
        }

        let process = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .env("PORT", self.http.port.to_string())
            .env("HOST", &self.http.host)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Listener(format!("failed to start '{program}': {e}")))?;

        tracing::info!(pid = process.id(), address = %self.address(), "runtime started");
        *slot = Some(process);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        match child.as_mut() {
            Some(process) => matches!(process.try_wait(), Ok(None)),
            None => false,
        }
    }
}
