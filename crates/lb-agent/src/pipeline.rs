// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Serialized execution of agent runs
//!
//! Every submission waits for the single run slot, spawns the agent, streams
//! its stdout through [`crate::stream::decode_line`] and finishes with exactly
//! one terminal event: `Complete` on exit status zero, `Error` otherwise. The
//! slot is a fair `tokio::sync::Mutex`, so concurrent submissions run in
//! arrival order.

use crate::events::{EventSink, StreamEvent};
use crate::stream::decode_line;
use crate::traits::{AgentError, AgentLaunchConfig, AgentLauncher};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Result type for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to start agent: {0}")]
    Launch(#[from] AgentError),

    #[error("Agent stdout was not captured")]
    MissingStdout,

    #[error("Exit code: {0}")]
    NonZeroExit(String),

    #[error("Agent I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the pipeline is in its run cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Slot acquired, process being spawned
    Dispatched,
    /// Reading agent output
    Streaming,
    Completed,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Dispatched => "dispatched",
            PipelineState::Streaming => "streaming",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct ExecutionPipeline {
    launcher: Arc<dyn AgentLauncher>,
    project_dir: PathBuf,
    verbose: bool,
    events: EventSink,
    slot: Mutex<()>,
    state: watch::Sender<PipelineState>,
}

impl ExecutionPipeline {
    pub fn new(
        launcher: Arc<dyn AgentLauncher>,
        project_dir: impl Into<PathBuf>,
        verbose: bool,
        events: EventSink,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            launcher,
            project_dir: project_dir.into(),
            verbose,
            events,
            slot: Mutex::new(()),
            state,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Sink used for everything this pipeline emits
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Run the agent once for `line`, waiting for any run already in flight.
    ///
    /// Returns once the agent has exited and the terminal event was emitted.
    pub async fn submit(&self, line: &str) -> PipelineResult<()> {
        let _slot = self.slot.lock().await;
        self.transition(PipelineState::Dispatched);

        let outcome = self.run(line).await;
        match &outcome {
            Ok(()) => {
                info!(agent = self.launcher.name(), "Agent run completed");
                self.events.emit(StreamEvent::complete());
                self.transition(PipelineState::Completed);
            }
            Err(e) => {
                warn!(agent = self.launcher.name(), error = %e, "Agent run failed");
                self.events.emit(StreamEvent::error(e.to_string()));
                self.transition(PipelineState::Failed);
            }
        }

        self.transition(PipelineState::Idle);
        outcome
    }

    async fn run(&self, line: &str) -> PipelineResult<()> {
        let config =
            AgentLaunchConfig::new(line, &self.project_dir).capture_stderr(self.verbose);
        let mut child = self.launcher.launch(config).await?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }
        let stdout = child.stdout.take().ok_or(PipelineError::MissingStdout)?;

        self.transition(PipelineState::Streaming);
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => match std::str::from_utf8(&buf) {
                    Ok(line) => self.dispatch_line(line),
                    Err(e) => debug!("Skipping agent output line that is not UTF-8: {}", e),
                },
                Err(e) => {
                    warn!("Failed to read agent output: {}", e);
                    break;
                }
            }
        }
        // Closing stdout keeps a still-writing agent from blocking on a full pipe.
        drop(reader);

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::NonZeroExit(describe_exit(status)))
        }
    }

    fn dispatch_line(&self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return;
        }
        match decode_line(line) {
            Ok(events) => {
                for event in events {
                    self.events.emit(event);
                }
            }
            Err(e) => debug!("Skipping agent output line: {}", e),
        }
    }

    fn transition(&self, next: PipelineState) {
        debug!("Pipeline state -> {}", next);
        self.state.send_replace(next);
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                debug!(target: "lb_agent::stderr", "{}", line.trim_end());
            }
        }
    }
}

fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {signal}");
        }
    }
    status.to_string()
}
