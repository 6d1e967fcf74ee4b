// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

/// Core traits and types for launching the agent subprocess
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::{Child, Command};

/// Agent launch configuration
#[derive(Debug, Clone)]
pub struct AgentLaunchConfig {
    /// Single-line prompt handed to the agent
    pub prompt: String,

    /// Working directory for the agent (the project root)
    pub working_dir: PathBuf,

    /// Additional environment variables on top of the inherited environment
    pub env_vars: Vec<(String, String)>,

    /// Pipe stderr so it can be forwarded to the log; otherwise it is discarded
    pub capture_stderr: bool,
}

impl AgentLaunchConfig {
    pub fn new(prompt: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            working_dir: working_dir.into(),
            env_vars: Vec::new(),
            capture_stderr: false,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while launching the agent
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    ProcessSpawnFailed(#[from] std::io::Error),

    #[error("Agent not found in PATH: {0}")]
    AgentNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Something that can start one agent run for a prompt.
///
/// Implementations only build and spawn the process; reading its output and
/// serializing runs is the pipeline's job.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Short name used in logs (e.g. "claude")
    fn name(&self) -> &'static str;

    /// Build the command for one run without spawning it.
    ///
    /// The returned command must pipe stdout.
    async fn prepare_launch(&self, config: AgentLaunchConfig) -> AgentResult<Command>;

    /// Spawn the agent for one run
    async fn launch(&self, config: AgentLaunchConfig) -> AgentResult<Child> {
        let mut cmd = self.prepare_launch(config).await?;
        let child = cmd.spawn()?;
        Ok(child)
    }
}
