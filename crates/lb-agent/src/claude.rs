// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

/// Claude Code launcher
use crate::traits::*;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Runs `claude --print` in stream-json mode, once per prompt
pub struct ClaudeAgent {
    binary_path: String,
}

impl ClaudeAgent {
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    pub fn with_binary(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    /// Resolve the binary on PATH (or as given) before the first run
    pub fn ensure_available(&self) -> AgentResult<PathBuf> {
        which::which(&self.binary_path).map_err(|e| {
            debug!("Lookup of {} failed: {}", self.binary_path, e);
            AgentError::AgentNotFound(self.binary_path.clone())
        })
    }

    /// Arguments for one non-interactive run
    pub fn print_args(prompt: &str) -> Vec<String> {
        vec![
            "--print".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            // stream-json requires --verbose in print mode
            "--verbose".to_string(),
            "--dangerously-skip-permissions".to_string(),
        ]
    }
}

impl Default for ClaudeAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentLauncher for ClaudeAgent {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn prepare_launch(&self, config: AgentLaunchConfig) -> AgentResult<Command> {
        if config.prompt.is_empty() {
            return Err(AgentError::ConfigurationError("empty prompt".to_string()));
        }

        info!(
            "Preparing Claude Code run with prompt: {:?}",
            config.prompt.chars().take(50).collect::<String>()
        );

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(Self::print_args(&config.prompt));
        cmd.current_dir(&config.working_dir);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(if config.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        Ok(cmd)
    }

    async fn launch(&self, config: AgentLaunchConfig) -> AgentResult<Child> {
        let mut cmd = self.prepare_launch(config).await?;
        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::AgentNotFound(self.binary_path.clone())
            } else {
                AgentError::ProcessSpawnFailed(e)
            }
        })?;

        debug!("Claude Code process spawned (pid {:?})", child.id());
        Ok(child)
    }
}
