// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Scripted launcher standing in for the agent CLI in tests

use crate::traits::*;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs `sh -c <script>` with the prompt available as `$1`.
///
/// The script runs in the configured working directory, so it can leave
/// marker files there for assertions.
#[derive(Debug, Clone)]
pub struct ScriptAgent {
    script: String,
}

impl ScriptAgent {
    pub fn new(script: impl Into<String>) -> Self {
        Self { script: script.into() }
    }

    /// A script that prints the given stream-json lines and exits with `code`
    pub fn emitting(lines: &[&str], code: i32) -> Self {
        let mut script = String::new();
        for line in lines {
            script.push_str(&format!("printf '%s\\n' '{}'\n", line.replace('\'', r"'\''")));
        }
        script.push_str(&format!("exit {code}\n"));
        Self::new(script)
    }

    /// Fails with exit code 3 if another run holds `lockdir`, otherwise
    /// holds it for `hold_secs` and succeeds.
    pub fn exclusive(hold_secs: f32) -> Self {
        Self::new(format!(
            "mkdir lockdir 2>/dev/null || exit 3\n\
             printf '%s\\n' '{{\"type\":\"content\",\"content\":\"working\"}}'\n\
             sleep {hold_secs}\n\
             rmdir lockdir\n\
             echo \"$1\" >> prompts.log\n"
        ))
    }
}

#[async_trait]
impl AgentLauncher for ScriptAgent {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn prepare_launch(&self, config: AgentLaunchConfig) -> AgentResult<Command> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.script).arg("agent").arg(&config.prompt);
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
}
