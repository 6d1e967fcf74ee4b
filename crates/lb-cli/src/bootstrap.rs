// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! First-run API key setup

use anyhow::{bail, Context};
use lb_assist::{write_project_settings, ApiKeySource};
use lb_logging::redact;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

pub const KEY_PREFIX: &str = "sk-ant-";

/// Make sure an Anthropic key is configured, asking for one on `input` if not.
///
/// A pasted key is stored in the project's `.claude/settings.json`.
pub fn ensure_api_key(
    keys: &dyn ApiKeySource,
    project_dir: &Path,
    mut input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<()> {
    if keys.lookup(project_dir).is_ok() {
        writeln!(output, "✓ Anthropic API key found")?;
        return Ok(());
    }

    writeln!(output, "\n⚠️  Anthropic API key not found")?;
    writeln!(output, "livebridge uses it for design analysis and instant previews.")?;
    writeln!(
        output,
        "Create one at https://console.anthropic.com/settings/keys"
    )?;
    write!(output, "\nPaste your API key ({KEY_PREFIX}...): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read API key")?;
    let key = line.trim();
    if !key.starts_with(KEY_PREFIX) {
        bail!("Invalid API key format (must start with '{KEY_PREFIX}')");
    }

    let path = write_project_settings(project_dir, key).context("Failed to save API key")?;
    info!(api_key = %redact(key), path = %path.display(), "API key stored");
    writeln!(output, "✓ API key saved to {}", path.display())?;
    Ok(())
}
