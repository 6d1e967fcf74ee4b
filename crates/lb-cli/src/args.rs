// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Command line flags layered over an optional config file

use anyhow::Context;
use clap::Parser;
use lb_logging::CliLoggingArgs;
use lb_server::ServerConfig;
use std::path::PathBuf;

/// Select parts of a running web page and have an agent edit the source.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "livebridge", author, version, about, long_about = None)]
pub struct Cli {
    /// Port the proxy listens on [default: 9999]
    #[arg(long, env = "LIVEBRIDGE_PROXY_PORT")]
    pub proxy_port: Option<u16>,

    /// Dev server port; 0 or unset probes the usual ports
    #[arg(long, env = "LIVEBRIDGE_TARGET_PORT")]
    pub target_port: Option<u16>,

    /// Project directory the agent works in [default: .]
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Agent CLI binary [default: claude]
    #[arg(long)]
    pub claude_path: Option<String>,

    /// Debug logging and agent stderr capture
    #[arg(long)]
    pub verbose: bool,

    /// Print agent output to the console instead of the full-screen view
    #[arg(long)]
    pub no_tui: bool,

    /// TOML file with server settings; flags given here take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub logging: CliLoggingArgs,
}

impl Cli {
    /// Effective server settings: defaults, then the config file, then flags
    pub fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.proxy_port {
            config.proxy_port = port;
        }
        if let Some(port) = self.target_port {
            config.target_port = port;
        }
        if let Some(dir) = &self.dir {
            config.project_dir = dir.clone();
        }
        if let Some(path) = &self.claude_path {
            config.claude_path = path.clone();
        }
        if self.verbose {
            config.verbose = true;
        }

        Ok(config)
    }
}
