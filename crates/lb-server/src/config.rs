// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server configuration

use crate::error::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for everything the bridge serves itself
pub const DEFAULT_BASE_PATH: &str = "/__livebridge";

/// Server configuration
///
/// Every field has a default so partial TOML files deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the proxy listens on
    pub bind_host: IpAddr,

    /// Port the proxy listens on
    pub proxy_port: u16,

    /// Port of the developer's dev server. Zero means "detect at startup".
    pub target_port: u16,

    /// Project root, used as the agent working directory and watch root
    pub project_dir: PathBuf,

    /// Agent executable
    pub claude_path: String,

    /// Forward agent stderr to the log
    pub verbose: bool,

    /// Prefix for bridge assets and WebSocket endpoints
    pub base_path: String,

    /// Deadline for every outbound WebSocket write, in milliseconds
    pub write_timeout_ms: u64,

    /// Quiet period after the last file change before reloading, in milliseconds
    pub reload_debounce_ms: u64,

    /// Upper bound on graceful shutdown, in seconds
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            proxy_port: 9999,
            target_port: 0,
            project_dir: PathBuf::from("."),
            claude_path: "claude".to_string(),
            verbose: false,
            base_path: DEFAULT_BASE_PATH.to_string(),
            write_timeout_ms: 2000,
            reload_debounce_ms: 300,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML config file body
    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(format!("invalid config file: {e}")))
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.proxy_port)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// `http://127.0.0.1:{target_port}`
    pub fn upstream_origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.target_port)
    }

    /// URL the developer should open
    pub fn public_url(&self) -> String {
        format!("http://localhost:{}", self.proxy_port)
    }

    /// Check the configuration for values the server cannot start with.
    ///
    /// A zero `target_port` is accepted here; it must be resolved before the
    /// server is built.
    pub fn validate(&self) -> ServerResult<()> {
        if !self.base_path.starts_with('/') || self.base_path.len() < 2 {
            return Err(ServerError::Config(format!(
                "base path must start with '/' and name a directory, got {:?}",
                self.base_path
            )));
        }
        if self.base_path.ends_with('/') {
            return Err(ServerError::Config(format!(
                "base path must not end with '/', got {:?}",
                self.base_path
            )));
        }
        if self.target_port != 0 && self.target_port == self.proxy_port {
            return Err(ServerError::Config(format!(
                "proxy port {} would proxy to itself",
                self.proxy_port
            )));
        }
        if !self.project_dir.is_dir() {
            return Err(ServerError::Config(format!(
                "project directory {} does not exist",
                self.project_dir.display()
            )));
        }
        if self.claude_path.trim().is_empty() {
            return Err(ServerError::Config("agent path is empty".to_string()));
        }
        if self.write_timeout_ms == 0 {
            return Err(ServerError::Config(
                "write timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
