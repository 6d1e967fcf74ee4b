// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Application state shared by every handler

use crate::bridge::InstructionBridge;
use crate::config::ServerConfig;
use crate::control::ControlServices;
use crate::error::{ServerError, ServerResult};
use crate::proxy::Upstream;
use crate::watcher::FileWatcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub bridge: Arc<InstructionBridge>,
    pub watcher: Arc<FileWatcher>,
    pub control: Arc<ControlServices>,
    pub upstream: Upstream,
    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Validates `config`; the target port must already be resolved.
    pub fn new(
        config: ServerConfig,
        bridge: Arc<InstructionBridge>,
        watcher: Arc<FileWatcher>,
        control: ControlServices,
    ) -> ServerResult<Self> {
        config.validate()?;
        if config.target_port == 0 {
            return Err(ServerError::Config(
                "target port must be resolved before the server starts".to_string(),
            ));
        }
        let upstream = Upstream::new(config.target_port)?;

        Ok(Self {
            config: Arc::new(config),
            bridge,
            watcher,
            control: Arc::new(control),
            upstream,
            shutdown: CancellationToken::new(),
        })
    }

    /// Tie shutdown to an externally owned token
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}
