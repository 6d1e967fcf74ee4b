// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Livebridge HTTP server
//!
//! Everything the browser talks to goes through this crate: the reverse
//! proxy in front of the developer's dev server (with instrumentation
//! injected into HTML pages), the embedded instrumentation assets, and the
//! two WebSocket endpoints under the bridge prefix:
//!
//! - `ws/reload` receives `{"type":"reload"}` whenever a watched source
//!   file changes;
//! - `ws/message` carries instructions and control verbs from the page and
//!   status frames back to it.

pub mod assets;
pub mod bridge;
pub mod config;
pub mod control;
pub mod error;
pub mod proxy;
pub mod rewriter;
pub mod server;
pub mod session;
pub mod state;
pub mod watcher;

pub use bridge::InstructionBridge;
pub use config::ServerConfig;
pub use control::ControlServices;
pub use error::{ServerError, ServerResult};
pub use rewriter::{rewrite, RewriteError};
pub use server::Server;
pub use state::AppState;
pub use watcher::FileWatcher;
