// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Terminal view of livebridge agent runs
//!
//! The view model ([`view_model::RenderState`]) is a pure state machine over
//! [`lb_agent::BridgeEvent`]s; [`view`] draws it and [`render_loop`] owns it.

pub mod error;
pub mod render_loop;
pub mod terminal;
pub mod theme;
pub mod view;
pub mod view_model;

pub use error::{TuiError, TuiResult};
pub use render_loop::{drive, run_console, run_tui, InputEvent};
pub use theme::Theme;
pub use view_model::{LogEntry, RenderState, RunStatus, SessionInfo};

use ratatui::{backend::TestBackend, Terminal};

/// Terminal with a deterministic in-memory backend, for tests and snapshots
pub fn create_test_terminal(width: u16, height: u16) -> TuiResult<Terminal<TestBackend>> {
    Ok(Terminal::new(TestBackend::new(width, height))?)
}
