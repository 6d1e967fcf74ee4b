// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The `livebridge` command
//!
//! Resolves settings, makes sure a dev server, an API key and the agent CLI
//! are present, then runs the server next to the terminal view until either
//! the user quits or the process is signalled.

pub mod app;
pub mod args;
pub mod bootstrap;
pub mod detect;

pub use app::run;
pub use args::Cli;
pub use clap::Parser;
