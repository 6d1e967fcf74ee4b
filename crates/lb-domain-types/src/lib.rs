// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for livebridge
//!
//! This crate holds the data exchanged between the browser instrumentation,
//! the session layer and the agent pipeline. Field names follow the browser's
//! camelCase wire format so the types can be decoded straight from WebSocket
//! frames.

pub mod edits;
pub mod selection;

pub use edits::*;
pub use selection::*;
