// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Agent execution for livebridge
//!
//! Browser instructions end up here as a single formatted line. The
//! [`ExecutionPipeline`] runs the agent CLI once per line, strictly one run at
//! a time, and turns its `stream-json` output into [`StreamEvent`]s that are
//! pushed to whoever renders them.
//!
//! # Example
//!
//! ```no_run
//! use lb_agent::{claude::ClaudeAgent, EventSink, ExecutionPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (sink, mut events) = EventSink::channel();
//!     let pipeline = ExecutionPipeline::new(Arc::new(ClaudeAgent::new()), ".", false, sink);
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{event:?}");
//!         }
//!     });
//!
//!     pipeline.submit("Make the header sticky").await?;
//!     Ok(())
//! }
//! ```

pub mod claude;
pub mod events;
pub mod pipeline;
pub mod stream;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use events::{BridgeEvent, EventSink, StreamEvent, StreamEventKind};
pub use pipeline::{ExecutionPipeline, PipelineError, PipelineResult, PipelineState};
pub use traits::{AgentError, AgentLaunchConfig, AgentLauncher, AgentResult};
