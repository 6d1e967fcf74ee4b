// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Events flowing from the pipeline to the renderer

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// Classification of one unit of agent output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Content,
    ToolUse,
    ToolResult,
    Error,
    Complete,
}

impl StreamEventKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// One classified piece of streamed agent output.
///
/// `text` is the display payload (message text, tool name, error message);
/// `data` keeps the raw JSON object the event was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub kind: StreamEventKind,
    pub text: String,
    pub data: Map<String, Value>,
}

impl StreamEvent {
    pub fn new(kind: StreamEventKind, text: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { kind, text: text.into(), data }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self::new(StreamEventKind::Content, text, Map::new())
    }

    pub fn tool_use(name: impl Into<String>) -> Self {
        Self::new(StreamEventKind::ToolUse, name, Map::new())
    }

    pub fn tool_result(text: impl Into<String>) -> Self {
        Self::new(StreamEventKind::ToolResult, text, Map::new())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StreamEventKind::Error, message, Map::new())
    }

    pub fn complete() -> Self {
        Self::new(StreamEventKind::Complete, String::new(), Map::new())
    }
}

/// Message on the render channel
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A new instruction is about to run
    Instruction {
        instruction: String,
        area_summary: String,
    },
    Stream(StreamEvent),
}

impl From<StreamEvent> for BridgeEvent {
    fn from(event: StreamEvent) -> Self {
        BridgeEvent::Stream(event)
    }
}

/// Sending half of the render channel.
///
/// Emitting never blocks and never fails: once the renderer is gone events
/// are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<BridgeEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: impl Into<BridgeEvent>) {
        if self.tx.send(event.into()).is_err() {
            tracing::trace!("render channel closed, dropping event");
        }
    }
}
