// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Browser WebSocket sessions
//!
//! Two endpoints live under the bridge prefix. `ws/reload` only listens for
//! reload broadcasts. `ws/message` reads one frame at a time: control verbs
//! go to [`crate::control`], everything else is an instruction that runs to
//! completion before the next frame is read.

use crate::bridge::InstructionBridge;
use crate::control::{self, ControlVerb};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use lb_domain_types::{InstructionMessage, StatusFrame};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

pub type WsSink = SplitSink<WebSocket, Message>;

/// Write side of one browser connection.
///
/// Writes are serialized through the mutex and each one is bounded by the
/// configured write timeout. A failed write is logged and dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    sender: Arc<Mutex<WsSink>>,
    write_timeout: Duration,
}

impl SessionHandle {
    pub fn new(sender: WsSink, write_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Arc::new(Mutex::new(sender)),
            write_timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn send_json<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        match serde_json::to_string(payload) {
            Ok(text) => self.send_text(text).await,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to encode frame");
                false
            }
        }
    }

    pub async fn send_text(&self, text: String) -> bool {
        let write = async {
            let mut sender = self.sender.lock().await;
            sender.send(Message::Text(text)).await
        };
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(session = %self.id, error = %e, "Failed to write frame");
                false
            }
            Err(_) => {
                warn!(session = %self.id, timeout = ?self.write_timeout, "Timed out writing frame");
                false
            }
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// A decoded `ws/message` frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Control(ControlVerb),
    Instruction(InstructionMessage),
}

impl Inbound {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        if let Some(verb) = envelope.kind.as_deref().and_then(ControlVerb::from_type) {
            return Ok(Inbound::Control(verb));
        }
        serde_json::from_str(text).map(Inbound::Instruction)
    }
}

/// `GET {base}/ws/reload`
pub async fn reload_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_reload(socket, state))
}

/// `GET {base}/ws/message`
pub async fn message_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_messages(socket, state))
}

async fn handle_reload(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let session = SessionHandle::new(sender, state.config.write_timeout());
    let (subscriber, mut reloads) = state.watcher.subscribe().await;

    let forwarder = {
        let session = session.clone();
        tokio::spawn(async move {
            while let Some(text) = reloads.recv().await {
                if !session.send_text(text).await {
                    break;
                }
            }
        })
    };

    // Frames from the page carry nothing; reading only detects the close.
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    state.watcher.unsubscribe(subscriber).await;
    forwarder.abort();
}

async fn handle_messages(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let session = SessionHandle::new(sender, state.config.write_timeout());
    debug!(session = %session.id(), "Message connection opened");

    loop {
        let frame = tokio::select! {
            _ = state.shutdown.cancelled() => break,
            frame = receiver.next() => frame,
        };
        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => continue,
        };
        dispatch(&state, &session, &text).await;
    }

    debug!(session = %session.id(), "Message connection closed");
}

async fn dispatch(state: &AppState, session: &SessionHandle, text: &str) {
    match Inbound::decode(text) {
        Ok(Inbound::Control(verb)) => control::dispatch(verb, state, session, text).await,
        Ok(Inbound::Instruction(message)) => {
            run_instruction(&state.bridge, session, &message).await
        }
        Err(e) => debug!(session = %session.id(), error = %e, "Skipping malformed frame"),
    }
}

/// Acknowledge, run and report one instruction on `session`
pub async fn run_instruction(
    bridge: &InstructionBridge,
    session: &SessionHandle,
    message: &InstructionMessage,
) {
    session.send_json(&StatusFrame::received(message.id)).await;

    let outcome = match bridge.handle(message).await {
        Ok(()) => StatusFrame::complete(message.id),
        Err(e) => StatusFrame::error(message.id, e.to_string()),
    };
    session.send_json(&outcome).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_verbs_are_recognised_by_type() {
        assert_eq!(
            Inbound::decode(r#"{"type":"analyze-design","image":"x","prompt":"y"}"#).unwrap(),
            Inbound::Control(ControlVerb::AnalyzeDesign)
        );
        assert_eq!(
            Inbound::decode(r#"{"type":"apply-visual-edits","changes":[]}"#).unwrap(),
            Inbound::Control(ControlVerb::ApplyVisualEdits)
        );
        assert_eq!(
            Inbound::decode(r#"{"type":"ai-preview"}"#).unwrap(),
            Inbound::Control(ControlVerb::AiPreview)
        );
    }

    #[test]
    fn untyped_and_unknown_frames_are_instructions() {
        let Inbound::Instruction(message) =
            Inbound::decode(r#"{"id":3,"instruction":"center it","area":{"width":10}}"#)
                .unwrap()
        else {
            panic!("expected instruction");
        };
        assert_eq!(message.id, 3);
        assert_eq!(message.area.width, 10);

        assert!(matches!(
            Inbound::decode(r#"{"type":"something-new","id":4}"#).unwrap(),
            Inbound::Instruction(InstructionMessage { id: 4, .. })
        ));
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(Inbound::decode("not json").is_err());
        assert!(Inbound::decode(r#"{"type":42}"#).is_err());
        assert!(Inbound::decode(r#"{"id":"seven"}"#).is_err());
        assert!(Inbound::decode(r#""just a string""#).is_err());
    }
}
