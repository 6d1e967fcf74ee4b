// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Decoder for the agent's `--output-format stream-json` lines
//!
//! Each stdout line is an independent JSON object with a string `type`. Flat
//! lines (`content`, `tool_use`, `tool_result`, `error`) map to one event
//! each. `assistant` and `user` envelopes carry a `message.content` array of
//! blocks, each of which may produce an event. Run bookkeeping lines such as
//! `system` and `result` produce nothing; the pipeline synthesizes the
//! terminal event from the exit status instead.

use crate::events::{StreamEvent, StreamEventKind};
use serde_json::{Map, Value};

/// Why a line could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line is not a JSON object")]
    NotAnObject,

    #[error("missing or non-string `type` field")]
    MissingType,
}

/// Decode one stdout line into zero or more events
pub fn decode_line(line: &str) -> Result<Vec<StreamEvent>, LineError> {
    let value: Value = serde_json::from_str(line.trim())?;
    let Value::Object(object) = value else {
        return Err(LineError::NotAnObject);
    };
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(LineError::MissingType)?
        .to_string();

    let events = match kind.as_str() {
        "content" => flat(StreamEventKind::Content, "content", object),
        "tool_use" => flat(StreamEventKind::ToolUse, "name", object),
        "tool_result" => flat(StreamEventKind::ToolResult, "content", object),
        // Not terminal for the run; the pipeline still reports the exit status
        "error" => flat(StreamEventKind::Error, "error", object),
        "assistant" | "user" => message_blocks(&object),
        _ => Vec::new(),
    };
    Ok(events)
}

fn flat(kind: StreamEventKind, field: &str, object: Map<String, Value>) -> Vec<StreamEvent> {
    let text = object.get(field).map(text_of).unwrap_or_default();
    vec![StreamEvent::new(kind, text, object)]
}

fn message_blocks(object: &Map<String, Value>) -> Vec<StreamEvent> {
    let Some(blocks) = object
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    blocks
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|block| {
            let (kind, field) = match block.get("type").and_then(Value::as_str)? {
                "text" => (StreamEventKind::Content, "text"),
                "tool_use" => (StreamEventKind::ToolUse, "name"),
                "tool_result" => (StreamEventKind::ToolResult, "content"),
                _ => return None,
            };
            let text = block.get(field).map(text_of).unwrap_or_default();
            if kind == StreamEventKind::Content && text.trim().is_empty() {
                return None;
            }
            Some(StreamEvent::new(kind, text, block.clone()))
        })
        .collect()
}

/// Plain strings pass through; block arrays contribute their `text` parts.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(events: &[StreamEvent]) -> Vec<StreamEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn flat_lines_take_text_from_their_field() {
        let content = decode_line(r#"{"type":"content","content":"Looking at App.vue"}"#).unwrap();
        assert_eq!(content[0].kind, StreamEventKind::Content);
        assert_eq!(content[0].text, "Looking at App.vue");

        let tool = decode_line(r#"{"type":"tool_use","name":"Edit","input":{}}"#).unwrap();
        assert_eq!(tool[0].kind, StreamEventKind::ToolUse);
        assert_eq!(tool[0].text, "Edit");
        assert!(tool[0].data.contains_key("input"));

        let result = decode_line(r#"{"type":"tool_result","content":"ok"}"#).unwrap();
        assert_eq!(result[0].text, "ok");

        let error = decode_line(r#"{"type":"error","error":"rate limited"}"#).unwrap();
        assert_eq!(error[0].kind, StreamEventKind::Error);
        assert_eq!(error[0].text, "rate limited");
    }

    #[test]
    fn assistant_message_yields_one_event_per_block() {
        let line = r#"{"type":"assistant","message":{"content":[
            {"type":"text","text":"I'll update the button."},
            {"type":"tool_use","id":"t1","name":"Edit","input":{"file_path":"src/App.tsx"}}
        ]}}"#
            .replace('\n', "");
        let events = decode_line(&line).unwrap();

        assert_eq!(kinds(&events), vec![StreamEventKind::Content, StreamEventKind::ToolUse]);
        assert_eq!(events[0].text, "I'll update the button.");
        assert_eq!(events[1].text, "Edit");
        assert_eq!(events[1].data["id"], "t1");
    }

    #[test]
    fn user_message_tool_results_accept_block_content() {
        let line = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":[{"type":"text","text":"done"}]}]}}"#;
        let events = decode_line(line).unwrap();
        assert_eq!(kinds(&events), vec![StreamEventKind::ToolResult]);
        assert_eq!(events[0].text, "done");
    }

    #[test]
    fn bookkeeping_lines_produce_nothing() {
        for line in [
            r#"{"type":"system","subtype":"init","session_id":"abc"}"#,
            r#"{"type":"result","subtype":"success","result":"done"}"#,
            r#"{"type":"complete"}"#,
        ] {
            assert!(decode_line(line).unwrap().is_empty(), "{line}");
        }
    }

    #[test]
    fn blank_text_blocks_are_dropped() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"  "}]}}"#;
        assert!(decode_line(line).unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(matches!(decode_line("not json"), Err(LineError::Json(_))));
        assert!(matches!(decode_line("[1,2]"), Err(LineError::NotAnObject)));
        assert!(matches!(decode_line(r#"{"content":"x"}"#), Err(LineError::MissingType)));
        assert!(matches!(decode_line(r#"{"type":7}"#), Err(LineError::MissingType)));
    }

    #[test]
    fn missing_payload_field_gives_empty_text() {
        let events = decode_line(r#"{"type":"tool_use"}"#).unwrap();
        assert_eq!(events[0].text, "");
    }
}
