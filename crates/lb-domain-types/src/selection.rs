// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Browser selection types
//!
//! An [`InstructionMessage`] is what the page sends when the developer drags a
//! selection rectangle and types an instruction for it.

use serde::{Deserialize, Serialize};

/// A single DOM element captured by the page.
///
/// `parent` and `siblings` are only populated one level deep; nested
/// descriptors never carry their own parent or siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    pub tag_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Space separated class list
    pub classes: String,
    pub selector: String,
    pub inner_text: String,
    #[serde(rename = "outerHTML")]
    pub outer_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ElementDescriptor>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<ElementDescriptor>,
}

impl ElementDescriptor {
    pub fn first_class(&self) -> Option<&str> {
        self.classes.split_whitespace().next()
    }
}

/// The rectangle the developer selected and the elements inside it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionContext {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub element_count: usize,
    pub elements: Vec<ElementDescriptor>,
}

impl SelectionContext {
    /// Human readable one-liner shown above the agent output.
    pub fn summary(&self) -> String {
        format!(
            "Area: {}x{}px with {} elements",
            self.width, self.height, self.element_count
        )
    }
}

/// One browser instruction; maps to exactly one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionMessage {
    /// Caller assigned correlation id echoed in every status frame
    pub id: i64,
    pub area: SelectionContext,
    pub instruction: String,
    /// Base64 encoded screenshot of the selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Lifecycle status reported back to the page for a correlation id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Received,
    Complete,
    Error,
}

/// Outbound `{"id","status","error"?}` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    pub id: i64,
    pub status: FrameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusFrame {
    pub fn received(id: i64) -> Self {
        Self { id, status: FrameStatus::Received, error: None }
    }

    pub fn complete(id: i64) -> Self {
        Self { id, status: FrameStatus::Complete, error: None }
    }

    pub fn error(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            status: FrameStatus::Error,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn instruction_decodes_browser_frame() {
        let frame = json!({
            "id": 42,
            "instruction": "make it blue",
            "area": {
                "x": 10, "y": 20, "width": 300, "height": 120, "elementCount": 1,
                "elements": [{
                    "tagName": "button",
                    "id": "cta",
                    "classes": "btn primary",
                    "selector": "#cta",
                    "innerText": "Buy",
                    "outerHTML": "<button id=\"cta\">Buy</button>"
                }]
            }
        });

        let msg: InstructionMessage = serde_json::from_value(frame).unwrap();
        assert_eq!(msg.id, 42);
        assert_eq!(msg.area.width, 300);
        assert_eq!(msg.area.elements[0].outer_html, "<button id=\"cta\">Buy</button>");
        assert_eq!(msg.area.elements[0].first_class(), Some("btn"));
        assert_eq!(msg.screenshot, None);
    }

    #[test]
    fn missing_element_fields_decode_as_empty() {
        let el: ElementDescriptor = serde_json::from_value(json!({ "tagName": "div" })).unwrap();
        assert_eq!(el.id, "");
        assert_eq!(el.inner_text, "");
        assert_eq!(el.first_class(), None);
        assert!(el.parent.is_none());
    }

    #[test]
    fn area_summary_format() {
        let area = SelectionContext {
            width: 640,
            height: 80,
            element_count: 3,
            ..Default::default()
        };
        assert_eq!(area.summary(), "Area: 640x80px with 3 elements");
    }

    #[test]
    fn status_frames_serialize_compactly() {
        assert_eq!(
            serde_json::to_value(StatusFrame::received(7)).unwrap(),
            json!({ "id": 7, "status": "received" })
        );
        assert_eq!(
            serde_json::to_value(StatusFrame::error(7, "boom")).unwrap(),
            json!({ "id": 7, "status": "error", "error": "boom" })
        );
    }
}
