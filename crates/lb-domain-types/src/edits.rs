// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Visual edit and preview types
//!
//! [`VisualEdit`] entries arrive from the page when the developer drags,
//! resizes, reorders or retypes elements. [`DomChange`] is the structured
//! reply of an instant preview.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One element edit made directly in the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualEdit {
    pub selector: String,
    #[serde(flatten)]
    pub operation: EditOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum EditOperation {
    /// Element moved to a different position inside its parent
    Reorder {
        #[serde(rename = "reorderData", default, skip_serializing_if = "Option::is_none")]
        reorder_data: Option<ReorderData>,
    },
    /// Text content replaced in place
    Text {
        #[serde(rename = "oldText", default)]
        old_text: String,
        #[serde(rename = "newText", default)]
        new_text: String,
    },
    /// Free-form instruction scoped to a region
    Ai {
        #[serde(default)]
        instruction: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bounds: Option<Bounds>,
        #[serde(rename = "elementCount", default)]
        element_count: usize,
    },
    /// Drag or resize
    Transform {
        #[serde(default)]
        styles: TransformStyles,
    },
}

impl<'de> Deserialize<'de> for VisualEdit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = serde_json::Value::deserialize(deserializer)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| serde::de::Error::custom("visual edit must be an object"))?;

        let selector = object
            .get("selector")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        // Older pages omit `operation`; anything unrecognised is a transform.
        let known = matches!(
            object.get("operation").and_then(|op| op.as_str()),
            Some("reorder" | "text" | "ai" | "transform")
        );
        if !known {
            object.insert("operation".to_string(), "transform".into());
        }

        let operation = EditOperation::deserialize(value).map_err(serde::de::Error::custom)?;
        Ok(Self { selector, operation })
    }
}

/// Position of one request in a batched submission of edits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditBatch {
    pub number: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReorderData {
    pub parent_selector: String,
    pub from_index: i64,
    pub to_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_before_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_after_selector: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformStyles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// A single DOM mutation proposed by an instant preview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomChange {
    pub selector: String,
    /// `style`, `text`, `html`, `attribute`, `addClass`, `removeClass`, `insert`, ...
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Design tokens scraped from the page's computed styles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignTokens {
    #[serde(deserialize_with = "string_map")]
    pub colors: BTreeMap<String, String>,
    #[serde(deserialize_with = "string_map")]
    pub spacing: BTreeMap<String, String>,
    #[serde(deserialize_with = "string_map")]
    pub typography: BTreeMap<String, String>,
    #[serde(deserialize_with = "string_map")]
    pub other: BTreeMap<String, String>,
}

impl DesignTokens {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.spacing.is_empty()
            && self.typography.is_empty()
            && self.other.is_empty()
    }
}

/// Keeps string values and silently drops everything else.
fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            _ => None,
        })
        .collect())
}
