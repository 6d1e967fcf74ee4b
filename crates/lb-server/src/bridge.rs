// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Translation from browser instructions to agent prompts

use lb_agent::{BridgeEvent, ExecutionPipeline, PipelineResult};
use lb_domain_types::{ElementDescriptor, InstructionMessage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Elements spelled out in the prompt; the rest are counted
const DESCRIBED_ELEMENTS: usize = 3;
const TEXT_LIMIT: usize = 80;
const MARKUP_LIMIT: usize = 160;

/// Hands browser instructions to the execution pipeline
pub struct InstructionBridge {
    pipeline: Arc<ExecutionPipeline>,
}

impl InstructionBridge {
    pub fn new(pipeline: Arc<ExecutionPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn project_dir(&self) -> &Path {
        self.pipeline.project_dir()
    }

    /// Run the agent for `message` and wait for its terminal outcome
    pub async fn handle(&self, message: &InstructionMessage) -> PipelineResult<()> {
        info!(
            id = message.id,
            elements = message.area.element_count,
            "Instruction received"
        );
        self.pipeline.events().emit(BridgeEvent::Instruction {
            instruction: message.instruction.clone(),
            area_summary: message.area.summary(),
        });

        let line = format_line(message);
        debug!(id = message.id, bytes = line.len(), "Submitting agent prompt");
        self.pipeline.submit(&line).await
    }
}

/// Single-line agent prompt for `message`.
///
/// ```
/// use lb_domain_types::{InstructionMessage, SelectionContext};
///
/// let message = InstructionMessage {
///     instruction: "Make it\nbigger".into(),
///     area: SelectionContext { width: 40, height: 20, ..Default::default() },
///     ..Default::default()
/// };
/// assert_eq!(
///     lb_server::bridge::format_line(&message),
///     "Make it bigger (Selected area: 40x20 pixels with 0 elements: )"
/// );
/// ```
pub fn format_line(message: &InstructionMessage) -> String {
    let area = &message.area;
    let mut parts = vec![
        collapse_lines(&message.instruction),
        format!(
            "(Selected area: {}x{} pixels with {} elements:",
            area.width, area.height, area.element_count
        ),
    ];

    parts.extend(area.elements.iter().take(DESCRIBED_ELEMENTS).map(describe));
    if area.elements.len() > DESCRIBED_ELEMENTS {
        parts.push(format!("+{} more", area.elements.len() - DESCRIBED_ELEMENTS));
    }
    parts.push(")".to_string());

    parts.retain(|part| !part.is_empty());
    parts.join(" ")
}

/// `<tag>#id.firstclass [selector] "text…" `markup…``
fn describe(element: &ElementDescriptor) -> String {
    let mut out = format!("<{}>", element.tag_name);
    if !element.id.is_empty() {
        out.push('#');
        out.push_str(&element.id);
    }
    if let Some(class) = element.first_class() {
        out.push('.');
        out.push_str(class);
    }
    if !element.selector.is_empty() {
        out.push_str(&format!(" [{}]", element.selector));
    }

    let text = excerpt(&element.inner_text, TEXT_LIMIT);
    if !text.is_empty() {
        out.push_str(&format!(" \"{text}\""));
    }
    let markup = excerpt(&element.outer_html, MARKUP_LIMIT);
    if !markup.is_empty() {
        out.push_str(&format!(" `{markup}`"));
    }
    out
}

fn collapse_lines(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace-collapsed `text`, cut to `limit` characters with an ellipsis
fn excerpt(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(limit).collect();
    cut.push('…');
    cut
}
