// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Prompt builders
//!
//! `vision_prompt` and `preview_prompt` go to the Messages API directly.
//! `design_instruction` and `visual_edits_instruction` become agent
//! instructions and are flattened to a single line by the bridge, so their
//! layout only needs to survive newline collapsing.

use crate::client::PreviewRequest;
use crate::project::ProjectContext;
use lb_domain_types::{DesignTokens, EditBatch, EditOperation, ElementDescriptor, VisualEdit};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Tags treated as containers when suggesting where new markup goes
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "ul", "ol", "form",
];

/// Ask the vision model to describe a design image in implementable detail
pub fn vision_prompt(context: &ProjectContext, request: &str) -> String {
    format!(
        "Describe this design image for a {context} project styled with {styling}.\n\
         \n\
         The developer wants: {request}\n\
         \n\
         Cover every visible element, top to bottom and left to right. Leave nothing out.\n\
         \n\
         1. Layout: navigation, hero, content sections, cards, footer, and how they are arranged (grid, flex, alignment).\n\
         2. Text: transcribe every heading, paragraph, label and button caption with its size, weight and color.\n\
         3. Color: backgrounds and gradients, text, borders, button states, shadows, corner radii.\n\
         4. Spacing: margins and padding between sections, element dimensions.\n\
         5. Interactive elements: buttons, links, inputs and icons with their purpose.\n\
         \n\
         A developer must be able to rebuild the design from your description alone.",
        styling = context.styling.as_str(),
    )
}

/// Agent instruction wrapping a vision analysis
pub fn design_instruction(request: &str, analysis: &str) -> String {
    format!(
        "{request}\n\
         \n\
         Implement every element described in the design analysis below, including all text, buttons and decorative shapes.\n\
         \n\
         Design analysis:\n\
         {analysis}\n\
         \n\
         Build a complete component with the exact text content, interactive elements, colors, spacing, typography and responsive layout described. \
         The result should match the design precisely."
    )
}

/// Agent instruction describing edits made directly in the page
pub fn visual_edits_instruction(
    edits: &[VisualEdit],
    batch: Option<EditBatch>,
    context: &ProjectContext,
) -> String {
    let mut out = String::new();
    match batch {
        Some(batch) if batch.total > 1 => {
            let _ = write!(out, "Batch {} of {}: ", batch.number, batch.total);
        }
        _ => {}
    }
    out.push_str("I changed these elements visually in the browser:\n\n");

    for (index, edit) in edits.iter().enumerate() {
        let n = index + 1;
        let selector = &edit.selector;
        match &edit.operation {
            EditOperation::Reorder { reorder_data: None } => continue,
            EditOperation::Reorder { reorder_data: Some(data) } => {
                let _ = writeln!(out, "{n}. Reorder '{selector}'");
                let _ = writeln!(out, "   - parent: {}", data.parent_selector);
                let _ = writeln!(
                    out,
                    "   - move from position {} to position {}",
                    data.from_index, data.to_index
                );
                if let Some(before) = &data.insert_before_selector {
                    let _ = writeln!(out, "   - place before: {before}");
                } else if let Some(after) = &data.insert_after_selector {
                    let _ = writeln!(out, "   - place after: {after}");
                }
            }
            EditOperation::Text { old_text, new_text } => {
                let _ = writeln!(out, "{n}. Text change on '{selector}'");
                let _ = writeln!(out, "   - from: \"{old_text}\"");
                let _ = writeln!(out, "   - to: \"{new_text}\"");
            }
            EditOperation::Ai { instruction, bounds, element_count } => {
                let _ = writeln!(out, "{n}. Instruction '{instruction}' for '{selector}'");
                let _ = writeln!(out, "   - elements affected: {element_count}");
                if let Some(b) = bounds {
                    let _ = writeln!(
                        out,
                        "   - region: ({:.0}, {:.0}) {:.0}x{:.0}px",
                        b.x, b.y, b.width, b.height
                    );
                }
            }
            EditOperation::Transform { styles } => {
                let _ = writeln!(out, "{n}. Move/resize '{selector}'");
                if let Some(transform) = styles.transform.as_deref().filter(|s| !s.is_empty()) {
                    let _ = writeln!(out, "   - moved by: {transform}");
                }
                if let Some(width) = styles.width.as_deref().filter(|s| !s.is_empty()) {
                    let _ = writeln!(out, "   - width: {width}");
                }
                if let Some(height) = styles.height.as_deref().filter(|s| !s.is_empty()) {
                    let _ = writeln!(out, "   - height: {height}");
                }
            }
        }
        out.push('\n');
    }

    let _ = write!(
        out,
        "Make these changes permanent in the {} source ({} styling). \
         Locate each element from its selector, edit the file that renders it, \
         and follow the patterns the project already uses.",
        context.framework.as_str(),
        context.styling.as_str()
    );
    out
}

/// Whether new markup should go inside the element rather than next to it
pub fn is_container(element: &ElementDescriptor) -> bool {
    let tag = element.tag_name.to_ascii_lowercase();
    CONTAINER_TAGS.iter().any(|container| *container == tag)
}

/// Prompt asking for a JSON list of DOM mutations previewing `request`.
///
/// The first element is the one the developer clicked; it must not be empty.
pub fn preview_prompt(request: &PreviewRequest) -> String {
    let Some(target) = request.elements.first() else {
        return String::new();
    };
    let selector = &target.selector;
    let position = if is_container(target) { "beforeend" } else { "afterend" };

    let mut out = String::new();
    let _ = writeln!(out, "Instant preview. Instruction: \"{}\"\n", request.instruction);

    let _ = writeln!(out, "Selected element: {}", describe(target));
    let _ = writeln!(out, "Use this exact selector in every change: {selector}\n");

    match &target.parent {
        Some(parent) => {
            let _ = writeln!(out, "Parent: {} ({})", describe(parent), parent.selector);
            let _ = writeln!(out, "{}\n", parent.outer_html);
        }
        None => out.push_str("Parent: none\n\n"),
    }

    if target.siblings.is_empty() {
        out.push_str("Siblings: none\n\n");
    } else {
        out.push_str(
            "Siblings (when adding elements, copy one of these verbatim and change only its content, link and icon):\n",
        );
        for (i, sibling) in target.siblings.iter().enumerate() {
            let _ = writeln!(out, "{}. {}\n{}", i + 1, describe(sibling), sibling.outer_html);
        }
        out.push('\n');
    }

    if is_container(target) {
        out.push_str(
            "The selected element is a container: insert new markup inside it with position \"beforeend\" \
             unless the instruction asks for something outside it.\n\n",
        );
    } else {
        out.push_str(
            "The selected element is not a container: insert new markup next to it with \"afterend\" \
             or \"beforebegin\".\n\n",
        );
    }

    if request.elements.len() > 1 {
        out.push_str("Other selected elements:\n");
        for (i, el) in request.elements.iter().enumerate().skip(1) {
            let _ = writeln!(out, "{}. {} (selector: {})", i + 1, describe(el), el.selector);
        }
        out.push('\n');
    }

    if let Some(tokens) = request.design_tokens.as_ref().filter(|t| !t.is_empty()) {
        out.push_str(&design_tokens_section(tokens));
    }

    let _ = write!(
        out,
        "Reply with a single JSON object and nothing else, no prose and no code fences:\n\
         {{\"changes\": [\n  \
         {{\"selector\": \"{selector}\", \"action\": \"setStyle\", \"property\": \"color\", \"value\": \"var(--primary)\"}},\n  \
         {{\"selector\": \"{selector}\", \"action\": \"insertAdjacentHTML\", \"position\": \"{position}\", \"value\": \"<a class='...'>...</a>\"}}\n\
         ]}}\n\
         \n\
         Actions: addClass, removeClass (value = class names), setText, setHTML (value = content), \
         setStyle (property + value), setAttribute (attribute + value), remove, hide, \
         insertAdjacentHTML (position = beforebegin|afterbegin|beforeend|afterend, value = HTML).\n\
         Prefer the design tokens and existing classes over hard-coded inline values."
    );
    out
}

fn describe(element: &ElementDescriptor) -> String {
    let mut desc = element.tag_name.to_ascii_lowercase();
    if !element.id.is_empty() {
        let _ = write!(desc, " id='{}'", element.id);
    }
    if !element.classes.is_empty() {
        let _ = write!(desc, " class='{}'", element.classes);
    }
    let text = element.inner_text.trim();
    if !text.is_empty() && text.chars().count() < 50 {
        let _ = write!(desc, " text='{text}'");
    }
    desc
}

fn design_tokens_section(tokens: &DesignTokens) -> String {
    let mut out = String::from("Design tokens (CSS custom properties):\n");
    let groups: [(&str, &BTreeMap<String, String>); 4] = [
        ("Colors", &tokens.colors),
        ("Spacing", &tokens.spacing),
        ("Typography", &tokens.typography),
        ("Other", &tokens.other),
    ];
    for (title, values) in groups {
        if values.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}:");
        for (name, value) in values {
            let _ = writeln!(out, "  {name}: {value}");
        }
    }
    out.push('\n');
    out
}
