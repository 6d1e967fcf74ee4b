// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Control verbs on the message socket
//!
//! `analyze-design` and `apply-visual-edits` build an agent instruction and
//! run it through the bridge, so they queue behind any run in flight.
//! `ai-preview` only calls the generation API and never touches the agent.

use crate::session::{run_instruction, SessionHandle};
use crate::state::AppState;
use lb_assist::prompts::{design_instruction, vision_prompt, visual_edits_instruction};
use lb_assist::{ApiKeySource, AssistError, GenerationClient, PreviewRequest, ProjectDetector};
use lb_domain_types::{EditBatch, InstructionMessage, SelectionContext, VisualEdit};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const PREVIEW_RESULT: &str = "ai-preview-result";

const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// Collaborators the control verbs call out to
pub struct ControlServices {
    pub keys: Arc<dyn ApiKeySource>,
    pub detector: Arc<dyn ProjectDetector>,
    pub generator: Arc<dyn GenerationClient>,
}

impl ControlServices {
    pub fn new(
        keys: Arc<dyn ApiKeySource>,
        detector: Arc<dyn ProjectDetector>,
        generator: Arc<dyn GenerationClient>,
    ) -> Self {
        Self { keys, detector, generator }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlVerb {
    AnalyzeDesign,
    ApplyVisualEdits,
    AiPreview,
}

impl ControlVerb {
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "analyze-design" => Some(ControlVerb::AnalyzeDesign),
            "apply-visual-edits" => Some(ControlVerb::ApplyVisualEdits),
            "ai-preview" => Some(ControlVerb::AiPreview),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ControlVerb::AnalyzeDesign => "analyze-design",
            ControlVerb::ApplyVisualEdits => "apply-visual-edits",
            ControlVerb::AiPreview => "ai-preview",
        }
    }
}

/// Failures reported before anything was submitted to the agent
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("missing required fields: image or prompt")]
    MissingDesignFields,

    #[error("missing or invalid changes array")]
    InvalidChanges,

    #[error("missing or invalid instruction")]
    MissingInstruction,

    #[error("invalid request: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Assist(#[from] AssistError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AnalyzeDesignRequest {
    image: String,
    image_type: String,
    prompt: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VisualEditsRequest {
    changes: Option<Value>,
    batch: Option<EditBatch>,
}

/// Run `verb` for `raw` and report pre-submission failures on `session`
pub async fn dispatch(verb: ControlVerb, state: &AppState, session: &SessionHandle, raw: &str) {
    info!(verb = verb.as_str(), session = %session.id(), "Control request");
    let outcome = match verb {
        ControlVerb::AnalyzeDesign => analyze_design(state, session, raw).await,
        ControlVerb::ApplyVisualEdits => apply_visual_edits(state, session, raw).await,
        ControlVerb::AiPreview => ai_preview(state, session, raw).await,
    };

    if let Err(e) = outcome {
        warn!(verb = verb.as_str(), error = %e, "Control request failed");
        session.send_json(&error_reply(verb, &e)).await;
    }
}

pub fn error_reply(verb: ControlVerb, error: &ControlError) -> Value {
    match verb {
        ControlVerb::AiPreview => json!({
            "type": PREVIEW_RESULT,
            "status": "error",
            "error": error.to_string(),
        }),
        _ => json!({ "status": "error", "error": error.to_string() }),
    }
}

/// Correlation id for instructions the server builds itself
fn timestamp_id() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn analyze_design(
    state: &AppState,
    session: &SessionHandle,
    raw: &str,
) -> Result<(), ControlError> {
    let request: AnalyzeDesignRequest = serde_json::from_str(raw)?;
    if request.image.is_empty() || request.prompt.trim().is_empty() {
        return Err(ControlError::MissingDesignFields);
    }
    let image_type = if request.image_type.is_empty() {
        DEFAULT_IMAGE_TYPE
    } else {
        request.image_type.as_str()
    };

    let services = &state.control;
    let project_dir = state.bridge.project_dir();
    let api_key = services.keys.lookup(project_dir)?;
    let context = services.detector.detect(project_dir);
    info!(project = %context, image_type, "Analyzing design image");

    let analysis = services
        .generator
        .describe_image(
            &api_key,
            &request.image,
            image_type,
            &vision_prompt(&context, &request.prompt),
        )
        .await?;

    let message = InstructionMessage {
        id: timestamp_id(),
        area: SelectionContext::default(),
        instruction: design_instruction(&request.prompt, &analysis),
        screenshot: None,
    };
    run_instruction(&state.bridge, session, &message).await;
    Ok(())
}

async fn apply_visual_edits(
    state: &AppState,
    session: &SessionHandle,
    raw: &str,
) -> Result<(), ControlError> {
    let request: VisualEditsRequest = serde_json::from_str(raw)?;
    let edits: Vec<VisualEdit> = match request.changes {
        Some(Value::Array(changes)) if !changes.is_empty() => {
            serde_json::from_value(Value::Array(changes))
                .map_err(|_| ControlError::InvalidChanges)?
        }
        _ => return Err(ControlError::InvalidChanges),
    };

    let context = state.control.detector.detect(state.bridge.project_dir());
    info!(edits = edits.len(), project = %context, "Applying visual edits");

    let message = InstructionMessage {
        id: timestamp_id(),
        area: SelectionContext {
            element_count: edits.len(),
            ..Default::default()
        },
        instruction: visual_edits_instruction(&edits, request.batch, &context),
        screenshot: None,
    };
    run_instruction(&state.bridge, session, &message).await;
    Ok(())
}

async fn ai_preview(
    state: &AppState,
    session: &SessionHandle,
    raw: &str,
) -> Result<(), ControlError> {
    let request: PreviewRequest = serde_json::from_str(raw)?;
    if request.instruction.trim().is_empty() {
        return Err(ControlError::MissingInstruction);
    }

    let services = &state.control;
    let api_key = services.keys.lookup(state.bridge.project_dir())?;
    let changes = services.generator.preview_changes(&api_key, &request).await?;
    info!(changes = changes.len(), "Preview ready");

    session
        .send_json(&json!({
            "type": PREVIEW_RESULT,
            "status": "success",
            "changes": changes,
        }))
        .await;
    Ok(())
}
