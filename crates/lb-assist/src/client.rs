// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Anthropic Messages API client
//!
//! Used for the two calls that bypass the agent: describing a design image
//! and producing instant-preview DOM changes.

use crate::error::{AssistError, AssistResult};
use crate::prompts;
use async_trait::async_trait;
use lb_domain_types::{DesignTokens, DomChange, ElementDescriptor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const API_VERSION: &str = "2023-06-01";

const VISION_MAX_TOKENS: u32 = 4096;
const PREVIEW_MAX_TOKENS: u32 = 2048;

/// Instant preview request, decoded straight from the browser frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewRequest {
    pub instruction: String,
    pub elements: Vec<ElementDescriptor>,
    /// Base64 PNG of the selection
    pub screenshot: Option<String>,
    pub design_tokens: Option<DesignTokens>,
}

/// Calls into the generation API
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Describe a base64 encoded image following `prompt`
    async fn describe_image(
        &self,
        api_key: &str,
        image_b64: &str,
        media_type: &str,
        prompt: &str,
    ) -> AssistResult<String>;

    /// DOM changes that preview `request` without touching any file
    async fn preview_changes(
        &self,
        api_key: &str,
        request: &PreviewRequest,
    ) -> AssistResult<Vec<DomChange>>;
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            // Vision analysis of a detailed design can take minutes.
            timeout_seconds: 180,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> ContentBlock<'a> {
    fn image(media_type: &'a str, data: &'a str) -> Self {
        ContentBlock::Image {
            source: ImageSource { kind: "base64", media_type, data },
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct PreviewReply {
    #[serde(default)]
    changes: Vec<DomChange>,
}

/// reqwest based [`GenerationClient`]
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AnthropicClient {
    pub fn new(config: ClientConfig) -> AssistResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(
        &self,
        api_key: &str,
        max_tokens: u32,
        content: Vec<ContentBlock<'_>>,
    ) -> AssistResult<String> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            messages: vec![Message { role: "user", content }],
        };

        debug!(endpoint = %self.config.endpoint, max_tokens, "Calling Messages API");
        let response = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorEnvelope>(&raw) {
                Ok(envelope) if !envelope.error.kind.is_empty() => {
                    format!("{} - {}", envelope.error.kind, envelope.error.message)
                }
                Ok(envelope) => envelope.error.message,
                Err(_) => raw,
            };
            return Err(AssistError::Api { status: status.as_u16(), message });
        }

        let parsed: MessagesResponse = serde_json::from_str(&raw)?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| AssistError::invalid_response("no text content in API response"))
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn describe_image(
        &self,
        api_key: &str,
        image_b64: &str,
        media_type: &str,
        prompt: &str,
    ) -> AssistResult<String> {
        let media_type = if media_type.is_empty() { "image/png" } else { media_type };
        let content = vec![
            ContentBlock::image(media_type, image_b64),
            ContentBlock::Text { text: prompt },
        ];

        let analysis = self.send(api_key, VISION_MAX_TOKENS, content).await?;
        info!("Vision analysis completed ({} bytes)", analysis.len());
        Ok(analysis)
    }

    async fn preview_changes(
        &self,
        api_key: &str,
        request: &PreviewRequest,
    ) -> AssistResult<Vec<DomChange>> {
        if request.instruction.trim().is_empty() {
            return Err(AssistError::invalid_request("missing or invalid instruction"));
        }
        if request.elements.is_empty() {
            return Err(AssistError::invalid_request("no elements provided"));
        }

        let prompt = prompts::preview_prompt(request);
        let mut content = Vec::with_capacity(2);
        if let Some(screenshot) = request.screenshot.as_deref().filter(|s| !s.is_empty()) {
            content.push(ContentBlock::image("image/png", screenshot));
        }
        content.push(ContentBlock::Text { text: &prompt });

        let reply = self.send(api_key, PREVIEW_MAX_TOKENS, content).await?;
        let changes = parse_preview_reply(&reply)?;
        info!("Preview produced {} DOM change(s)", changes.len());
        Ok(changes)
    }
}

/// Parse `{"changes":[...]}`, falling back to the first fenced code block
pub fn parse_preview_reply(reply: &str) -> AssistResult<Vec<DomChange>> {
    let parsed = serde_json::from_str::<PreviewReply>(reply.trim()).or_else(|_| {
        let fenced = extract_fenced_block(reply).unwrap_or(reply);
        serde_json::from_str::<PreviewReply>(fenced.trim())
    });

    match parsed {
        Ok(reply) if reply.changes.is_empty() => {
            Err(AssistError::invalid_response("model returned no DOM changes"))
        }
        Ok(reply) => Ok(reply.changes),
        Err(e) => Err(AssistError::invalid_response(format!(
            "could not parse preview reply as JSON: {e}"
        ))),
    }
}

/// Body of the first ``` fence, without an optional `json` language tag
fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(&rest[..end])
}
