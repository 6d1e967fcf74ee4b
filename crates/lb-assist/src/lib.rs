// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Collaborators used by the livebridge control verbs
//!
//! - [`credentials`]: where the Anthropic API key comes from
//! - [`project`]: framework and styling detection for prompt context
//! - [`client`]: direct calls to the Messages API (vision, instant preview)
//! - [`prompts`]: prompt and instruction builders

pub mod client;
pub mod credentials;
pub mod error;
pub mod project;
pub mod prompts;

pub use client::{AnthropicClient, ClientConfig, GenerationClient, PreviewRequest};
pub use credentials::{write_project_settings, ApiKeySource, SettingsFileKeySource};
pub use error::{AssistError, AssistResult};
pub use project::{Framework, PackageJsonDetector, ProjectContext, ProjectDetector, Styling};
