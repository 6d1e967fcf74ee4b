// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the assist collaborators

/// Result type alias for operations that can fail
pub type AssistResult<T> = std::result::Result<T, AssistError>;

#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("API key not configured. Please set ANTHROPIC_API_KEY in .claude/settings.json")]
    ApiKeyNotFound,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected API response: {message}")]
    InvalidResponse { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AssistError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }
}
