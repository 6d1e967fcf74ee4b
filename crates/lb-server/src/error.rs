// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Status nginx uses for requests the client abandoned
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Upstream unavailable: {0}")]
    BadGateway(String),

    #[error("Client closed the request")]
    ClientClosed,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ServerError::ClientClosed => {
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ServerError::BadGateway(_) => "Bad Gateway".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
