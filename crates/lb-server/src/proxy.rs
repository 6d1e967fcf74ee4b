// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reverse proxy to the developer's dev server

use crate::error::{ServerError, ServerResult};
use crate::rewriter::{self, RewriteError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Response,
    },
    response::IntoResponse,
};
use std::error::Error as _;
use tracing::{debug, trace, warn};

/// Headers that describe a single hop and are never forwarded
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client bound to one upstream origin
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    origin: String,
    authority: HeaderValue,
}

impl Upstream {
    /// Client for `http://127.0.0.1:{port}`. Responses are never decompressed
    /// and redirects are handed back to the browser.
    pub fn new(port: u16) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .build()
            .map_err(|e| ServerError::Internal(format!("Failed to build upstream client: {e}")))?;
        let authority = HeaderValue::from_str(&format!("127.0.0.1:{port}"))
            .map_err(|e| ServerError::Internal(format!("Invalid upstream authority: {e}")))?;

        Ok(Self {
            client,
            origin: format!("http://127.0.0.1:{port}"),
            authority,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Connection may list further per-hop headers
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Headers sent upstream for a browser request
pub fn upstream_request_headers(incoming: &HeaderMap, authority: &HeaderValue) -> HeaderMap {
    let mut headers = incoming.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::ACCEPT_ENCODING);
    headers.insert(header::HOST, authority.clone());
    headers
}

fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(header::TRANSFER_ENCODING)
        || headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim() != "0")
}

fn classify(error: reqwest::Error) -> ServerError {
    // A request body error while sending means the browser stopped uploading
    if error.is_body() || error.source().is_some_and(|source| source.is::<axum::Error>()) {
        return ServerError::ClientClosed;
    }
    ServerError::BadGateway(error.to_string())
}

/// Fallback handler: everything outside the bridge prefix
pub async fn forward(State(state): State<AppState>, request: Request) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match forward_inner(&state, request).await {
        Ok(response) => response,
        Err(ServerError::ClientClosed) => {
            trace!(%method, %path, "Client went away mid-request");
            ServerError::ClientClosed.into_response()
        }
        Err(e) => {
            warn!(%method, %path, error = %e, "Proxy request failed");
            e.into_response()
        }
    }
}

async fn forward_inner(state: &AppState, request: Request) -> ServerResult<Response<Body>> {
    let upstream = &state.upstream;
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream.origin, path_and_query);

    let mut builder = upstream
        .client
        .request(parts.method.clone(), &url)
        .headers(upstream_request_headers(&parts.headers, &upstream.authority));
    if has_body(&parts.headers) {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let reply = builder.send().await.map_err(classify)?;
    debug!(method = %parts.method, url = %url, status = %reply.status(), "Upstream replied");

    let status = reply.status();
    let mut headers = reply.headers().clone();
    strip_hop_by_hop(&mut headers);

    if !rewriter::is_html(&headers) {
        let mut response = Response::new(Body::from_stream(reply.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return Ok(response);
    }

    let bytes = reply.bytes().await.map_err(classify)?;
    let mut buffered = Response::new(bytes);
    *buffered.status_mut() = status;
    *buffered.headers_mut() = headers;

    let rewritten = match rewriter::rewrite(buffered, &state.config.base_path) {
        Ok(response) => response,
        Err(RewriteError::Decompress { source, original }) => {
            warn!(url = %url, error = %source, "Passing through HTML that failed to decompress");
            *original
        }
    };
    Ok(rewritten.map(Body::from))
}
