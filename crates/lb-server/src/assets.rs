// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Browser instrumentation compiled into the binary

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;

const NO_CACHE: &str = "no-cache";
const JAVASCRIPT: &str = "application/javascript";

/// One embedded file served under the bridge prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub name: &'static str,
    pub content_type: &'static str,
    pub cache_control: &'static str,
    pub body: &'static [u8],
}

static ASSETS: &[Asset] = &[
    Asset {
        name: "tailwind.min.js",
        content_type: JAVASCRIPT,
        cache_control: NO_CACHE,
        body: include_bytes!("../assets/tailwind.min.js"),
    },
    Asset {
        name: "alpine.min.js",
        content_type: JAVASCRIPT,
        cache_control: NO_CACHE,
        body: include_bytes!("../assets/alpine.min.js"),
    },
    Asset {
        name: "inject-utils.js",
        content_type: JAVASCRIPT,
        cache_control: NO_CACHE,
        body: include_bytes!("../assets/inject-utils.js"),
    },
    Asset {
        name: "inject.js",
        content_type: JAVASCRIPT,
        cache_control: NO_CACHE,
        body: include_bytes!("../assets/inject.js"),
    },
    Asset {
        name: "inject.css",
        content_type: "text/css",
        cache_control: NO_CACHE,
        body: include_bytes!("../assets/inject.css"),
    },
    Asset {
        name: "cursor.svg",
        content_type: "image/svg+xml",
        cache_control: "public, max-age=3600",
        body: include_bytes!("../assets/cursor.svg"),
    },
];

pub fn lookup(name: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.name == name)
}

pub fn all() -> &'static [Asset] {
    ASSETS
}

impl Asset {
    pub fn response(&self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, self.cache_control),
            ],
            self.body,
        )
            .into_response()
    }
}

/// `GET {base}/:name`
pub async fn serve(Path(name): Path<String>) -> Response {
    match lookup(&name) {
        Some(asset) => asset.response(),
        None => not_found().await,
    }
}

/// Anything else under the bridge prefix
pub async fn not_found() -> Response {
    debug!("Unknown bridge asset requested");
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
