// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP behaviour of the proxy: injection, passthrough and bridge assets

mod common;

use common::{dead_port, HarnessBuilder};
use lb_server::rewriter::INJECTION_MARKER;
use pretty_assertions::assert_eq;
use reqwest::header;
use reqwest::StatusCode;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn html_pages_get_instrumented() {
    let harness = HarnessBuilder::new().start().await;

    let response = client().get(harness.http("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = response.text().await.unwrap();

    assert_eq!(length, body.len());
    assert_eq!(body.matches(INJECTION_MARKER).count(), 1);
    assert!(body.contains("<script defer src=\"/__livebridge/inject.js\"></script>"));
    assert!(body.find(INJECTION_MARKER).unwrap() < body.find("</body>").unwrap());
    assert!(body.starts_with("<html><head><title>app</title></head><body><h1>Hello</h1>"));
}

#[tokio::test]
async fn gzip_html_is_decoded_before_injection() {
    let harness = HarnessBuilder::new().start().await;

    let response = client().get(harness.http("/zipped")).send().await.unwrap();
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("<h1>Hello</h1>"));
    assert!(body.contains(INJECTION_MARKER));
}

#[tokio::test]
async fn non_html_passes_through_unchanged() {
    let harness = HarnessBuilder::new().start().await;

    let response = client().get(harness.http("/api/data")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.text().await.unwrap(), r#"{"ok":true}"#);
}

#[tokio::test]
async fn request_bodies_are_forwarded() {
    let harness = HarnessBuilder::new().start().await;

    let response = client()
        .post(harness.http("/echo"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "got payload");
}

#[tokio::test]
async fn upstream_sees_its_own_host_and_no_accept_encoding() {
    let harness = HarnessBuilder::new().start().await;

    let body = client()
        .get(harness.http("/headers"))
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let (host, encoding) = body.split_once('|').unwrap();
    assert!(host.starts_with("127.0.0.1:"));
    assert_eq!(encoding, "none");
}

#[tokio::test]
async fn redirects_reach_the_browser() {
    let harness = HarnessBuilder::new().start().await;

    let response = client().get(harness.http("/old")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/new");
}

#[tokio::test]
async fn upstream_status_codes_are_preserved() {
    let harness = HarnessBuilder::new().start().await;

    let response = client().get(harness.http("/missing")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let port = dead_port().await;
    let harness = HarnessBuilder::new().target_port(port).start().await;

    let response = client().get(harness.http("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Bad Gateway");
}

#[tokio::test]
async fn bridge_assets_are_served_locally() {
    let harness = HarnessBuilder::new().start().await;

    let response = client()
        .get(harness.http("/__livebridge/inject.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert!(!response.text().await.unwrap().is_empty());

    let response = client()
        .get(harness.http("/__livebridge/cursor.svg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
}

#[tokio::test]
async fn unknown_bridge_paths_are_not_proxied() {
    let harness = HarnessBuilder::new().start().await;

    let response = client()
        .get(harness.http("/__livebridge/nope.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "Not Found");
}

#[tokio::test]
async fn shutdown_stops_the_server() {
    let harness = HarnessBuilder::new().start().await;
    assert!(client().get(harness.http("/")).send().await.is_ok());

    harness.shutdown.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(5), harness.server)
        .await
        .expect("server stops within the grace period")
        .unwrap();
}

#[tokio::test]
async fn binding_an_occupied_port_fails() {
    let harness = HarnessBuilder::new().start().await;
    let server = harness.server_for_port(harness.addr.port());

    let Err(lb_server::ServerError::Bind { addr, .. }) = server.bind().await else {
        panic!("expected bind failure");
    };
    assert_eq!(addr, harness.addr);
}
