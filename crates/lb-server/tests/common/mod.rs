// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::Router;
use flate2::{write::GzEncoder, Compression};
use futures::{SinkExt, StreamExt};
use lb_agent::test_support::ScriptAgent;
use lb_agent::{AgentLauncher, BridgeEvent, EventSink, ExecutionPipeline};
use lb_assist::{
    ApiKeySource, AssistError, AssistResult, GenerationClient, PackageJsonDetector, PreviewRequest,
};
use lb_domain_types::DomChange;
use lb_server::{AppState, ControlServices, FileWatcher, InstructionBridge, Server, ServerConfig};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

pub const PAGE: &str = "<html><head><title>app</title></head><body><h1>Hello</h1></body></html>";
pub const TEST_KEY: &str = "sk-ant-test";

pub type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

fn gzip(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Dev server stand-in with one route per response shape the proxy handles
pub async fn spawn_upstream() -> u16 {
    let app = Router::new()
        .route(
            "/",
            get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], PAGE) }),
        )
        .route(
            "/zipped",
            get(|| async {
                (
                    [
                        (header::CONTENT_TYPE, "text/html"),
                        (header::CONTENT_ENCODING, "gzip"),
                    ],
                    gzip(PAGE),
                )
            }),
        )
        .route(
            "/api/data",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"ok":true}"#) }),
        )
        .route("/old", get(|| async { Redirect::temporary("/new") }))
        .route(
            "/echo",
            post(|body: String| async move { format!("got {body}") }),
        )
        .route(
            "/headers",
            get(|headers: axum::http::HeaderMap| async move {
                let host = headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let encoding = headers
                    .get(header::ACCEPT_ENCODING)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                format!("{host}|{encoding}")
            }),
        )
        .fallback(|| async { StatusCode::NOT_FOUND.into_response() });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    port
}

/// A port nothing is listening on
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub struct StaticKey(pub Option<&'static str>);

impl ApiKeySource for StaticKey {
    fn lookup(&self, _project_root: &Path) -> AssistResult<String> {
        self.0.map(str::to_string).ok_or(AssistError::ApiKeyNotFound)
    }
}

/// Generation client that records its prompts and returns canned answers
#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerationClient for FakeGenerator {
    async fn describe_image(
        &self,
        api_key: &str,
        _image_b64: &str,
        media_type: &str,
        prompt: &str,
    ) -> AssistResult<String> {
        assert_eq!(api_key, TEST_KEY);
        self.prompts.lock().unwrap().push(format!("{media_type}|{prompt}"));
        Ok("A blue hero section with a centered call to action".to_string())
    }

    async fn preview_changes(
        &self,
        _api_key: &str,
        request: &PreviewRequest,
    ) -> AssistResult<Vec<DomChange>> {
        self.prompts.lock().unwrap().push(request.instruction.clone());
        Ok(vec![DomChange {
            selector: "h1".into(),
            action: "style".into(),
            property: Some("color".into()),
            value: Some("red".into()),
            ..Default::default()
        }])
    }
}

pub struct Harness {
    pub addr: SocketAddr,
    pub target_port: u16,
    pub events: mpsc::UnboundedReceiver<BridgeEvent>,
    pub watcher: Arc<FileWatcher>,
    pub generator: Arc<FakeGenerator>,
    pub shutdown: CancellationToken,
    pub project: TempDir,
    pub server: tokio::task::JoinHandle<()>,
}

impl Harness {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn socket(&self, endpoint: &str) -> Socket {
        let url = format!("ws://{}/__livebridge/ws/{}", self.addr, endpoint);
        let (socket, _) = connect_async(url).await.expect("websocket connects");
        socket
    }

    /// A second server configured for `port`, sharing this project dir
    pub fn server_for_port(&self, port: u16) -> Server {
        let config = ServerConfig {
            proxy_port: port,
            target_port: self.target_port,
            project_dir: self.project.path().to_path_buf(),
            ..Default::default()
        };
        let (sink, _events) = EventSink::channel();
        let pipeline = Arc::new(ExecutionPipeline::new(
            Arc::new(ScriptAgent::new("true")),
            self.project.path(),
            false,
            sink,
        ));
        let (_triggers, rx) = mpsc::unbounded_channel();
        let control = ControlServices::new(
            Arc::new(StaticKey(None)),
            Arc::new(PackageJsonDetector),
            Arc::new(FakeGenerator::default()),
        );
        let state = AppState::new(
            config,
            Arc::new(InstructionBridge::new(pipeline)),
            Arc::new(FileWatcher::from_triggers(rx, Duration::from_millis(50))),
            control,
        )
        .unwrap();
        Server::new(state)
    }
}

pub struct HarnessBuilder {
    agent: Arc<dyn AgentLauncher>,
    key: Option<&'static str>,
    target_port: Option<u16>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            agent: Arc::new(ScriptAgent::emitting(
                &[r#"{"type":"content","content":"done"}"#],
                0,
            )),
            key: Some(TEST_KEY),
            target_port: None,
        }
    }

    pub fn agent(mut self, agent: impl AgentLauncher + 'static) -> Self {
        self.agent = Arc::new(agent);
        self
    }

    pub fn without_key(mut self) -> Self {
        self.key = None;
        self
    }

    pub fn target_port(mut self, port: u16) -> Self {
        self.target_port = Some(port);
        self
    }

    pub async fn start(self) -> Harness {
        let project = tempfile::tempdir().unwrap();
        let target_port = match self.target_port {
            Some(port) => port,
            None => spawn_upstream().await,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = ServerConfig {
            proxy_port: addr.port(),
            target_port,
            project_dir: project.path().to_path_buf(),
            write_timeout_ms: 1000,
            shutdown_grace_secs: 1,
            ..Default::default()
        };

        let (sink, events) = EventSink::channel();
        let pipeline = Arc::new(ExecutionPipeline::new(self.agent, project.path(), false, sink));
        let bridge = Arc::new(InstructionBridge::new(pipeline));

        // Reloads are triggered directly, never by the filesystem
        let (_triggers, rx) = mpsc::unbounded_channel();
        let watcher = Arc::new(FileWatcher::from_triggers(rx, Duration::from_millis(50)));

        let generator = Arc::new(FakeGenerator::default());
        let control = ControlServices::new(
            Arc::new(StaticKey(self.key)),
            Arc::new(PackageJsonDetector),
            generator.clone(),
        );

        let shutdown = CancellationToken::new();
        let state = AppState::new(config, bridge, watcher.clone(), control)
            .unwrap()
            .with_shutdown(shutdown.clone());

        let server = tokio::spawn(async move {
            Server::new(state).serve(listener).await.unwrap();
        });

        Harness {
            addr,
            target_port,
            events,
            watcher,
            generator,
            shutdown,
            project,
            server,
        }
    }
}

pub async fn send_json(socket: &mut Socket, value: serde_json::Value) {
    socket
        .send(Message::Text(value.to_string()))
        .await
        .expect("frame sent");
}

/// Next text frame decoded as JSON, failing the test after five seconds
pub async fn next_json(socket: &mut Socket) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within timeout")
            .expect("socket still open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("json frame");
        }
    }
}

pub fn instruction(id: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "instruction": text,
        "area": {
            "x": 0,
            "y": 0,
            "width": 120,
            "height": 40,
            "elementCount": 1,
            "elements": [{"tagName": "h1", "selector": "h1", "innerText": "Hello"}]
        }
    })
}
