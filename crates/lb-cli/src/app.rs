// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Startup, run and shutdown of the bridge process

use crate::args::Cli;
use crate::bootstrap::ensure_api_key;
use crate::detect::{detect_dev_server, DEV_SERVER_PORTS, PROBE_TIMEOUT};
use anyhow::Context;
use lb_agent::claude::ClaudeAgent;
use lb_agent::{EventSink, ExecutionPipeline};
use lb_assist::{AnthropicClient, ClientConfig, PackageJsonDetector, SettingsFileKeySource};
use lb_logging::{CliLogLevel, LogDestination};
use lb_server::{AppState, ControlServices, FileWatcher, InstructionBridge, Server};
use lb_tui::SessionInfo;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const COMPONENT: &str = "livebridge";

/// Run until a signal or a quit from the terminal view
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = cli.server_config()?;

    let default_level = if config.verbose {
        CliLogLevel::Debug
    } else {
        CliLogLevel::Info
    };
    let destination = cli
        .logging
        .init(COMPONENT, !cli.no_tui, default_level)
        .context("Failed to initialize logging")?;

    config.project_dir = config
        .project_dir
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", config.project_dir.display()))?;

    if config.target_port == 0 {
        config.target_port = detect_dev_server(DEV_SERVER_PORTS, PROBE_TIMEOUT)
            .await
            .with_context(|| {
                format!(
                    "No dev server found on ports {DEV_SERVER_PORTS:?}. \
                     Start your dev server first or pass --target-port"
                )
            })?;
        println!("✓ Dev server detected on port {}", config.target_port);
    }
    config.validate()?;

    let keys = SettingsFileKeySource::new();
    ensure_api_key(
        &keys,
        &config.project_dir,
        std::io::stdin().lock(),
        std::io::stdout(),
    )?;

    let agent = ClaudeAgent::with_binary(config.claude_path.clone());
    let agent_binary = agent
        .ensure_available()
        .with_context(|| format!("Agent CLI '{}' is not available", config.claude_path))?;
    info!(binary = %agent_binary.display(), "Agent CLI found");

    let (sink, events) = EventSink::channel();
    let pipeline = Arc::new(ExecutionPipeline::new(
        Arc::new(agent),
        config.project_dir.clone(),
        config.verbose,
        sink,
    ));
    let bridge = Arc::new(InstructionBridge::new(pipeline));
    let watcher = Arc::new(
        FileWatcher::start(&config.project_dir, config.reload_debounce())
            .context("Failed to start file watcher")?,
    );
    let generator =
        AnthropicClient::new(ClientConfig::default()).context("Failed to build API client")?;
    let control = ControlServices::new(
        Arc::new(keys),
        Arc::new(PackageJsonDetector),
        Arc::new(generator),
    );

    let info = SessionInfo {
        proxy_url: config.public_url(),
        target_url: config.upstream_origin(),
        project_dir: config.project_dir.display().to_string(),
    };

    let shutdown = CancellationToken::new();
    let state = AppState::new(config, bridge, watcher.clone(), control)?
        .with_shutdown(shutdown.clone());
    let server = Server::new(state);
    let listener = server.bind().await?;

    tokio::spawn(shutdown_on_signal(shutdown.clone()));
    let serving = tokio::spawn(server.serve(listener));

    if cli.no_tui {
        println!("✓ Proxy running at {}", info.proxy_url);
        println!("  Forwarding to {}", info.target_url);
        println!("  Press Ctrl-C to stop");
        lb_tui::run_console(events, shutdown.clone()).await;
    } else {
        if let LogDestination::File(path) = &destination {
            println!("Logging to {}", path.display());
        }
        if let Err(e) = lb_tui::run_tui(info, events, shutdown.clone()).await {
            warn!("Terminal view failed: {}", e);
        }
    }

    shutdown.cancel();
    let served = serving.await.context("Server task failed")?;
    watcher.close();
    served?;

    info!("livebridge stopped");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn shutdown_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
            _ = term.recv() => info!("SIGTERM received, shutting down"),
            _ = shutdown.cancelled() => return,
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
            _ = shutdown.cancelled() => return,
        }
    }

    shutdown.cancel();
}
