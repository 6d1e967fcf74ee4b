// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dev server port detection

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Vite, CRA/Next, webpack/Vue CLI, Angular, Django/static servers
pub const DEV_SERVER_PORTS: &[u16] = &[5173, 3000, 8080, 4200, 8000];

pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// First port in `ports` accepting a TCP connection on localhost
pub async fn detect_dev_server(ports: &[u16], timeout: Duration) -> Option<u16> {
    for &port in ports {
        match tokio::time::timeout(timeout, TcpStream::connect(("127.0.0.1", port))).await {
            Ok(Ok(_)) => {
                debug!(port, "Dev server found");
                return Some(port);
            }
            Ok(Err(e)) => debug!(port, error = %e, "No dev server"),
            Err(_) => debug!(port, "Probe timed out"),
        }
    }
    None
}
