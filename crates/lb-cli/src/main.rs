// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use lb_cli::{Cli, Parser};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = lb_cli::run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
