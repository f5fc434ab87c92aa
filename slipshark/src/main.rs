// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use slipshark::config;
use slipshark::proxy;
use slipshark::upstream::{ReqwestUpstreamClient, UpstreamClient};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "slipshark-relay", about = "Streaming research relay")]
struct Cli {
    /// Path to the slipshark.yaml config file
    #[arg(long, default_value = "slipshark.yaml", env = "SLIPSHARK_CONFIG")]
    config: String,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "SLIPSHARK_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8787, env = "SLIPSHARK_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "slipshark relay starting");

    let source = config::FileSource {
        path: std::path::PathBuf::from(cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        upstream = %config.upstream.url,
        path = %config.relay.path,
        platform = %config.relay.platform,
        "config loaded"
    );

    let upstream: Arc<dyn UpstreamClient> = Arc::new(ReqwestUpstreamClient::new(
        reqwest::Client::new(),
        &config.upstream,
    ));

    let app = proxy::build_router(upstream, config.relay);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    tracing::info!(%addr, "slipshark relay listening");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
