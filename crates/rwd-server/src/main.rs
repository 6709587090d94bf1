use anyhow::Context;
use rwd_server::config::ServerConfig;
use rwd_server::{cli, http, logging, App};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();

    let mut config = ServerConfig::from_env().context("invalid configuration")?;
    if let Some(port) = cli::port(&matches) {
        config = config.with_port(port);
    }
    let _log_guard = logging::init(&config.log).context("cannot initialize logging")?;

    tracing::info!(
        target: "config",
        port = config.port,
        prefix = %config.path_prefix,
        isolation = ?config.isolation,
        demo_data = config.populate_demo_data,
        client_ip_header = config.client_ip_header.as_deref().unwrap_or("-"),
        "configuration loaded"
    );

    let app = Arc::new(App::from_config(&config).context("cannot build seed dataset")?);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    http::serve(app, addr, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "lifecycle", error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "lifecycle", "shutdown requested");
}
