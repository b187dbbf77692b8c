mod config;
mod tls;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use liblocalpv::LocalVolumeProvisioner;
use liblocalpv::transport::ProvisionerServer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "RK8s local volume provisioner");

    let config = args
        .provisioner_config()
        .context("Cannot continue with the given node name and root path")?;
    let tls = tls::load_server_config(&args.tls_cert, &args.tls_key)?;

    info!(
        node = config.node_name(),
        root = %config.root_path().display(),
        provisioner = config.provisioner_name(),
        "starting local provisioner",
    );

    let provisioner = Arc::new(LocalVolumeProvisioner::new(config));
    let server = ProvisionerServer::new(args.listen, tls, provisioner)
        .context("Failed to start provisioner server")?;

    if let Err(e) = server.serve().await {
        error!(error = %e, "provisioner server failed");
        return Err(e).context("Provisioner server failed");
    }

    error!("provisioner server stopped by itself");
    bail!("Provisioner server stopped unexpectedly")
}
