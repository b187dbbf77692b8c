//! Daemon configuration.
//!
//! Every option can be given on the command line or through the environment:
//! - `LOCALPV_NODE_NAME`: name of the node this instance serves (required).
//! - `LOCALPV_ROOT_PATH`: directory under which volume directories are
//!   created (required, must exist).
//! - `LOCALPV_LISTEN`: QUIC listen address. Defaults to `0.0.0.0:7443`.
//! - `LOCALPV_TLS_CERT` / `LOCALPV_TLS_KEY`: PEM certificate chain and key.
//! - `LOCALPV_LOG`: tracing filter directive. Defaults to `info`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use liblocalpv::ProvisionerConfig;

#[derive(Parser, Debug)]
#[command(name = "rkl-localpv")]
#[command(about = "RK8s node-local volume dynamic provisioner")]
pub struct Args {
    #[arg(long, env = "LOCALPV_NODE_NAME")]
    pub node_name: String,

    #[arg(long, env = "LOCALPV_ROOT_PATH")]
    pub root_path: PathBuf,

    #[arg(long, env = "LOCALPV_LISTEN", default_value = "0.0.0.0:7443")]
    pub listen: SocketAddr,

    #[arg(long, env = "LOCALPV_TLS_CERT")]
    pub tls_cert: PathBuf,

    #[arg(long, env = "LOCALPV_TLS_KEY")]
    pub tls_key: PathBuf,

    #[arg(long, env = "LOCALPV_LOG", default_value = "info")]
    pub log: String,
}

impl Args {
    /// Validate node and root path into a provisioner configuration.
    pub fn provisioner_config(&self) -> Result<ProvisionerConfig, liblocalpv::LocalPvError> {
        ProvisionerConfig::new(self.node_name.clone(), self.root_path.clone())
    }
}
