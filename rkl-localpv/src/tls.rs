//! TLS material for the QUIC listener.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

/// Build a TLS 1.3 server configuration from PEM files.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<rustls::ServerConfig> {
    let certs = CertificateDer::pem_file_iter(cert_path)
        .with_context(|| format!("Failed to open certificate {}", cert_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse certificate {}", cert_path.display()))?;
    if certs.is_empty() {
        anyhow::bail!("No certificate found in {}", cert_path.display());
    }

    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("Failed to load private key {}", key_path.display()))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .context("Failed to select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Failed to build TLS server config")
}
