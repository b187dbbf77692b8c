//! QUIC client used by the reconciliation engine to drive a node-local
//! provisioner.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use quinn::crypto::rustls::QuicClientConfig;
use tracing::{debug, instrument};

use super::MAX_MESSAGE_SIZE;
use crate::error::LocalPvError;
use crate::message::ProvisionerMessage;
use crate::types::{
    DeleteOutcome, PluginInfo, ProvisioningRequest, ProvisioningState, VolumeRecord,
};

/// A lightweight client that sends [`ProvisionerMessage`] requests over a
/// single QUIC connection and returns the server's response.
pub struct ProvisionerClient {
    connection: quinn::Connection,
}

impl ProvisionerClient {
    /// Establish a new QUIC connection to the provisioner at `addr`.
    ///
    /// * `addr` — socket address of the node's provisioner server
    /// * `server_name` — TLS SNI name that must match a SAN in the server's
    ///   certificate
    /// * `tls_config` — client TLS configuration trusting the server's CA
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        tls_config: rustls::ClientConfig,
    ) -> Result<Self, LocalPvError> {
        let quic_client_config = QuicClientConfig::try_from(tls_config)
            .map_err(|e| LocalPvError::Transport(format!("invalid TLS config: {e}")))?;
        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let mut endpoint = quinn::Endpoint::client(bind).map_err(LocalPvError::transport)?;
        endpoint.set_default_client_config(client_config);

        let connection = endpoint
            .connect(addr, server_name)
            .map_err(LocalPvError::transport)?
            .await
            .map_err(LocalPvError::transport)?;

        debug!(%addr, %server_name, "provisioner QUIC connection established");
        Ok(Self { connection })
    }

    /// Send a request and wait for the corresponding response.
    ///
    /// Each call opens a new bi-directional QUIC stream, writes the
    /// JSON-serialized request, finishes the send side, then reads the
    /// full response and deserializes it.
    #[instrument(skip(self), fields(msg = %msg))]
    pub async fn request(
        &self,
        msg: &ProvisionerMessage,
    ) -> Result<ProvisionerMessage, LocalPvError> {
        let (mut send, mut recv) = self
            .connection
            .open_bi()
            .await
            .map_err(LocalPvError::transport)?;

        let payload = serde_json::to_vec(msg).map_err(LocalPvError::internal)?;
        send.write_all(&payload)
            .await
            .map_err(LocalPvError::transport)?;
        send.finish().map_err(LocalPvError::transport)?;

        let buf = recv
            .read_to_end(MAX_MESSAGE_SIZE)
            .await
            .map_err(LocalPvError::transport)?;

        let response: ProvisionerMessage =
            serde_json::from_slice(&buf).map_err(LocalPvError::transport)?;
        debug!(%response, "provisioner response received");
        Ok(response)
    }

    pub async fn should_provision(&self, req: ProvisioningRequest) -> Result<bool, LocalPvError> {
        match self.request(&ProvisionerMessage::ShouldProvision(req)).await? {
            ProvisionerMessage::Eligibility(ok) => Ok(ok),
            other => Err(unexpected(other)),
        }
    }

    pub async fn provision(
        &self,
        req: ProvisioningRequest,
    ) -> Result<(VolumeRecord, ProvisioningState), LocalPvError> {
        match self.request(&ProvisionerMessage::Provision(req)).await? {
            ProvisionerMessage::Provisioned { record, state } => Ok((record, state)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete(&self, record: VolumeRecord) -> Result<DeleteOutcome, LocalPvError> {
        match self.request(&ProvisionerMessage::Delete(record)).await? {
            ProvisionerMessage::Deleted => Ok(DeleteOutcome::Deleted),
            ProvisionerMessage::Ignored { reason } => Ok(DeleteOutcome::Ignored { reason }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn probe(&self) -> Result<bool, LocalPvError> {
        match self.request(&ProvisionerMessage::Probe).await? {
            ProvisionerMessage::ProbeResult(ok) => Ok(ok),
            other => Err(unexpected(other)),
        }
    }

    pub async fn plugin_info(&self) -> Result<PluginInfo, LocalPvError> {
        match self.request(&ProvisionerMessage::GetPluginInfo).await? {
            ProvisionerMessage::PluginInfoResponse(info) => Ok(info),
            other => Err(unexpected(other)),
        }
    }

    /// Close the underlying QUIC connection gracefully.
    pub fn close(&self) {
        self.connection
            .close(quinn::VarInt::from_u32(0), b"client shutdown");
    }
}

/// Unwrap a server-side error, or flag a response of the wrong kind.
fn unexpected(msg: ProvisionerMessage) -> LocalPvError {
    match msg {
        ProvisionerMessage::Error(e) => e,
        other => LocalPvError::Transport(format!("unexpected response: {other}")),
    }
}
