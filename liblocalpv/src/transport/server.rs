//! Node-side QUIC endpoint.
//!
//! Every bi-stream carries exactly one JSON [`ProvisionerMessage`] request and
//! gets exactly one response back; the stream is finished afterwards.  Bad
//! input never tears down the connection, it is answered with
//! [`ProvisionerMessage::Error`].

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::crypto::rustls::QuicServerConfig;
use tracing::{debug, info, instrument, warn};

use super::MAX_MESSAGE_SIZE;
use crate::error::LocalPvError;
use crate::identity::ProvisionerIdentity;
use crate::message::ProvisionerMessage;
use crate::provisioner::Provisioner;

/// Serves lifecycle and identity requests for one node.
pub struct ProvisionerServer<T> {
    endpoint: quinn::Endpoint,
    handler: Arc<T>,
}

impl<T> ProvisionerServer<T>
where
    T: ProvisionerIdentity + Provisioner + 'static,
{
    /// Bind the endpoint on `addr`.
    pub fn new(
        addr: SocketAddr,
        tls_config: rustls::ServerConfig,
        handler: Arc<T>,
    ) -> Result<Self, LocalPvError> {
        let crypto = QuicServerConfig::try_from(tls_config)
            .map_err(|e| LocalPvError::Transport(format!("invalid TLS config: {e}")))?;
        let endpoint =
            quinn::Endpoint::server(quinn::ServerConfig::with_crypto(Arc::new(crypto)), addr)
                .map_err(LocalPvError::transport)?;
        info!(%addr, "local volume provisioner listening");
        Ok(Self { endpoint, handler })
    }

    /// Run until the endpoint is closed.
    pub async fn serve(&self) -> Result<(), LocalPvError> {
        while let Some(incoming) = self.endpoint.accept().await {
            tokio::spawn(Self::serve_connection(incoming, Arc::clone(&self.handler)));
        }
        Ok(())
    }

    /// The bound endpoint; its local address is what clients dial.
    pub fn endpoint(&self) -> &quinn::Endpoint {
        &self.endpoint
    }

    async fn serve_connection(incoming: quinn::Incoming, handler: Arc<T>) {
        let conn = match incoming.await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "handshake with reconciliation engine failed");
                return;
            }
        };
        let remote = conn.remote_address();
        debug!(%remote, "engine connected");

        loop {
            match conn.accept_bi().await {
                Ok((send, recv)) => {
                    tokio::spawn(Self::answer_stream(send, recv, Arc::clone(&handler)));
                }
                Err(quinn::ConnectionError::ApplicationClosed(_)) => {
                    debug!(%remote, "engine disconnected");
                    return;
                }
                Err(e) => {
                    warn!(%remote, error = %e, "engine connection lost");
                    return;
                }
            }
        }
    }

    #[instrument(skip_all)]
    async fn answer_stream(
        mut send: quinn::SendStream,
        mut recv: quinn::RecvStream,
        handler: Arc<T>,
    ) {
        let response = match recv.read_to_end(MAX_MESSAGE_SIZE).await {
            Ok(buf) => Self::answer(&handler, &buf).await,
            Err(e) => ProvisionerMessage::Error(LocalPvError::InvalidArgument(format!(
                "unreadable request: {e}"
            ))),
        };

        let written = match serde_json::to_vec(&response) {
            Ok(payload) => send
                .write_all(&payload)
                .await
                .map_err(LocalPvError::transport)
                .and_then(|()| send.finish().map_err(LocalPvError::transport)),
            Err(e) => Err(LocalPvError::internal(e)),
        };
        if let Err(e) = written {
            warn!(%response, error = %e, "failed to return response to engine");
        }
    }

    /// Decode one request and run it against the local provisioner.
    async fn answer(handler: &T, buf: &[u8]) -> ProvisionerMessage {
        let request = match serde_json::from_slice::<ProvisionerMessage>(buf) {
            Ok(request) if request.is_request() => request,
            Ok(other) => {
                warn!(msg = %other, "response variant sent as a request");
                return ProvisionerMessage::Error(LocalPvError::InvalidArgument(format!(
                    "not a request: {other}"
                )));
            }
            Err(e) => {
                return ProvisionerMessage::Error(LocalPvError::InvalidArgument(format!(
                    "malformed request: {e}"
                )));
            }
        };
        debug!(%request, "request received");

        let result = match request {
            ProvisionerMessage::ShouldProvision(req) => {
                Ok(ProvisionerMessage::Eligibility(handler.should_provision(&req).await))
            }
            ProvisionerMessage::Provision(req) => handler
                .provision(req)
                .await
                .map(|(record, state)| ProvisionerMessage::Provisioned { record, state }),
            ProvisionerMessage::Delete(record) => handler.delete(record).await.map(Into::into),
            ProvisionerMessage::Probe => handler.probe().await.map(ProvisionerMessage::ProbeResult),
            ProvisionerMessage::GetPluginInfo => handler
                .get_plugin_info()
                .await
                .map(ProvisionerMessage::PluginInfoResponse),
            other => Err(LocalPvError::internal(format!("unhandled request {other}"))),
        };
        result.unwrap_or_else(ProvisionerMessage::Error)
    }
}
