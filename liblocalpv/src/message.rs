//! Provisioner protocol messages transmitted over QUIC.
//!
//! [`ProvisionerMessage`] is the top-level envelope for all request and
//! response variants exchanged between the reconciliation engine (client) and
//! the node-local provisioner (server) via QUIC bi-directional streams.

use serde::{Deserialize, Serialize};

use crate::error::LocalPvError;
use crate::types::*;

/// Top-level message envelope.
///
/// Each QUIC bi-stream carries exactly one request followed by one response.
/// The client sends a *request* variant and the server replies with the
/// corresponding *response* variant (or [`ProvisionerMessage::Error`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProvisionerMessage {
    // ----- Requests --------------------------------------------------------
    /// Ask whether the claim is eligible.
    ShouldProvision(ProvisioningRequest),
    /// Provision a volume for the claim.
    Provision(ProvisioningRequest),
    /// Delete a previously provisioned volume.
    Delete(VolumeRecord),
    /// Health probe.
    Probe,
    /// Query plugin info.
    GetPluginInfo,

    // ----- Responses -------------------------------------------------------
    /// Eligibility decision.
    Eligibility(bool),
    /// A volume was provisioned.
    Provisioned {
        record: VolumeRecord,
        state: ProvisioningState,
    },
    /// The backing storage was removed.
    Deleted,
    /// Deletion was declined; nothing was touched.
    Ignored { reason: IgnoreReason },
    /// Probe result.
    ProbeResult(bool),
    /// Plugin information.
    PluginInfoResponse(PluginInfo),
    /// An error occurred.
    Error(LocalPvError),
}

impl ProvisionerMessage {
    /// Whether a client may send this variant.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::ShouldProvision(_)
                | Self::Provision(_)
                | Self::Delete(_)
                | Self::Probe
                | Self::GetPluginInfo
        )
    }
}

impl From<DeleteOutcome> for ProvisionerMessage {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Deleted => Self::Deleted,
            DeleteOutcome::Ignored { reason } => Self::Ignored { reason },
        }
    }
}

impl std::fmt::Display for ProvisionerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShouldProvision(req) => write!(f, "ShouldProvision({})", req.volume_name),
            Self::Provision(req) => write!(f, "Provision({})", req.volume_name),
            Self::Delete(rec) => write!(f, "Delete({})", rec.name),
            Self::Probe => f.write_str("Probe"),
            Self::GetPluginInfo => f.write_str("GetPluginInfo"),
            Self::Eligibility(ok) => write!(f, "Eligibility({})", ok),
            Self::Provisioned { record, .. } => write!(f, "Provisioned({})", record.name),
            Self::Deleted => f.write_str("Deleted"),
            Self::Ignored { reason } => write!(f, "Ignored({})", reason),
            Self::ProbeResult(ok) => write!(f, "ProbeResult({})", ok),
            Self::PluginInfoResponse(info) => write!(f, "PluginInfo(name={})", info.name),
            Self::Error(e) => write!(f, "Error({})", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsOp;

    #[test]
    fn provision_request_roundtrip() {
        let msg = ProvisionerMessage::Provision(ProvisioningRequest {
            volume_name: "pvc-1".into(),
            capacity: Capacity::parse("1Gi").unwrap(),
            access_modes: vec![AccessMode::ReadWriteOnce],
            reclaim_policy: Some(ReclaimPolicy::Delete),
            claim: None,
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: ProvisionerMessage = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(de, ProvisionerMessage::Provision(req) if req.capacity.bytes() == 1 << 30));
    }

    #[test]
    fn terminal_error_roundtrip() {
        let msg = ProvisionerMessage::Error(LocalPvError::Terminal {
            op: FsOp::Remove,
            path: "/srv/pvc-1".into(),
            reason: "device or resource busy".into(),
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: ProvisionerMessage = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(de, ProvisionerMessage::Error(e) if e.is_terminal()));
    }

    #[test]
    fn delete_outcome_conversion() {
        let ignored = DeleteOutcome::Ignored {
            reason: IgnoreReason::ForeignProvisioner { found: None },
        };
        assert!(matches!(
            ProvisionerMessage::from(ignored),
            ProvisionerMessage::Ignored { .. }
        ));
        assert!(matches!(
            ProvisionerMessage::from(DeleteOutcome::Deleted),
            ProvisionerMessage::Deleted
        ));
    }

    #[test]
    fn only_requests_are_requests() {
        assert!(ProvisionerMessage::Probe.is_request());
        assert!(ProvisionerMessage::GetPluginInfo.is_request());
        assert!(!ProvisionerMessage::Deleted.is_request());
        assert!(!ProvisionerMessage::ProbeResult(true).is_request());
    }

    #[test]
    fn display_formatting() {
        assert_eq!(ProvisionerMessage::Deleted.to_string(), "Deleted");
        assert_eq!(ProvisionerMessage::Probe.to_string(), "Probe");
    }
}
