//! # liblocalpv — node-local dynamic volume provisioning for RK8s
//!
//! `liblocalpv` allocates a directory under a configured root for every
//! eligible storage claim, describes it as a volume pinned to the local node,
//! and removes the directory again when the volume is deleted.  Deletion is
//! guarded by provenance annotations so an instance never touches volumes it
//! did not create, or volumes created on another node.
//!
//! The lifecycle core is synchronous and stateless beyond its
//! [`ProvisionerConfig`].  The reconciliation engine drives it remotely
//! through a QUIC transport (via [`quinn`]), following the RK8s conventions
//! (Tokio async runtime, `tracing` for observability, `thiserror` for
//! structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Data model: requests, `VolumeRecord`, access modes, affinity. |
//! | [`error`] | [`LocalPvError`] enum covering all failure modes. |
//! | [`config`] | [`ProvisionerConfig`] — identity, node, root path. |
//! | [`store`] | [`DirectoryStore`] — backing directory create/remove. |
//! | [`provenance`] | Ownership annotations and the deletion guard chain. |
//! | [`eligibility`] | Which claims this provisioner takes. |
//! | [`descriptor`] | Builds the `VolumeRecord`. |
//! | [`provisioner`] | Lifecycle entry points and the [`Provisioner`] trait. |
//! | [`identity`] | [`ProvisionerIdentity`] trait — plugin info & health. |
//! | [`message`] | [`ProvisionerMessage`] protocol envelope. |
//! | [`transport`] | QUIC client/server built on `quinn`. |

pub mod config;
pub mod descriptor;
pub mod eligibility;
pub mod error;
pub mod identity;
pub mod message;
pub mod provenance;
pub mod provisioner;
pub mod store;
pub mod transport;
pub mod types;

pub use config::{PROVISIONER_NAME, ProvisionerConfig};
pub use error::LocalPvError;
pub use identity::ProvisionerIdentity;
pub use message::ProvisionerMessage;
pub use provisioner::{LocalVolumeProvisioner, Provisioner};
pub use store::{DirectoryStore, LocalDirStore};
pub use types::*;
