//! Claim eligibility.
//!
//! A local directory cannot be shared safely for writes across nodes, so only
//! claims asking for single-node read-write access are taken.

use crate::types::{AccessMode, ProvisioningRequest};

/// Whether this provisioner should take `req`.
pub fn should_provision(req: &ProvisioningRequest) -> bool {
    req.access_modes.contains(&AccessMode::ReadWriteOnce)
}
