//! Ownership tagging and the pre-deletion guard chain.
//!
//! Every volume this provisioner creates carries two annotations naming the
//! provisioner identity and the node it was created on.  Deletion only
//! proceeds when both match the local instance.

use std::collections::BTreeMap;

use crate::config::ProvisionerConfig;
use crate::types::{IgnoreReason, VolumeRecord};

/// Annotation key holding the provisioner identity.
pub const PROVISIONED_BY_ANNOTATION: &str = "rk8s.io/provisioned-by";
/// Annotation key holding the owning node name.
pub const PROVISIONED_ON_ANNOTATION: &str = "rk8s.io/provisioned-on";

/// Which provisioner and which node created a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceTag {
    pub provisioner: String,
    pub node: String,
}

impl ProvenanceTag {
    /// The tag of the local instance.
    pub fn local(cfg: &ProvisionerConfig) -> Self {
        Self {
            provisioner: cfg.provisioner_name().to_owned(),
            node: cfg.node_name().to_owned(),
        }
    }

    /// Write both annotations, replacing any previous values.
    pub fn stamp(&self, annotations: &mut BTreeMap<String, String>) {
        annotations.insert(PROVISIONED_BY_ANNOTATION.to_owned(), self.provisioner.clone());
        annotations.insert(PROVISIONED_ON_ANNOTATION.to_owned(), self.node.clone());
    }
}

/// Verdict of the guard chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The volume is ours; storage may be mutated.
    Proceed,
    /// Leave storage alone.
    Ignored(IgnoreReason),
}

/// Run the identity check, then the node check, against the local tag.
pub fn verify(cfg: &ProvisionerConfig, record: &VolumeRecord) -> Guard {
    let local = ProvenanceTag::local(cfg);

    let by = record.annotations.get(PROVISIONED_BY_ANNOTATION);
    if by != Some(&local.provisioner) {
        return Guard::Ignored(IgnoreReason::ForeignProvisioner { found: by.cloned() });
    }

    let on = record.annotations.get(PROVISIONED_ON_ANNOTATION);
    if on != Some(&local.node) {
        return Guard::Ignored(IgnoreReason::ForeignNode {
            found: on.cloned(),
            local: local.node,
        });
    }

    Guard::Proceed
}
