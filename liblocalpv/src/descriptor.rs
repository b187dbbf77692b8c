//! Volume descriptor builder.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::ProvisionerConfig;
use crate::error::LocalPvError;
use crate::provenance::ProvenanceTag;
use crate::types::{NodeAffinity, ProvisioningRequest, VolumeRecord};

/// Assemble the record for a volume whose backing directory is `path`.
///
/// The record is pinned to the local node and stamped with `tag`.  Fails if
/// the request carries no reclaim policy.
pub fn build_record(
    cfg: &ProvisionerConfig,
    req: &ProvisioningRequest,
    path: PathBuf,
    tag: &ProvenanceTag,
) -> Result<VolumeRecord, LocalPvError> {
    let reclaim_policy = req.reclaim_policy.ok_or_else(|| {
        LocalPvError::InvalidArgument(format!(
            "volume {}: storage class has no reclaim policy",
            req.volume_name
        ))
    })?;

    let mut annotations = BTreeMap::new();
    tag.stamp(&mut annotations);

    Ok(VolumeRecord {
        name: req.volume_name.clone(),
        annotations,
        path,
        capacity: req.capacity.clone(),
        access_modes: req.access_modes.clone(),
        reclaim_policy,
        node_affinity: NodeAffinity::single_node(cfg.node_name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::{PROVISIONED_BY_ANNOTATION, PROVISIONED_ON_ANNOTATION};
    use crate::types::{AccessMode, Capacity, ReclaimPolicy};

    fn request(policy: Option<ReclaimPolicy>) -> ProvisioningRequest {
        ProvisioningRequest {
            volume_name: "pvc-1".into(),
            capacity: Capacity::parse("1Gi").unwrap(),
            access_modes: vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany],
            reclaim_policy: policy,
            claim: Some("default/data".into()),
        }
    }

    #[test]
    fn record_copies_request_and_pins_node() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ProvisionerConfig::new("node-01", tmp.path()).unwrap();
        let tag = ProvenanceTag::local(&cfg);
        let path = tmp.path().join("pvc-1");

        let rec = build_record(&cfg, &request(Some(ReclaimPolicy::Retain)), path.clone(), &tag)
            .unwrap();

        assert_eq!(rec.name, "pvc-1");
        assert_eq!(rec.path, path);
        assert_eq!(rec.capacity.to_string(), "1Gi");
        assert_eq!(
            rec.access_modes,
            vec![AccessMode::ReadWriteOnce, AccessMode::ReadOnlyMany]
        );
        assert_eq!(rec.reclaim_policy, ReclaimPolicy::Retain);
        assert_eq!(rec.node_affinity.pinned_node(), Some("node-01"));
        assert_eq!(
            rec.annotations.get(PROVISIONED_BY_ANNOTATION).map(String::as_str),
            Some(cfg.provisioner_name())
        );
        assert_eq!(
            rec.annotations.get(PROVISIONED_ON_ANNOTATION).map(String::as_str),
            Some("node-01")
        );
    }

    #[test]
    fn missing_reclaim_policy_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ProvisionerConfig::new("node-01", tmp.path()).unwrap();
        let tag = ProvenanceTag::local(&cfg);

        let err = build_record(&cfg, &request(None), tmp.path().join("pvc-1"), &tag).unwrap_err();
        assert!(matches!(err, LocalPvError::InvalidArgument(_)));
    }
}
