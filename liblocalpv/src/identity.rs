//! Provisioner identity service.
//!
//! Lets the reconciliation engine discover which provisioner and node it is
//! talking to, and check that the instance is still healthy.

use std::path::Path;

use async_trait::async_trait;
use nix::unistd::{AccessFlags, access};

use crate::error::LocalPvError;
use crate::provisioner::LocalVolumeProvisioner;
use crate::types::PluginInfo;

/// Identity service — plugin discovery and health probing.
#[async_trait]
pub trait ProvisionerIdentity: Send + Sync {
    /// Return the provisioner name, version and node.
    async fn get_plugin_info(&self) -> Result<PluginInfo, LocalPvError>;

    /// Liveness probe.  Returns `true` when the plugin is healthy.
    async fn probe(&self) -> Result<bool, LocalPvError>;
}

#[async_trait]
impl ProvisionerIdentity for LocalVolumeProvisioner {
    async fn get_plugin_info(&self) -> Result<PluginInfo, LocalPvError> {
        Ok(PluginInfo {
            name: self.config().provisioner_name().to_owned(),
            vendor_version: env!("CARGO_PKG_VERSION").to_owned(),
            node_name: self.config().node_name().to_owned(),
        })
    }

    async fn probe(&self) -> Result<bool, LocalPvError> {
        let root = self.config().root_path().to_path_buf();
        tokio::task::spawn_blocking(move || root_is_usable(&root))
            .await
            .map_err(LocalPvError::internal)
    }
}

/// Healthy while the root is a directory we can create entries in.
fn root_is_usable(root: &Path) -> bool {
    let is_dir = std::fs::metadata(root).map(|m| m.is_dir()).unwrap_or(false);
    is_dir && access(root, AccessFlags::W_OK | AccessFlags::X_OK).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PROVISIONER_NAME, ProvisionerConfig};

    fn make_provisioner(root: &std::path::Path) -> LocalVolumeProvisioner {
        LocalVolumeProvisioner::new(ProvisionerConfig::new("node-01", root).unwrap())
    }

    #[tokio::test]
    async fn plugin_info() {
        let tmp = tempfile::tempdir().unwrap();
        let p = make_provisioner(tmp.path());
        let info = p.get_plugin_info().await.unwrap();
        assert_eq!(info.name, PROVISIONER_NAME);
        assert_eq!(info.node_name, "node-01");
    }

    #[tokio::test]
    async fn probe_healthy_root() {
        let tmp = tempfile::tempdir().unwrap();
        let p = make_provisioner(tmp.path());
        assert!(p.probe().await.unwrap());
    }

    #[tokio::test]
    async fn probe_root_removed_after_start() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let p = make_provisioner(&root);

        std::fs::remove_dir(&root).unwrap();
        assert!(!p.probe().await.unwrap());
    }

    #[test]
    fn plain_file_root_is_unusable() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(!root_is_usable(&file));
        assert!(root_is_usable(tmp.path()));
    }
}
