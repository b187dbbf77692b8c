//! Provisioner instance configuration.
//!
//! A [`ProvisionerConfig`] is built once at startup and passed by reference
//! into every lifecycle call.  It is never mutated afterwards.

use std::path::{Path, PathBuf};

use crate::error::LocalPvError;

/// Identity stamped on every volume this implementation provisions.
pub const PROVISIONER_NAME: &str = "rk8s.io/local-volume";

/// Node and root path of one provisioner instance.
///
/// The provisioner identity is always [`PROVISIONER_NAME`]; volumes stamped
/// with it must stay deletable across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    node_name: String,
    root_path: PathBuf,
}

impl ProvisionerConfig {
    /// Validate and build a configuration.
    ///
    /// Fails if `node_name` is empty or `root_path` is not an existing
    /// directory.
    pub fn new(
        node_name: impl Into<String>,
        root_path: impl Into<PathBuf>,
    ) -> Result<Self, LocalPvError> {
        let node_name = node_name.into();
        let root_path = root_path.into();

        if node_name.trim().is_empty() {
            return Err(LocalPvError::InvalidConfig("node name is empty".into()));
        }

        match std::fs::metadata(&root_path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(LocalPvError::InvalidConfig(format!(
                    "root path {} is not a directory",
                    root_path.display()
                )));
            }
            Err(e) => {
                return Err(LocalPvError::InvalidConfig(format!(
                    "root path {}: {e}",
                    root_path.display()
                )));
            }
        }

        Ok(Self {
            node_name,
            root_path,
        })
    }

    pub fn provisioner_name(&self) -> &str {
        PROVISIONER_NAME
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}
