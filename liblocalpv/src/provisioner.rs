//! Provisioning lifecycle: eligibility, provision and delete.
//!
//! The free functions in this module are the blocking core.  They hold no
//! state besides the [`ProvisionerConfig`] passed in, perform no retries and
//! no locking; the reconciliation engine serialises calls for one volume
//! name.
//!
//! [`Provisioner`] is the async seam the transport server dispatches to, and
//! [`LocalVolumeProvisioner`] implements it by running the core on Tokio's
//! blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::ProvisionerConfig;
use crate::descriptor::build_record;
use crate::error::LocalPvError;
use crate::provenance::{self, Guard, ProvenanceTag};
use crate::store::{DirectoryStore, LocalDirStore, VOLUME_DIR_MODE, volume_path};
use crate::types::{DeleteOutcome, ProvisioningRequest, ProvisioningState, VolumeRecord};

pub use crate::eligibility::should_provision;

/// Allocate a backing directory for `req` and describe it.
#[instrument(skip_all, fields(volume = %req.volume_name, node = %cfg.node_name()))]
pub fn provision(
    cfg: &ProvisionerConfig,
    store: &dyn DirectoryStore,
    req: &ProvisioningRequest,
) -> Result<(VolumeRecord, ProvisioningState), LocalPvError> {
    info!(claim = ?req.claim, capacity = %req.capacity, "provisioning volume");

    let path = volume_path(cfg.root_path(), &req.volume_name)?;
    if req.reclaim_policy.is_none() {
        return Err(LocalPvError::InvalidArgument(format!(
            "volume {}: storage class has no reclaim policy",
            req.volume_name
        )));
    }

    if let Err(e) = store.ensure_dir(&path, VOLUME_DIR_MODE) {
        error!(path = %path.display(), error = %e, "backing directory creation failed");
        return Err(e);
    }
    info!(path = %path.display(), "backing directory ready");

    let tag = ProvenanceTag::local(cfg);
    let record = build_record(cfg, req, path, &tag)?;

    info!("volume provisioned");
    Ok((record, ProvisioningState::Finished))
}

/// Remove the backing directory of `record` if this instance owns it.
#[instrument(skip_all, fields(volume = %record.name, node = %cfg.node_name()))]
pub fn delete(
    cfg: &ProvisionerConfig,
    store: &dyn DirectoryStore,
    record: &VolumeRecord,
) -> Result<DeleteOutcome, LocalPvError> {
    info!("deleting volume");

    if let Guard::Ignored(reason) = provenance::verify(cfg, record) {
        warn!(%reason, "not deleting volume");
        return Ok(DeleteOutcome::Ignored { reason });
    }

    let path = volume_path(cfg.root_path(), &record.name)?;
    if let Err(e) = store.remove_tree(&path) {
        error!(path = %path.display(), error = %e, "backing directory removal failed");
        return Err(e);
    }

    info!(path = %path.display(), "backing storage deleted");
    Ok(DeleteOutcome::Deleted)
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// Provisioner service, driven by the reconciliation engine.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Whether this provisioner takes the claim.
    async fn should_provision(&self, req: &ProvisioningRequest) -> bool;

    /// Provision a volume for the claim.
    async fn provision(
        &self,
        req: ProvisioningRequest,
    ) -> Result<(VolumeRecord, ProvisioningState), LocalPvError>;

    /// Delete a volume, or decline if it is not ours.
    async fn delete(&self, record: VolumeRecord) -> Result<DeleteOutcome, LocalPvError>;
}

/// Node-local directory provisioner.
///
/// Cheap to clone; all clones share the same configuration and store.
#[derive(Clone)]
pub struct LocalVolumeProvisioner {
    config: Arc<ProvisionerConfig>,
    store: Arc<dyn DirectoryStore>,
}

impl LocalVolumeProvisioner {
    /// Create a provisioner backed by the local filesystem.
    pub fn new(config: ProvisionerConfig) -> Self {
        Self::with_store(config, Arc::new(LocalDirStore))
    }

    /// Create a provisioner with a custom [`DirectoryStore`].
    pub fn with_store(config: ProvisionerConfig, store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T, LocalPvError>
    where
        T: Send + 'static,
        F: FnOnce(&ProvisionerConfig, &dyn DirectoryStore) -> Result<T, LocalPvError>
            + Send
            + 'static,
    {
        let config = Arc::clone(&self.config);
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&config, store.as_ref()))
            .await
            .map_err(LocalPvError::internal)?
    }
}

#[async_trait]
impl Provisioner for LocalVolumeProvisioner {
    async fn should_provision(&self, req: &ProvisioningRequest) -> bool {
        should_provision(req)
    }

    async fn provision(
        &self,
        req: ProvisioningRequest,
    ) -> Result<(VolumeRecord, ProvisioningState), LocalPvError> {
        self.run_blocking(move |cfg, store| provision(cfg, store, &req))
            .await
    }

    async fn delete(&self, record: VolumeRecord) -> Result<DeleteOutcome, LocalPvError> {
        self.run_blocking(move |cfg, store| delete(cfg, store, &record))
            .await
    }
}
