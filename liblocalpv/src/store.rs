//! Directory store: the only component that touches the filesystem.
//!
//! # On-disk layout
//!
//! ```text
//! <root_path>/
//!   <volume-name>/     # one backing directory per volume, mode 0755
//! ```

use std::fs::{self, DirBuilder, Permissions};
use std::io::ErrorKind;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FsOp, LocalPvError};

/// Permission bits of every backing directory (`rwxr-xr-x`).
pub const VOLUME_DIR_MODE: u32 = 0o755;

/// Longest accepted volume name, in bytes.
const MAX_NAME_LEN: usize = 253;

/// Creates and removes backing directories.
///
/// Implementations are blocking; callers on an async runtime should move
/// calls onto a blocking thread.
pub trait DirectoryStore: Send + Sync {
    /// Create `path` and any missing parents with exactly `mode`.
    ///
    /// An already existing directory is not an error.
    fn ensure_dir(&self, path: &Path, mode: u32) -> Result<(), LocalPvError>;

    /// Remove `path` and everything below it.
    ///
    /// A path that does not exist counts as already removed.
    fn remove_tree(&self, path: &Path) -> Result<(), LocalPvError>;
}

/// [`DirectoryStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDirStore;

impl DirectoryStore for LocalDirStore {
    fn ensure_dir(&self, path: &Path, mode: u32) -> Result<(), LocalPvError> {
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .map_err(|e| LocalPvError::terminal(FsOp::Create, path, e))?;

        // A pre-existing symlink to a directory satisfies `create`; refuse to
        // follow it out of the root.
        let meta = fs::symlink_metadata(path)
            .map_err(|e| LocalPvError::terminal(FsOp::Create, path, e))?;
        if !meta.file_type().is_dir() {
            return Err(LocalPvError::terminal(
                FsOp::Create,
                path,
                "path exists and is not a plain directory",
            ));
        }

        // The umask may have stripped bits from the mode above.
        fs::set_permissions(path, Permissions::from_mode(mode))
            .map_err(|e| LocalPvError::terminal(FsOp::Chmod, path, e))?;
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<(), LocalPvError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "backing directory already gone");
                return Ok(());
            }
            Err(e) => return Err(LocalPvError::terminal(FsOp::Remove, path, e)),
        };

        let res = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        res.map_err(|e| LocalPvError::terminal(FsOp::Remove, path, e))
    }
}

/// Check that `name` is usable as a single directory name under the root.
pub fn validate_volume_name(name: &str) -> Result<(), LocalPvError> {
    let reason = if name.is_empty() {
        "volume name is empty"
    } else if name == "." || name == ".." {
        "volume name must not be a relative path component"
    } else if name.contains('/') || name.contains('\0') {
        "volume name must be a single path segment"
    } else if name.len() > MAX_NAME_LEN {
        "volume name is too long"
    } else {
        return Ok(());
    };
    Err(LocalPvError::InvalidArgument(format!("{reason}: {name:?}")))
}

/// Resolve the backing directory of volume `name` under `root`.
pub fn volume_path(root: &Path, name: &str) -> Result<PathBuf, LocalPvError> {
    validate_volume_name(name)?;
    Ok(root.join(name))
}
