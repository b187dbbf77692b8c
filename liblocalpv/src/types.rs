//! Core data model: claims, volume records, access modes and node affinity.
//!
//! These types are shared by the lifecycle entry points, the wire protocol and
//! the transport layer.  They are all [`Serialize`]/[`Deserialize`] so they can
//! be transmitted over QUIC as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::LocalPvError;

// ---------------------------------------------------------------------------
// Access mode & reclaim policy
// ---------------------------------------------------------------------------

/// Describes how a volume may be accessed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Single-node read-write.
    ReadWriteOnce,
    /// Multi-node read-only.
    ReadOnlyMany,
    /// Multi-node read-write.
    ReadWriteMany,
    /// Single-pod read-write.
    ReadWriteOncePod,
}

/// What happens to the backing storage once the bound claim is released.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReclaimPolicy {
    Delete,
    Retain,
    Recycle,
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// A resource quantity such as `1Gi`, `500Mi` or `10G`.
///
/// The original string is kept verbatim for display and serialisation; the
/// parsed byte count is metadata only and is never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capacity {
    raw: String,
    bytes: u64,
}

impl Capacity {
    /// Parse a quantity string.
    pub fn parse(raw: &str) -> Result<Self, LocalPvError> {
        let raw = raw.trim();
        let bytes = parse_quantity(raw)?;
        Ok(Self {
            raw: raw.to_owned(),
            bytes,
        })
    }

    /// Build a capacity from a plain byte count.
    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            raw: bytes.to_string(),
            bytes,
        }
    }

    /// Number of bytes this quantity denotes, rounded up.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for Capacity {
    type Error = LocalPvError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Capacity> for String {
    fn from(c: Capacity) -> Self {
        c.raw
    }
}

fn parse_quantity(s: &str) -> Result<u64, LocalPvError> {
    let invalid = || LocalPvError::InvalidArgument(format!("invalid capacity quantity {s:?}"));

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    // Scale as numerator / denominator so `m` and negative exponents fit.
    let (num, den): (u128, u128) = match suffix {
        "" => (1, 1),
        "m" => (1, 1_000),
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        other => decimal_exponent(other).ok_or_else(invalid)?,
    };

    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    // A second '.' lands in `frac` and fails the digit check.
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > 18 {
        return Err(invalid());
    }

    let scale = 10u128.pow(frac.len() as u32);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| invalid())?
    };

    let bytes = whole
        .checked_mul(scale)
        .and_then(|m| m.checked_add(frac))
        .and_then(|m| m.checked_mul(num))
        .ok_or_else(invalid)?
        .div_ceil(scale * den);

    u64::try_from(bytes).map_err(|_| invalid())
}

/// `e3`, `E-2` and friends: a signed power of ten.
fn decimal_exponent(suffix: &str) -> Option<(u128, u128)> {
    let exp: i32 = suffix.strip_prefix(['e', 'E'])?.parse().ok()?;
    if exp.unsigned_abs() > 18 {
        return None;
    }
    let pow = 10u128.pow(exp.unsigned_abs());
    Some(if exp >= 0 { (pow, 1) } else { (1, pow) })
}

// ---------------------------------------------------------------------------
// Node affinity
// ---------------------------------------------------------------------------

/// Label key carrying the node's hostname.
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Set-based operator of a node selector requirement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeSelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// A single label constraint a node must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSelectorRequirement {
    pub key: String,
    pub operator: NodeSelectorOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Constraints restricting which nodes can use a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeAffinity {
    /// All requirements must hold.
    pub required: Vec<NodeSelectorRequirement>,
}

impl NodeAffinity {
    /// Pin a volume to exactly one node by hostname.
    pub fn single_node(node: &str) -> Self {
        Self {
            required: vec![NodeSelectorRequirement {
                key: HOSTNAME_LABEL.to_owned(),
                operator: NodeSelectorOperator::In,
                values: vec![node.to_owned()],
            }],
        }
    }

    /// The node this affinity pins to, if it is a single-hostname pin.
    pub fn pinned_node(&self) -> Option<&str> {
        match self.required.as_slice() {
            [req] if req.key == HOSTNAME_LABEL
                && req.operator == NodeSelectorOperator::In
                && req.values.len() == 1 =>
            {
                Some(req.values[0].as_str())
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests & records
// ---------------------------------------------------------------------------

/// A pending claim handed to the provisioner by the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    /// Name chosen for the volume; becomes the backing directory name.
    pub volume_name: String,
    /// Requested capacity.
    pub capacity: Capacity,
    /// Requested access modes.
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// Reclaim policy from the storage class.
    #[serde(default)]
    pub reclaim_policy: Option<ReclaimPolicy>,
    /// `namespace/name` of the originating claim, for logging only.
    #[serde(default)]
    pub claim: Option<String>,
}

/// The volume description produced by a successful provisioning call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeRecord {
    /// Unique volume name.
    pub name: String,
    /// Provenance and other annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Backing directory on the owning node.
    pub path: PathBuf,
    pub capacity: Capacity,
    pub access_modes: Vec<AccessMode>,
    pub reclaim_policy: ReclaimPolicy,
    pub node_affinity: NodeAffinity,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// State reported alongside a provisioned record.
///
/// Provisioning is synchronous, so `Finished` is the only state ever
/// returned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisioningState {
    Finished,
}

/// Why a deletion request was declined without touching storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The volume was provisioned by someone else.
    ForeignProvisioner { found: Option<String> },
    /// The volume lives on another node.
    ForeignNode { found: Option<String>, local: String },
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignProvisioner { found: Some(p) } => {
                write!(f, "volume was provisioned by {p}, not by this provisioner")
            }
            Self::ForeignProvisioner { found: None } => {
                f.write_str("volume carries no provisioner annotation")
            }
            Self::ForeignNode {
                found: Some(n),
                local,
            } => write!(f, "volume was provisioned on node {n}, not on {local}"),
            Self::ForeignNode { found: None, local } => {
                write!(f, "volume carries no node annotation (local node {local})")
            }
        }
    }
}

/// Result of a deletion request that did not fail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The backing directory is gone.
    Deleted,
    /// Not ours to delete; nothing was touched.
    Ignored { reason: IgnoreReason },
}

impl DeleteOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

// ---------------------------------------------------------------------------
// Plugin info
// ---------------------------------------------------------------------------

/// Information about the provisioner plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Provisioner identity, e.g. `"rk8s.io/local-volume"`.
    pub name: String,
    /// Vendor-provided version string.
    pub vendor_version: String,
    /// Node this instance serves.
    pub node_name: String,
}
