//! Domain types for the asset relationship graph.
//!
//! These types fall into three groups:
//! - **Entities**: [`AssetRelationship`] (stored), [`Asset`] (snapshot owned
//!   by the external catalog, never persisted here)
//! - **Requests**: [`NewRelationship`], [`QueryDirection`]
//! - **Results**: [`RelationshipGraph`], [`DependencyNode`],
//!   [`ImpactAnalysis`], [`Cycle`], [`RelationshipStats`]
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Ids | i64 newtypes | Prevents parent/child parameter swaps |
//! | RelationshipType | Enum not String | Unknown tokens rejected at the boundary |
//! | Asset details | `Option<Asset>` | Enrichment is best-effort; absence is not an error |
//! | Impact result | Computed per call | Never cached; graph truth lives in the store |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

/// A strongly-typed asset ID to prevent mixing with relationship IDs.
///
/// This newtype keeps function signatures that accept both endpoint ids
/// honest about which id is which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub i64);

impl AssetId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for AssetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strongly-typed relationship (edge) ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub i64);

impl RelationshipId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for RelationshipId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// The kind of link between two assets.
///
/// Only [`RelationshipType::Dependency`] edges are subject to acyclicity;
/// every other type may legally form cycles (mutual `related` links are
/// routine). Directionality is meaningful for `component` and `dependency`
/// (parent owns / depends on child); `related` is symmetric at the query
/// layer even though storage is directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Parent contains child as a physical or logical component.
    Component,
    /// Parent depends on child; the acyclic type.
    Dependency,
    /// Generic association with no operational meaning.
    Related,
    /// Child is an upgrade applied to parent.
    Upgrade,
}

impl RelationshipType {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Dependency => "dependency",
            Self::Related => "related",
            Self::Upgrade => "upgrade",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "component" => Ok(Self::Component),
            "dependency" => Ok(Self::Dependency),
            "related" => Ok(Self::Related),
            "upgrade" => Ok(Self::Upgrade),
            other => Err(Error::InvalidRelationshipType(other.to_string())),
        }
    }
}

/// Storage-level neighbor direction.
///
/// `Parent` selects edges where the queried asset sits in the child column,
/// so the peers are its parents; `Child` selects edges where it sits in the
/// parent column, so the peers are its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges where the queried asset is the child.
    Parent,
    /// Edges where the queried asset is the parent.
    Child,
}

impl Direction {
    /// Convert to the caller-facing token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

/// Caller-facing direction token for neighbor queries.
///
/// Extends [`Direction`] with `Both`, the union of the two directed
/// queries. Anything else fails with [`Error::InvalidDirection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryDirection {
    /// Edges where the queried asset is the child.
    Parent,
    /// Edges where the queried asset is the parent.
    Child,
    /// Union of both directed queries.
    Both,
}

impl QueryDirection {
    /// Convert to the caller-facing token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Both => "both",
        }
    }
}

impl std::str::FromStr for QueryDirection {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            "both" => Ok(Self::Both),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Traversal direction for dependency trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeDirection {
    /// Walk toward parents: expand edges where the current asset is the child.
    Upstream,
    /// Walk toward children: forward parent-to-child steps.
    Downstream,
}

impl TreeDirection {
    /// Convert to the caller-facing token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
        }
    }
}

/// Lifecycle status of an asset, owned by the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// In service.
    Active,
    /// Temporarily out of service.
    Maintenance,
    /// Withdrawn but still tracked.
    Retired,
    /// Gone; kept for record only.
    Disposed,
}

impl AssetStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Retired => "retired",
            Self::Disposed => "disposed",
        }
    }
}

/// Severity classification produced by impact analysis.
///
/// Ordering is meaningful: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Nothing depends on the asset.
    Low,
    /// At least one direct dependent.
    Medium,
    /// More than five downstream assets.
    High,
    /// Single point of failure with more than ten downstream assets.
    Critical,
}

impl RiskLevel {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Collaborator snapshot
// ============================================================================

/// A point-in-time snapshot of an asset, supplied by the external catalog.
///
/// The relationship subsystem never persists assets; it only attaches these
/// snapshots to query results for display and reads the `critical` metadata
/// flag during critical-path discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Catalog identifier.
    pub id: AssetId,
    /// Human-facing asset tag (e.g. `"SRV-0042"`).
    pub tag: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Free-form catalog metadata.
    pub metadata: Option<serde_json::Value>,
}

impl Asset {
    /// Returns `true` if the asset is in service.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AssetStatus::Active
    }

    /// Returns `true` if the catalog metadata flags this asset critical
    /// (`"critical": true` in the metadata object).
    #[must_use]
    pub fn is_flagged_critical(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("critical"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

// ============================================================================
// Edge entities
// ============================================================================

/// A stored relationship edge between two assets.
///
/// Invariants (enforced by the store): the
/// `(parent_asset_id, child_asset_id, relationship_type)` triple is unique,
/// and `parent_asset_id != child_asset_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRelationship {
    /// Edge identifier.
    pub id: RelationshipId,
    /// Parent endpoint.
    pub parent_asset_id: AssetId,
    /// Child endpoint.
    pub child_asset_id: AssetId,
    /// Kind of link.
    pub relationship_type: RelationshipType,
    /// Optional free-form note.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl AssetRelationship {
    /// The endpoint opposite to `asset`.
    ///
    /// Callers are expected to pass one of the edge's endpoints; passing an
    /// unrelated id returns the parent endpoint.
    #[must_use]
    pub fn peer_of(&self, asset: AssetId) -> AssetId {
        if self.parent_asset_id == asset {
            self.child_asset_id
        } else {
            self.parent_asset_id
        }
    }
}

/// Request payload for creating a relationship edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    /// Parent endpoint.
    pub parent_asset_id: AssetId,
    /// Child endpoint.
    pub child_asset_id: AssetId,
    /// Kind of link.
    pub relationship_type: RelationshipType,
    /// Optional free-form note.
    pub notes: Option<String>,
}

// ============================================================================
// Query results
// ============================================================================

/// A neighbor-list element: the edge plus the peer asset's snapshot when the
/// catalog could supply one. Enrichment is best-effort; `asset: None` means
/// the peer could not be fetched, not that the edge is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedAsset {
    /// The stored edge.
    pub relationship: AssetRelationship,
    /// Peer endpoint id, from the perspective of the queried asset.
    pub peer_asset_id: AssetId,
    /// Peer snapshot, when available.
    pub asset: Option<Asset>,
}

/// A node in a bounded-depth dependency tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Asset at this node.
    pub asset_id: AssetId,
    /// Depth below the tree root (root is 0).
    pub depth: u32,
    /// Asset snapshot, when the catalog could supply one.
    pub asset: Option<Asset>,
    /// Child nodes; empty at the depth bound.
    pub dependencies: Vec<DependencyNode>,
}

/// The full relationship neighborhood of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    /// The queried asset.
    pub asset: Asset,
    /// Edges where the asset is the child; peers are its parents.
    pub parents: Vec<RelatedAsset>,
    /// Edges where the asset is the parent; peers are its children.
    pub children: Vec<RelatedAsset>,
    /// Component-typed children.
    pub components: Vec<RelatedAsset>,
    /// Related-typed neighbors in both directions.
    pub related: Vec<RelatedAsset>,
    /// Upstream dependency tree; `None` when the requested depth is 0.
    pub upstream: Option<DependencyNode>,
    /// Downstream dependency tree; `None` when the requested depth is 0.
    pub downstream: Option<DependencyNode>,
}

/// Result of impact analysis for one asset. Computed fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// The analyzed asset.
    pub asset_id: AssetId,
    /// Number of dependency edges arriving at this asset (its dependents).
    pub direct_dependents: usize,
    /// Distinct assets reachable through forward parent-to-child steps.
    pub total_downstream_assets: usize,
    /// Active critical assets along the dependency chain, sorted by id.
    pub critical_assets: Vec<Asset>,
    /// True when at least one asset depends on this one.
    pub is_single_point_of_failure: bool,
    /// Deterministic severity classification.
    pub risk_level: RiskLevel,
}

/// A dependency cycle, ordered from the scan's entry point into the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Assets forming the cycle, in traversal order.
    pub assets: Vec<AssetId>,
}

/// Edge counts for operator diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipStats {
    /// Total stored edges.
    pub total: usize,
    /// Component-typed edges.
    pub component: usize,
    /// Dependency-typed edges.
    pub dependency: usize,
    /// Related-typed edges.
    pub related: usize,
    /// Upgrade-typed edges.
    pub upgrade: usize,
}

// ============================================================================
// Configuration
// ============================================================================

/// Traversal depth limits consumed by the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLimits {
    /// Tree depth used when the caller does not supply one.
    pub default_tree_depth: u32,
    /// Hard cap applied to caller-supplied tree depths.
    pub max_tree_depth: u32,
    /// Hard cap for the critical-path walk.
    pub critical_path_max_depth: u32,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            default_tree_depth: 3,
            max_tree_depth: 10,
            critical_path_max_depth: 10,
        }
    }
}

impl GraphLimits {
    /// Resolve a caller-supplied tree depth: default when absent, clamped to
    /// the hard cap otherwise.
    #[must_use]
    pub fn resolve_tree_depth(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_tree_depth)
            .min(self.max_tree_depth)
    }
}
