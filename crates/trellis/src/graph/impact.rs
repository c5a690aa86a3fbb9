//! Impact analysis: what breaks when an asset goes away.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::catalog::AssetCatalog;
use crate::error::Result;
use crate::store::RelationshipStore;
use crate::types::{Asset, AssetId, GraphLimits, ImpactAnalysis, RiskLevel};

/// Scores the blast radius of losing one asset.
///
/// Every figure is computed fresh from the store per call. The two
/// dependency directions are intentionally different: direct dependents are
/// counted on edges arriving at the asset (child column), while the
/// downstream walk leaves it through the parent column.
pub struct ImpactAnalyzer<'a> {
    store: &'a RelationshipStore,
    catalog: &'a dyn AssetCatalog,
    limits: GraphLimits,
}

impl<'a> ImpactAnalyzer<'a> {
    /// Create an analyzer over the given store and catalog.
    #[must_use]
    pub fn new(
        store: &'a RelationshipStore,
        catalog: &'a dyn AssetCatalog,
        limits: GraphLimits,
    ) -> Self {
        Self {
            store,
            catalog,
            limits,
        }
    }

    /// Number of assets that depend directly on `asset`.
    ///
    /// Counts dependency edges with `asset` in the child column; each such
    /// edge's parent is a dependent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn direct_dependents(&self, asset: AssetId) -> Result<usize> {
        self.store.dependent_count(asset)
    }

    /// Number of distinct assets reachable from `asset` along dependency
    /// edges, the asset itself excluded.
    ///
    /// One visited set is shared across the whole walk, so an asset sitting
    /// below several branches is counted once and a stray loop cannot spin
    /// the walk forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub fn downstream_count(&self, asset: AssetId) -> Result<usize> {
        let mut visited: HashSet<AssetId> = HashSet::from([asset]);
        let mut pending = vec![asset];

        while let Some(current) = pending.pop() {
            for child in self.store.dependency_children(current)? {
                if visited.insert(child) {
                    pending.push(child);
                }
            }
        }

        Ok(visited.len() - 1)
    }

    /// Active assets on the dependency paths below `root` that would hurt
    /// the most, sorted by id.
    ///
    /// Fetches the dependency edges once and walks forward from `root`
    /// depth-first, bounded by the configured path depth. A node already
    /// reached at some depth is expanded again only when reached at a
    /// smaller one, so a deep first visit cannot hide nodes that are still
    /// within the bound along a shorter path; the strictly decreasing
    /// re-entry depth also terminates the walk on looped data. A discovered
    /// asset qualifies when more than one asset depends on it or its
    /// metadata flags it as critical. The root itself is never included,
    /// and assets the catalog cannot produce are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries or catalog lookups fail.
    pub fn critical_path_assets(&self, root: AssetId) -> Result<Vec<Asset>> {
        let edges = self.store.all_dependency_edges()?;

        let mut adjacency: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
        let mut dependent_counts: HashMap<AssetId, usize> = HashMap::new();
        for &(parent, child) in &edges {
            adjacency.entry(parent).or_default().push(child);
            *dependent_counts.entry(child).or_default() += 1;
        }

        let cap = self.limits.critical_path_max_depth;

        let mut best_depth: HashMap<AssetId, u32> = HashMap::from([(root, 0)]);
        let mut frames: Vec<(AssetId, u32)> = vec![(root, 0)];
        while let Some((node, depth)) = frames.pop() {
            if depth >= cap {
                continue;
            }
            let Some(children) = adjacency.get(&node) else {
                continue;
            };
            for &child in children {
                let next = depth + 1;
                if best_depth.get(&child).is_none_or(|&seen| next < seen) {
                    best_depth.insert(child, next);
                    frames.push((child, next));
                }
            }
        }

        let mut critical = Vec::new();
        for &node in best_depth.keys() {
            if node == root {
                continue;
            }
            let Some(asset) = self.catalog.get(node)? else {
                continue;
            };
            let dependents = dependent_counts.get(&node).copied().unwrap_or(0);
            if (dependents > 1 || asset.is_flagged_critical()) && asset.is_active() {
                critical.push(asset);
            }
        }
        critical.sort_by_key(|asset| asset.id);

        Ok(critical)
    }

    /// Whether any asset at all depends on `asset`.
    ///
    /// Deliberately coarse: one direct dependent is enough. This is not an
    /// articulation-point computation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn is_single_point_of_failure(&self, asset: AssetId) -> Result<bool> {
        Ok(self.store.dependent_count(asset)? >= 1)
    }

    /// Compose the full impact picture for `asset`.
    ///
    /// The caller is expected to have verified the asset exists; analysis of
    /// an unknown id simply reports zeroes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries or catalog lookups fail.
    pub fn analyze(&self, asset: AssetId) -> Result<ImpactAnalysis> {
        let direct_dependents = self.direct_dependents(asset)?;
        let total_downstream_assets = self.downstream_count(asset)?;
        let critical_assets = self.critical_path_assets(asset)?;
        let is_single_point_of_failure = direct_dependents >= 1;
        let risk = risk_level(
            direct_dependents,
            total_downstream_assets,
            is_single_point_of_failure,
        );

        debug!(
            asset = %asset,
            direct = direct_dependents,
            downstream = total_downstream_assets,
            critical = critical_assets.len(),
            risk = ?risk,
            "Computed impact analysis"
        );

        Ok(ImpactAnalysis {
            asset_id: asset,
            direct_dependents,
            total_downstream_assets,
            critical_assets,
            is_single_point_of_failure,
            risk_level: risk,
        })
    }
}

/// Map impact figures onto a risk level.
///
/// Thresholds, checked in order: `critical` when the asset is a single
/// point of failure with more than ten downstream assets, `high` when more
/// than five assets sit downstream, `medium` when anything depends on it
/// directly, `low` otherwise.
#[must_use]
pub fn risk_level(
    direct_dependents: usize,
    total_downstream: usize,
    is_single_point_of_failure: bool,
) -> RiskLevel {
    if is_single_point_of_failure && total_downstream > 10 {
        RiskLevel::Critical
    } else if total_downstream > 5 {
        RiskLevel::High
    } else if direct_dependents > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
