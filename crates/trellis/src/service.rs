//! Orchestration layer tying the store, catalog, analyzers, and history
//! together.
//!
//! The service owns validation order and history emission; graph math lives
//! with the analyzers and persistence in [`RelationshipStore`]. Reads never
//! touch history.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::AssetCatalog;
use crate::error::{Error, Result};
use crate::graph::{CycleChecker, DependencyTreeBuilder, ImpactAnalyzer};
use crate::history::{HistoryAction, HistoryEntry, HistorySink};
use crate::store::RelationshipStore;
use crate::types::{
    AssetId, AssetRelationship, Cycle, Direction, GraphLimits, ImpactAnalysis, NewRelationship,
    QueryDirection, RelatedAsset, RelationshipGraph, RelationshipId, RelationshipStats,
    RelationshipType,
};

/// High-level API over asset relationships.
///
/// Construct with [`new`](Self::new), then attach a history sink or custom
/// limits with the `with_` methods. The service is `Send + Sync`; clones of
/// the catalog handle are cheap and the store serializes its own access.
pub struct RelationshipService {
    store: RelationshipStore,
    catalog: Arc<dyn AssetCatalog>,
    history: HistorySink,
    limits: GraphLimits,
}

impl RelationshipService {
    /// Create a service with history disabled and default limits.
    #[must_use]
    pub fn new(store: RelationshipStore, catalog: Arc<dyn AssetCatalog>) -> Self {
        Self {
            store,
            catalog,
            history: HistorySink::disabled(),
            limits: GraphLimits::default(),
        }
    }

    /// Attach a history sink; mutations emit one entry per endpoint asset.
    #[must_use]
    pub fn with_history(mut self, history: HistorySink) -> Self {
        self.history = history;
        self
    }

    /// Override the traversal limits.
    #[must_use]
    pub fn with_limits(mut self, limits: GraphLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Create a relationship between two existing assets.
    ///
    /// Validation order: both endpoints must exist in the catalog, the
    /// endpoints must differ, and dependency-typed edges must not close a
    /// loop. The cycle check, the duplicate probe, and the insert run inside
    /// one immediate transaction on the store, so a concurrent create cannot
    /// slip a conflicting edge in between the check and the write. Any
    /// failure aborts before anything is written; nothing is retried.
    ///
    /// On success one `relationship_added` history entry is recorded for
    /// each endpoint, carrying the other endpoint as peer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`], [`Error::SelfReference`],
    /// [`Error::CircularDependency`], [`Error::AlreadyExists`], or a
    /// database error.
    pub fn create_relationship(
        &self,
        request: NewRelationship,
        actor: &str,
    ) -> Result<AssetRelationship> {
        // === Phase 1: All validations (no mutations) ===

        self.require_asset(request.parent_asset_id)?;
        self.require_asset(request.child_asset_id)?;

        if request.parent_asset_id == request.child_asset_id {
            return Err(Error::SelfReference(request.parent_asset_id));
        }

        // === Phase 2: Guarded insert ===

        let edge = self.store.insert_guarded(&request)?;

        // === Phase 3: Notify ===

        self.record_history(&edge, HistoryAction::RelationshipAdded, actor);

        info!(
            edge = edge.id.as_i64(),
            parent = %edge.parent_asset_id,
            child = %edge.child_asset_id,
            relationship_type = edge.relationship_type.as_str(),
            actor,
            "Created relationship"
        );
        Ok(edge)
    }

    /// Delete a relationship by id and return the removed edge.
    ///
    /// Emits one `relationship_removed` history entry per endpoint. When the
    /// edge does not exist nothing is deleted and no history is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RelationshipNotFound`] or a database error.
    pub fn delete_relationship(
        &self,
        id: RelationshipId,
        actor: &str,
    ) -> Result<AssetRelationship> {
        let edge = self.store.delete(id)?;

        self.record_history(&edge, HistoryAction::RelationshipRemoved, actor);

        info!(
            edge = id.as_i64(),
            parent = %edge.parent_asset_id,
            child = %edge.child_asset_id,
            actor,
            "Deleted relationship"
        );
        Ok(edge)
    }

    /// The full relationship picture for one asset.
    ///
    /// `max_depth` falls back to the configured default and is clamped to
    /// the configured maximum; zero skips the dependency trees entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] for an unknown asset, or a database
    /// error.
    pub fn relationship_graph(
        &self,
        asset: AssetId,
        max_depth: Option<u32>,
    ) -> Result<RelationshipGraph> {
        let depth = self.limits.resolve_tree_depth(max_depth);
        DependencyTreeBuilder::new(&self.store, self.catalog.as_ref()).build_graph(asset, depth)
    }

    /// Impact analysis for one existing asset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] for an unknown asset, or a database
    /// error.
    pub fn impact_analysis(&self, asset: AssetId) -> Result<ImpactAnalysis> {
        self.require_asset(asset)?;
        ImpactAnalyzer::new(&self.store, self.catalog.as_ref(), self.limits).analyze(asset)
    }

    /// Assets linked to `asset`, optionally narrowed by relationship type.
    ///
    /// `QueryDirection::Parent` lists edges arriving at the asset,
    /// `QueryDirection::Child` edges leaving it, and `QueryDirection::Both`
    /// the union of the two. Peer snapshots are attached best effort.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] for an unknown asset, or a database
    /// error.
    pub fn assets_by_relationship(
        &self,
        asset: AssetId,
        relationship_type: Option<RelationshipType>,
        direction: QueryDirection,
    ) -> Result<Vec<RelatedAsset>> {
        self.require_asset(asset)?;

        let mut edges = Vec::new();
        if matches!(direction, QueryDirection::Parent | QueryDirection::Both) {
            edges.extend(
                self.store
                    .neighbors(asset, Direction::Parent, relationship_type)?,
            );
        }
        if matches!(direction, QueryDirection::Child | QueryDirection::Both) {
            edges.extend(
                self.store
                    .neighbors(asset, Direction::Child, relationship_type)?,
            );
        }

        Ok(edges
            .into_iter()
            .map(|relationship| {
                let peer_asset_id = relationship.peer_of(asset);
                RelatedAsset {
                    asset: self.peer_details(peer_asset_id),
                    peer_asset_id,
                    relationship,
                }
            })
            .collect())
    }

    /// Every dependency loop currently stored.
    ///
    /// Loops cannot be created through [`create_relationship`], so a
    /// non-empty result points at imported or legacy data.
    ///
    /// # Errors
    ///
    /// Returns a database error if the scan fails.
    ///
    /// [`create_relationship`]: Self::create_relationship
    pub fn find_circular_dependencies(&self) -> Result<Vec<Cycle>> {
        CycleChecker::new(&self.store).find_cycles()
    }

    /// Relationship counts by type.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn relationship_stats(&self) -> Result<RelationshipStats> {
        self.store.stats()
    }

    fn require_asset(&self, asset: AssetId) -> Result<()> {
        if self.catalog.exists(asset)? {
            Ok(())
        } else {
            Err(Error::AssetNotFound(asset))
        }
    }

    fn peer_details(&self, asset: AssetId) -> Option<crate::types::Asset> {
        match self.catalog.get(asset) {
            Ok(found) => found,
            Err(e) => {
                warn!(asset = %asset, error = %e, "Could not fetch peer details");
                None
            }
        }
    }

    fn record_history(&self, edge: &AssetRelationship, action: HistoryAction, actor: &str) {
        self.history.record(HistoryEntry::new(
            edge.parent_asset_id,
            action,
            actor,
            edge.relationship_type,
            edge.child_asset_id,
        ));
        self.history.record(HistoryEntry::new(
            edge.child_asset_id,
            action,
            actor,
            edge.relationship_type,
            edge.parent_asset_id,
        ));
    }
}
