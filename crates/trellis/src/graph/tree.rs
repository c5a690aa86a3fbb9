//! Bounded dependency trees and the per-asset relationship graph.

use tracing::warn;

use crate::catalog::AssetCatalog;
use crate::error::{Error, Result};
use crate::store::RelationshipStore;
use crate::types::{
    Asset, AssetId, DependencyNode, Direction, RelatedAsset, RelationshipGraph, RelationshipType,
    TreeDirection,
};

/// Builds depth-limited dependency trees and full relationship graphs.
///
/// Trees follow dependency edges only. Asset details on each node are best
/// effort: a catalog miss or failure leaves the node's `asset` empty and is
/// logged, never aborts the build.
pub struct DependencyTreeBuilder<'a> {
    store: &'a RelationshipStore,
    catalog: &'a dyn AssetCatalog,
}

impl<'a> DependencyTreeBuilder<'a> {
    /// Create a builder over the given store and catalog.
    #[must_use]
    pub fn new(store: &'a RelationshipStore, catalog: &'a dyn AssetCatalog) -> Self {
        Self { store, catalog }
    }

    /// Expand the dependency tree rooted at `asset` in one direction.
    ///
    /// Upstream steps move through edges where `asset` sits in the child
    /// column (toward parents); downstream steps move through edges where
    /// it sits in the parent column (toward children). Expansion stops at
    /// `max_depth` levels below the root; there is no other termination
    /// guarantee, so callers resolve the depth through
    /// [`GraphLimits`](crate::types::GraphLimits) first. A node reachable
    /// along several paths appears under each of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub fn build_tree(
        &self,
        asset: AssetId,
        direction: TreeDirection,
        max_depth: u32,
    ) -> Result<DependencyNode> {
        self.subtree(asset, direction, max_depth, 0)
    }

    fn subtree(
        &self,
        asset: AssetId,
        direction: TreeDirection,
        max_depth: u32,
        depth: u32,
    ) -> Result<DependencyNode> {
        let mut node = DependencyNode {
            asset_id: asset,
            depth,
            asset: self.asset_details(asset),
            dependencies: Vec::new(),
        };

        if depth >= max_depth {
            return Ok(node);
        }

        for peer in self.dependency_peers(asset, direction)? {
            node.dependencies
                .push(self.subtree(peer, direction, max_depth, depth + 1)?);
        }

        Ok(node)
    }

    /// Assemble the complete relationship picture for one asset.
    ///
    /// Neighbor lists cover every edge type: `parents` holds edges arriving
    /// at the asset, `children` edges leaving it, `components` the
    /// component-typed subset of `children`, and `related` the related-typed
    /// edges in both directions. The `upstream` and `downstream` dependency
    /// trees are built only when `max_depth > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] when the catalog has no such asset,
    /// or an error if the underlying queries fail.
    pub fn build_graph(&self, asset: AssetId, max_depth: u32) -> Result<RelationshipGraph> {
        let root = self
            .catalog
            .get(asset)?
            .ok_or(Error::AssetNotFound(asset))?;

        let parents = self.related_assets(asset, Direction::Parent, None)?;
        let children = self.related_assets(asset, Direction::Child, None)?;
        let components =
            self.related_assets(asset, Direction::Child, Some(RelationshipType::Component))?;

        let mut related =
            self.related_assets(asset, Direction::Parent, Some(RelationshipType::Related))?;
        related.extend(self.related_assets(
            asset,
            Direction::Child,
            Some(RelationshipType::Related),
        )?);

        let (upstream, downstream) = if max_depth > 0 {
            (
                Some(self.build_tree(asset, TreeDirection::Upstream, max_depth)?),
                Some(self.build_tree(asset, TreeDirection::Downstream, max_depth)?),
            )
        } else {
            (None, None)
        };

        Ok(RelationshipGraph {
            asset: root,
            parents,
            children,
            components,
            related,
            upstream,
            downstream,
        })
    }

    /// Peer ids along dependency edges in the given tree direction.
    fn dependency_peers(&self, asset: AssetId, direction: TreeDirection) -> Result<Vec<AssetId>> {
        let store_direction = match direction {
            TreeDirection::Upstream => Direction::Parent,
            TreeDirection::Downstream => Direction::Child,
        };

        let edges =
            self.store
                .neighbors(asset, store_direction, Some(RelationshipType::Dependency))?;
        Ok(edges.into_iter().map(|edge| edge.peer_of(asset)).collect())
    }

    /// Edges adjacent to `asset` with peer details attached, best effort.
    fn related_assets(
        &self,
        asset: AssetId,
        direction: Direction,
        filter: Option<RelationshipType>,
    ) -> Result<Vec<RelatedAsset>> {
        let edges = self.store.neighbors(asset, direction, filter)?;

        Ok(edges
            .into_iter()
            .map(|relationship| {
                let peer_asset_id = relationship.peer_of(asset);
                RelatedAsset {
                    asset: self.asset_details(peer_asset_id),
                    peer_asset_id,
                    relationship,
                }
            })
            .collect())
    }

    fn asset_details(&self, asset: AssetId) -> Option<Asset> {
        match self.catalog.get(asset) {
            Ok(found) => found,
            Err(e) => {
                warn!(asset = %asset, error = %e, "Could not fetch asset details, leaving node bare");
                None
            }
        }
    }
}
