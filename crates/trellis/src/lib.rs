//! # Trellis: Asset Relationship Graph
//!
//! Trellis tracks typed relationships between inventory assets in `SQLite`
//! and answers graph questions about them: which assets depend on which,
//! what breaks when one goes away, and whether a new link would close a
//! dependency loop.
//!
//! ## Design Philosophy
//!
//! - **Edges, not assets** - Trellis stores relationships; asset details come from a pluggable catalog
//! - **Guarded writes** - The cycle check and the insert share one transaction, so races cannot sneak a loop in
//! - **Bounded traversals** - Every walk carries a depth bound or a visited set
//! - **Embeddable** - Library first; bring your own catalog and history consumer
//! - **Figures, not judgments** - Reports facts ("3 dependents, 12 downstream"), callers decide policy
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use trellis::{
//!     Asset, AssetId, AssetStatus, NewRelationship, RelationshipService, RelationshipStore,
//!     RelationshipType, StaticCatalog,
//! };
//!
//! let store = RelationshipStore::open(Path::new("/var/lib/trellis/graph.db"))?;
//! let catalog = StaticCatalog::with_assets([
//!     Asset {
//!         id: AssetId::from(1),
//!         tag: "AST-0001".into(),
//!         name: "core router".into(),
//!         status: AssetStatus::Active,
//!         metadata: None,
//!     },
//!     Asset {
//!         id: AssetId::from(2),
//!         tag: "AST-0002".into(),
//!         name: "edge switch".into(),
//!         status: AssetStatus::Active,
//!         metadata: None,
//!     },
//! ]);
//! let service = RelationshipService::new(store, Arc::new(catalog));
//!
//! // The switch depends on the router.
//! service.create_relationship(
//!     NewRelationship {
//!         parent_asset_id: AssetId::from(2),
//!         child_asset_id: AssetId::from(1),
//!         relationship_type: RelationshipType::Dependency,
//!         notes: None,
//!     },
//!     "ops@example.com",
//! )?;
//!
//! // What happens if the router dies?
//! let impact = service.impact_analysis(AssetId::from(1))?;
//! println!(
//!     "{} direct dependents, risk {}",
//!     impact.direct_dependents, impact.risk_level
//! );
//! # Ok::<(), trellis::Error>(())
//! ```

mod catalog;
mod error;
mod graph;
mod history;
mod service;
mod store;
mod types;

pub use catalog::{AssetCatalog, StaticCatalog};
pub use error::{Error, Result};
pub use graph::{risk_level, CycleChecker, DependencyTreeBuilder, ImpactAnalyzer};
pub use history::{HistoryAction, HistoryEntry, HistorySink};
pub use service::RelationshipService;
pub use store::RelationshipStore;
pub use types::{
    Asset, AssetId, AssetRelationship, AssetStatus, Cycle, DependencyNode, Direction, GraphLimits,
    ImpactAnalysis, NewRelationship, QueryDirection, RelatedAsset, RelationshipGraph,
    RelationshipId, RelationshipStats, RelationshipType, RiskLevel, TreeDirection,
};
