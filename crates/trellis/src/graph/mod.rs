//! Graph analysis over stored relationships.
//!
//! Three analyzers share the same shape: each borrows a
//! [`RelationshipStore`](crate::store::RelationshipStore) and computes one
//! view of the dependency graph per call, with no cached state between calls.
//!
//! - [`CycleChecker`] answers "would this edge close a loop?" and scans for
//!   loops already present.
//! - [`DependencyTreeBuilder`] expands bounded upstream and downstream trees
//!   and assembles the full relationship graph for one asset.
//! - [`ImpactAnalyzer`] scores what breaks when an asset goes away.

pub(crate) mod cycle;
mod impact;
mod tree;

pub use cycle::CycleChecker;
pub use impact::{risk_level, ImpactAnalyzer};
pub use tree::DependencyTreeBuilder;
