//! The narrow interface to the external asset store.
//!
//! Asset CRUD lives outside this crate. The relationship subsystem asks the
//! catalog exactly two questions: "does asset X exist" (endpoint validation
//! before a mutation) and "fetch asset X" (display enrichment and the
//! critical-metadata flag). Everything else about assets is out of scope.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Asset, AssetId};

/// Read-only access to the asset store owned by the enclosing system.
///
/// # Errors
///
/// Implementations map their own failures (connection loss, timeouts) into
/// [`crate::Error::Catalog`]. A missing asset is not an error: `exists`
/// answers `false` and `get` answers `None`; callers decide whether absence
/// is fatal for their operation.
pub trait AssetCatalog: Send + Sync {
    /// Whether the asset exists in the catalog.
    fn exists(&self, id: AssetId) -> Result<bool>;

    /// Fetch the asset's current snapshot.
    fn get(&self, id: AssetId) -> Result<Option<Asset>>;
}

/// An in-memory catalog over a fixed set of assets.
///
/// Used by this crate's own tests and by embedders that already hold asset
/// snapshots (imports, replays). Build it up front, then share it behind an
/// `Arc<dyn AssetCatalog>`.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    assets: HashMap<AssetId, Asset>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog seeded with `assets`.
    #[must_use]
    pub fn with_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        Self {
            assets: assets.into_iter().map(|a| (a.id, a)).collect(),
        }
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, asset: Asset) {
        self.assets.insert(asset.id, asset);
    }

    /// Number of assets in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetCatalog for StaticCatalog {
    fn exists(&self, id: AssetId) -> Result<bool> {
        Ok(self.assets.contains_key(&id))
    }

    fn get(&self, id: AssetId) -> Result<Option<Asset>> {
        Ok(self.assets.get(&id).cloned())
    }
}
