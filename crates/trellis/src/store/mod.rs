//! `SQLite` storage layer for relationship edges.
//!
//! The store is the source of truth for every edge; traversals in the
//! `graph` module re-read it on every call rather than caching adjacency in
//! memory. Asset attributes are deliberately absent; they belong to the
//! external catalog (see [`crate::catalog`]).
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `edges` - Edge CRUD and the traversal-support queries

mod edges;
mod schema;

pub(crate) use edges::dependency_children_on;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::types::{RelationshipStats, RelationshipType};

use schema::SCHEMA;

/// `SQLite`-backed store for asset relationship edges.
///
/// The connection is wrapped in a `Mutex` so graph traversals and mutations
/// can share one store across threads. All operations are short-lived; no
/// state survives between calls apart from the rows themselves.
pub struct RelationshipStore {
    conn: Mutex<Connection>,
}

impl RelationshipStore {
    /// Open or create the relationship database at `path`.
    ///
    /// Creates missing parent directories. The database is switched to WAL
    /// journaling and given a busy timeout so a writer holding the lock (see
    /// [`insert_guarded`](Self::insert_guarded)) delays other writers
    /// instead of failing them.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;

        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %path.display(), "Opened relationship store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an ephemeral in-memory store.
    ///
    /// Used by tests and by embedders that rebuild the edge set from an
    /// external source on startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    ///
    /// Returns a `MutexGuard` providing exclusive access to the underlying
    /// connection. Used internally by all database operations.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "store connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Edge counts by relationship type, for operator diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn stats(&self) -> Result<RelationshipStats> {
        let conn = self.connection()?;
        let mut stats = RelationshipStats::default();

        let mut stmt = conn.prepare(
            "SELECT relationship_type, COUNT(*) FROM asset_relationships GROUP BY relationship_type",
        )?;
        let rows = stmt.query_map([], |row| {
            let type_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((type_str, count))
        })?;

        for row in rows {
            let (type_str, count) = row?;
            #[allow(clippy::cast_sign_loss)]
            let count = count as usize;
            match edges::parse_relationship_type(&type_str)? {
                RelationshipType::Component => stats.component = count,
                RelationshipType::Dependency => stats.dependency = count,
                RelationshipType::Related => stats.related = count,
                RelationshipType::Upgrade => stats.upgrade = count,
            }
            stats.total += count;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetId, NewRelationship};

    fn new_edge(parent: i64, child: i64, rt: RelationshipType) -> NewRelationship {
        NewRelationship {
            parent_asset_id: AssetId::from(parent),
            child_asset_id: AssetId::from(child),
            relationship_type: rt,
            notes: None,
        }
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("edges.db");

        let store = RelationshipStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.stats().unwrap().total, 0);
    }

    #[test]
    fn reopen_preserves_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.db");

        {
            let store = RelationshipStore::open(&path).unwrap();
            store
                .insert(&new_edge(1, 2, RelationshipType::Dependency))
                .unwrap();
        }

        let store = RelationshipStore::open(&path).unwrap();
        assert_eq!(store.stats().unwrap().dependency, 1);
    }

    #[test]
    fn stats_count_by_type() {
        let store = RelationshipStore::in_memory().unwrap();

        store
            .insert(&new_edge(1, 2, RelationshipType::Dependency))
            .unwrap();
        store
            .insert(&new_edge(1, 3, RelationshipType::Dependency))
            .unwrap();
        store
            .insert(&new_edge(1, 4, RelationshipType::Component))
            .unwrap();
        store
            .insert(&new_edge(5, 1, RelationshipType::Related))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.dependency, 2);
        assert_eq!(stats.component, 1);
        assert_eq!(stats.related, 1);
        assert_eq!(stats.upgrade, 0);
    }
}
