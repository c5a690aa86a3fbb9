//! Edge CRUD and traversal-support queries for the relationship store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, trace};

use super::RelationshipStore;
use crate::error::{Error, Result};
use crate::graph::cycle::dependency_path_exists;
use crate::types::{
    AssetId, AssetRelationship, Direction, NewRelationship, RelationshipId, RelationshipType,
};

/// SQL column list for the `asset_relationships` table.
///
/// Use with `row_to_relationship` for consistent column ordering.
const REL_COLUMNS: &str =
    "id, parent_asset_id, child_asset_id, relationship_type, notes, created_at";

/// Parse a relationship type string from the database.
///
/// Returns an error for unrecognized values, indicating possible database
/// corruption.
pub(crate) fn parse_relationship_type(s: &str) -> rusqlite::Result<RelationshipType> {
    match s {
        "component" => Ok(RelationshipType::Component),
        "dependency" => Ok(RelationshipType::Dependency),
        "related" => Ok(RelationshipType::Related),
        "upgrade" => Ok(RelationshipType::Upgrade),
        unknown => Err(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("Unknown relationship type '{unknown}' in database. Database may be corrupted or from a newer version.").into(),
        )),
    }
}

/// Parse an RFC 3339 timestamp string from the database.
fn parse_created_at(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("Invalid timestamp '{s}' in database: {e}. Database may be corrupted.")
                    .into(),
            )
        })
}

/// Convert a row selected with [`REL_COLUMNS`] into an [`AssetRelationship`].
fn row_to_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetRelationship> {
    let type_str: String = row.get(3)?;
    let created_str: String = row.get(5)?;

    Ok(AssetRelationship {
        id: RelationshipId::from(row.get::<_, i64>(0)?),
        parent_asset_id: AssetId::from(row.get::<_, i64>(1)?),
        child_asset_id: AssetId::from(row.get::<_, i64>(2)?),
        relationship_type: parse_relationship_type(&type_str)?,
        notes: row.get(4)?,
        created_at: parse_created_at(&created_str)?,
    })
}

/// Probe the unique triple on an open connection.
fn exists_on(
    conn: &Connection,
    parent: AssetId,
    child: AssetId,
    relationship_type: RelationshipType,
) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM asset_relationships
             WHERE parent_asset_id = ?1 AND child_asset_id = ?2 AND relationship_type = ?3",
            params![parent.as_i64(), child.as_i64(), relationship_type.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}

/// Insert one edge on an open connection and return the stored row.
fn insert_on(conn: &Connection, new: &NewRelationship) -> Result<AssetRelationship> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO asset_relationships
             (parent_asset_id, child_asset_id, relationship_type, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.parent_asset_id.as_i64(),
            new.child_asset_id.as_i64(),
            new.relationship_type.as_str(),
            new.notes,
            created_at.to_rfc3339(),
        ],
    )?;

    Ok(AssetRelationship {
        id: RelationshipId::from(conn.last_insert_rowid()),
        parent_asset_id: new.parent_asset_id,
        child_asset_id: new.child_asset_id,
        relationship_type: new.relationship_type,
        notes: new.notes.clone(),
        created_at,
    })
}

/// Child ids of dependency edges leaving `asset`, on an open connection.
///
/// This is the per-node expansion step shared by the cycle walk and the
/// downstream traversals: one query per visited node, by design.
pub(crate) fn dependency_children_on(conn: &Connection, asset: AssetId) -> Result<Vec<AssetId>> {
    let mut stmt = conn.prepare(
        "SELECT child_asset_id FROM asset_relationships
         WHERE parent_asset_id = ?1 AND relationship_type = ?2",
    )?;

    let children = stmt
        .query_map(
            params![asset.as_i64(), RelationshipType::Dependency.as_str()],
            |row| row.get::<_, i64>(0).map(AssetId::from),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(children)
}

impl RelationshipStore {
    /// Whether the `(parent, child, type)` triple is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn exists(
        &self,
        parent: AssetId,
        child: AssetId,
        relationship_type: RelationshipType,
    ) -> Result<bool> {
        let conn = self.connection()?;
        exists_on(&conn, parent, child, relationship_type)
    }

    /// Insert one edge.
    ///
    /// Fails with [`Error::AlreadyExists`] when the unique triple is already
    /// present. Endpoint validation (existence, self-reference) belongs to
    /// the service layer; the schema-level CHECK is only a backstop against
    /// direct misuse.
    ///
    /// This is the unguarded write used for imports and replays. Interactive
    /// creation goes through [`insert_guarded`](Self::insert_guarded), which
    /// adds the cycle check under a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] or a database error.
    pub fn insert(&self, new: &NewRelationship) -> Result<AssetRelationship> {
        let conn = self.connection()?;

        if exists_on(&conn, new.parent_asset_id, new.child_asset_id, new.relationship_type)? {
            return Err(Error::AlreadyExists {
                parent: new.parent_asset_id,
                child: new.child_asset_id,
                relationship_type: new.relationship_type,
            });
        }

        let edge = insert_on(&conn, new)?;
        trace!(
            edge = edge.id.as_i64(),
            parent = %edge.parent_asset_id,
            child = %edge.child_asset_id,
            relationship_type = edge.relationship_type.as_str(),
            "Inserted relationship"
        );
        Ok(edge)
    }

    /// Insert one edge with the dependency cycle check under a transaction.
    ///
    /// The reference behavior this store replaces ran the cycle check and
    /// the insert as two unguarded steps, so two concurrent creates could
    /// each pass the check and jointly close a cycle. Here the duplicate
    /// probe, the cycle walk, and the insert all run inside one
    /// `BEGIN IMMEDIATE` transaction: the write lock is taken up front,
    /// concurrent writers are serialized for the whole check-and-insert, and
    /// the reads the cycle walk performs are consistent with the insert.
    ///
    /// Non-dependency types skip the cycle walk; they are allowed to cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CircularDependency`], [`Error::AlreadyExists`], or a
    /// database error.
    pub fn insert_guarded(&self, new: &NewRelationship) -> Result<AssetRelationship> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if new.relationship_type == RelationshipType::Dependency
            && dependency_path_exists(&tx, new.child_asset_id, new.parent_asset_id)?
        {
            return Err(Error::CircularDependency {
                parent: new.parent_asset_id,
                child: new.child_asset_id,
            });
        }

        if exists_on(&tx, new.parent_asset_id, new.child_asset_id, new.relationship_type)? {
            return Err(Error::AlreadyExists {
                parent: new.parent_asset_id,
                child: new.child_asset_id,
                relationship_type: new.relationship_type,
            });
        }

        let edge = insert_on(&tx, new)?;
        tx.commit()?;

        debug!(
            edge = edge.id.as_i64(),
            parent = %edge.parent_asset_id,
            child = %edge.child_asset_id,
            relationship_type = edge.relationship_type.as_str(),
            "Inserted relationship (guarded)"
        );
        Ok(edge)
    }

    /// Fetch one edge by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn get(&self, id: RelationshipId) -> Result<Option<AssetRelationship>> {
        let conn = self.connection()?;

        let edge = conn
            .query_row(
                &format!("SELECT {REL_COLUMNS} FROM asset_relationships WHERE id = ?1"),
                [id.as_i64()],
                row_to_relationship,
            )
            .optional()?;

        Ok(edge)
    }

    /// Delete one edge by id and return the deleted row.
    ///
    /// The returned edge carries the endpoints and type the caller needs to
    /// emit history records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RelationshipNotFound`] when the edge does not exist.
    pub fn delete(&self, id: RelationshipId) -> Result<AssetRelationship> {
        let conn = self.connection()?;

        let edge = conn
            .query_row(
                &format!("SELECT {REL_COLUMNS} FROM asset_relationships WHERE id = ?1"),
                [id.as_i64()],
                row_to_relationship,
            )
            .optional()?
            .ok_or(Error::RelationshipNotFound(id))?;

        conn.execute("DELETE FROM asset_relationships WHERE id = ?1", [id.as_i64()])?;

        trace!(
            edge = id.as_i64(),
            parent = %edge.parent_asset_id,
            child = %edge.child_asset_id,
            "Deleted relationship"
        );
        Ok(edge)
    }

    /// Edges adjacent to `asset` in the given direction.
    ///
    /// `Direction::Parent` selects edges where `asset` is the child (the
    /// peers are its parents); `Direction::Child` selects edges where it is
    /// the parent. `type_filter` optionally restricts the edge type. Rows
    /// are ordered by edge id for deterministic results.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn neighbors(
        &self,
        asset: AssetId,
        direction: Direction,
        type_filter: Option<RelationshipType>,
    ) -> Result<Vec<AssetRelationship>> {
        let conn = self.connection()?;

        let own_column = match direction {
            Direction::Parent => "child_asset_id",
            Direction::Child => "parent_asset_id",
        };

        let edges = match type_filter {
            Some(rt) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {REL_COLUMNS} FROM asset_relationships
                     WHERE {own_column} = ?1 AND relationship_type = ?2
                     ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![asset.as_i64(), rt.as_str()], row_to_relationship)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {REL_COLUMNS} FROM asset_relationships
                     WHERE {own_column} = ?1
                     ORDER BY id"
                ))?;
                let rows = stmt.query_map([asset.as_i64()], row_to_relationship)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(edges)
    }

    /// `(parent, child)` pairs of every dependency edge.
    ///
    /// One full scan feeding the global cycle scan and the critical-path
    /// walk, which both operate on an adjacency map fetched once per call.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn all_dependency_edges(&self) -> Result<Vec<(AssetId, AssetId)>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(
            "SELECT parent_asset_id, child_asset_id FROM asset_relationships
             WHERE relationship_type = ?1",
        )?;

        let edges = stmt
            .query_map([RelationshipType::Dependency.as_str()], |row| {
                Ok((
                    AssetId::from(row.get::<_, i64>(0)?),
                    AssetId::from(row.get::<_, i64>(1)?),
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    /// Child ids of dependency edges leaving `asset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn dependency_children(&self, asset: AssetId) -> Result<Vec<AssetId>> {
        let conn = self.connection()?;
        dependency_children_on(&conn, asset)
    }

    /// Number of dependency edges arriving at `asset` (its direct
    /// dependents sit in the parent column of those edges).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn dependent_count(&self, asset: AssetId) -> Result<usize> {
        let conn = self.connection()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM asset_relationships
             WHERE child_asset_id = ?1 AND relationship_type = ?2",
            params![asset.as_i64(), RelationshipType::Dependency.as_str()],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RelationshipStore {
        RelationshipStore::in_memory().unwrap()
    }

    fn new_edge(parent: i64, child: i64, rt: RelationshipType) -> NewRelationship {
        NewRelationship {
            parent_asset_id: AssetId::from(parent),
            child_asset_id: AssetId::from(child),
            relationship_type: rt,
            notes: None,
        }
    }

    #[test]
    fn insert_assigns_id_and_round_trips() {
        let store = store();

        let mut request = new_edge(1, 2, RelationshipType::Component);
        request.notes = Some("rack slot 4".to_string());

        let inserted = store.insert(&request).unwrap();
        assert!(inserted.id.as_i64() > 0);

        let fetched = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched.parent_asset_id, AssetId::from(1));
        assert_eq!(fetched.child_asset_id, AssetId::from(2));
        assert_eq!(fetched.relationship_type, RelationshipType::Component);
        assert_eq!(fetched.notes.as_deref(), Some("rack slot 4"));
        assert_eq!(fetched.created_at, inserted.created_at);
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let store = store();
        store.insert(&new_edge(1, 2, RelationshipType::Related)).unwrap();

        let err = store
            .insert(&new_edge(1, 2, RelationshipType::Related))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn same_pair_different_type_is_allowed() {
        let store = store();
        store.insert(&new_edge(1, 2, RelationshipType::Related)).unwrap();
        store.insert(&new_edge(1, 2, RelationshipType::Component)).unwrap();

        assert!(store
            .exists(AssetId::from(1), AssetId::from(2), RelationshipType::Component)
            .unwrap());
    }

    #[test]
    fn delete_returns_edge_then_not_found() {
        let store = store();
        let edge = store.insert(&new_edge(3, 4, RelationshipType::Upgrade)).unwrap();

        let deleted = store.delete(edge.id).unwrap();
        assert_eq!(deleted.parent_asset_id, AssetId::from(3));
        assert_eq!(deleted.child_asset_id, AssetId::from(4));
        assert_eq!(deleted.relationship_type, RelationshipType::Upgrade);

        let err = store.delete(edge.id).unwrap_err();
        assert!(matches!(err, Error::RelationshipNotFound(id) if id == edge.id));
    }

    #[test]
    fn neighbors_respects_direction() {
        let store = store();
        // 1 -> 2, 3 -> 2: asset 2 has two parents and no children.
        store.insert(&new_edge(1, 2, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(3, 2, RelationshipType::Dependency)).unwrap();

        let parents = store
            .neighbors(AssetId::from(2), Direction::Parent, None)
            .unwrap();
        assert_eq!(parents.len(), 2);
        assert!(parents.iter().all(|e| e.child_asset_id == AssetId::from(2)));

        let children = store
            .neighbors(AssetId::from(2), Direction::Child, None)
            .unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn neighbors_honors_type_filter() {
        let store = store();
        store.insert(&new_edge(1, 2, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(1, 3, RelationshipType::Component)).unwrap();
        store.insert(&new_edge(1, 4, RelationshipType::Component)).unwrap();

        let components = store
            .neighbors(
                AssetId::from(1),
                Direction::Child,
                Some(RelationshipType::Component),
            )
            .unwrap();
        assert_eq!(components.len(), 2);
        assert!(components
            .iter()
            .all(|e| e.relationship_type == RelationshipType::Component));
    }

    #[test]
    fn all_dependency_edges_ignores_other_types() {
        let store = store();
        store.insert(&new_edge(1, 2, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(2, 3, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(1, 9, RelationshipType::Related)).unwrap();

        let mut edges = store.all_dependency_edges().unwrap();
        edges.sort_unstable();
        assert_eq!(
            edges,
            vec![
                (AssetId::from(1), AssetId::from(2)),
                (AssetId::from(2), AssetId::from(3)),
            ]
        );
    }

    #[test]
    fn dependency_children_and_dependent_count() {
        let store = store();
        store.insert(&new_edge(1, 2, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(1, 3, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(4, 3, RelationshipType::Dependency)).unwrap();
        store.insert(&new_edge(1, 5, RelationshipType::Component)).unwrap();

        let mut children = store.dependency_children(AssetId::from(1)).unwrap();
        children.sort_unstable();
        assert_eq!(children, vec![AssetId::from(2), AssetId::from(3)]);

        assert_eq!(store.dependent_count(AssetId::from(3)).unwrap(), 2);
        assert_eq!(store.dependent_count(AssetId::from(1)).unwrap(), 0);
    }

    #[test]
    fn guarded_insert_rejects_reverse_dependency() {
        let store = store();
        store
            .insert_guarded(&new_edge(1, 2, RelationshipType::Dependency))
            .unwrap();

        let err = store
            .insert_guarded(&new_edge(2, 1, RelationshipType::Dependency))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CircularDependency { parent, child }
                if parent == AssetId::from(2) && child == AssetId::from(1)
        ));
    }

    #[test]
    fn guarded_insert_allows_mutual_related_links() {
        let store = store();
        store
            .insert_guarded(&new_edge(1, 2, RelationshipType::Related))
            .unwrap();
        store
            .insert_guarded(&new_edge(2, 1, RelationshipType::Related))
            .unwrap();

        assert_eq!(store.stats().unwrap().related, 2);
    }

    #[test]
    fn guarded_insert_leaves_no_row_behind_on_rejection() {
        let store = store();
        store
            .insert_guarded(&new_edge(1, 2, RelationshipType::Dependency))
            .unwrap();
        store
            .insert_guarded(&new_edge(2, 3, RelationshipType::Dependency))
            .unwrap();

        let _ = store
            .insert_guarded(&new_edge(3, 1, RelationshipType::Dependency))
            .unwrap_err();

        assert_eq!(store.stats().unwrap().dependency, 2);
    }
}
