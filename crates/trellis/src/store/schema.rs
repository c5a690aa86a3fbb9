//! Database schema definition for the relationship store.

/// Database schema definition.
///
/// Assets themselves live in an external store, so the endpoint columns are
/// plain identifiers with no foreign keys. The UNIQUE triple and the
/// self-reference CHECK back the invariants the service layer also enforces.
pub(crate) const SCHEMA: &str = r"
-- Typed directed edges between assets
CREATE TABLE IF NOT EXISTS asset_relationships (
    id INTEGER PRIMARY KEY,
    parent_asset_id INTEGER NOT NULL,
    child_asset_id INTEGER NOT NULL,
    relationship_type TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (parent_asset_id, child_asset_id, relationship_type),
    CHECK (parent_asset_id <> child_asset_id)
);

CREATE INDEX IF NOT EXISTS idx_rel_parent ON asset_relationships(parent_asset_id);
CREATE INDEX IF NOT EXISTS idx_rel_child ON asset_relationships(child_asset_id);
CREATE INDEX IF NOT EXISTS idx_rel_type_parent ON asset_relationships(relationship_type, parent_asset_id);
CREATE INDEX IF NOT EXISTS idx_rel_type_child ON asset_relationships(relationship_type, child_asset_id);
";
