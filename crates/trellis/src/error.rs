//! Error types for relationship operations.
//!
//! ## Error Philosophy
//!
//! Every failure is a typed value returned to the caller; nothing in this
//! crate panics on bad input. Errors fall into two groups:
//!
//! - Domain rejections (caller's request cannot be honored): missing assets
//!   or edges, self-references, duplicate edges, cycles, bad tokens. These
//!   map naturally onto 4xx-style responses in an enclosing service.
//! - Infrastructure failures (the subsystem itself broke): database errors,
//!   catalog errors, poisoned locks. These are 5xx-style.
//!
//! History recording is deliberately outside this model: it is best-effort
//! and its failures are logged, never surfaced (see [`crate::history`]).

use thiserror::Error;

use crate::types::{AssetId, RelationshipId, RelationshipType};

/// Result type for relationship operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for relationship operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An endpoint asset does not exist in the catalog.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// The referenced relationship edge does not exist.
    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    /// An asset may not be related to itself.
    #[error("asset cannot be related to itself: {0}")]
    SelfReference(AssetId),

    /// Adding the edge would close a dependency cycle.
    #[error("circular dependency: {parent} -> {child} would close a dependency cycle")]
    CircularDependency {
        /// Parent endpoint of the rejected edge.
        parent: AssetId,
        /// Child endpoint of the rejected edge.
        child: AssetId,
    },

    /// The `(parent, child, type)` triple is already present.
    #[error("relationship already exists: {parent} -> {child} ({relationship_type})")]
    AlreadyExists {
        /// Parent endpoint of the duplicate edge.
        parent: AssetId,
        /// Child endpoint of the duplicate edge.
        child: AssetId,
        /// Type of the duplicate edge.
        relationship_type: RelationshipType,
    },

    /// Caller passed a direction token other than `parent`, `child`, `both`.
    #[error("invalid direction {0:?}: expected parent, child, or both")]
    InvalidDirection(String),

    /// Caller passed an unknown relationship type token.
    #[error("invalid relationship type {0:?}: expected component, dependency, related, or upgrade")]
    InvalidRelationshipType(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed (e.g. creating the store's directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external asset catalog failed to answer.
    #[error("asset catalog error: {0}")]
    Catalog(String),

    /// Internal invariant violation (e.g. a poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if the error means a referenced entity is missing.
    ///
    /// Enclosing layers usually map these to a 404-style response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound(_) | Self::RelationshipNotFound(_)
        )
    }

    /// Returns `true` if the error is a rejected mutation (conflict).
    ///
    /// Self-references, duplicates, and cycles leave the store untouched.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SelfReference(_) | Self::CircularDependency { .. } | Self::AlreadyExists { .. }
        )
    }

    /// Returns `true` if the error is an infrastructure failure rather than
    /// a problem with the caller's request.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Io(_) | Self::Catalog(_) | Self::Internal(_)
        )
    }
}
