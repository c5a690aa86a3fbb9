//! Fire-and-forget history events for relationship mutations.
//!
//! Every successful create/delete emits one event per endpoint asset. The
//! events travel over an MPSC channel whose receiving end belongs to the
//! enclosing system (the audit/history collaborator); this crate only ever
//! holds the sender. Making the side effect an explicit channel keeps the
//! "best-effort, non-blocking" contract visible in the types instead of
//! hiding it behind an ignored return value.
//!
//! ## Data flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RelationshipService        │  Enclosing system               │
//! │  ───────────────────        │  ────────────────               │
//! │  create/delete succeeds     │                                 │
//! │  record(parent event) ──────┼→ recv() → persist audit row     │
//! │  record(child event)  ──────┼→ recv() → persist audit row     │
//! │  (failures logged, never    │                                 │
//! │   propagated)               │                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A mutation never fails or rolls back because history could not be
//! recorded: if the receiver is gone the event is dropped with a warning.

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{AssetId, RelationshipType};

/// What happened to the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// An edge was created.
    RelationshipAdded,
    /// An edge was deleted.
    RelationshipRemoved,
}

impl HistoryAction {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelationshipAdded => "relationship_added",
            Self::RelationshipRemoved => "relationship_removed",
        }
    }
}

/// One history event, addressed to a single endpoint asset.
///
/// A mutation touching edge `parent -> child` produces two entries: one
/// addressed to the parent (peer = child) and one addressed to the child
/// (peer = parent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Asset whose history this entry belongs to.
    pub asset_id: AssetId,
    /// What happened.
    pub action: HistoryAction,
    /// Who performed the mutation.
    pub actor: String,
    /// Type of the edge involved.
    pub relationship_type: RelationshipType,
    /// The other endpoint of the edge.
    pub peer_asset_id: AssetId,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build an entry stamped with the current time.
    #[must_use]
    pub fn new(
        asset_id: AssetId,
        action: HistoryAction,
        actor: &str,
        relationship_type: RelationshipType,
        peer_asset_id: AssetId,
    ) -> Self {
        Self {
            asset_id,
            action,
            actor: actor.to_string(),
            relationship_type,
            peer_asset_id,
            recorded_at: Utc::now(),
        }
    }
}

/// Sending half of the history channel.
///
/// Cloneable and cheap; [`record`](Self::record) never blocks and never
/// fails from the caller's perspective.
#[derive(Debug, Clone)]
pub struct HistorySink {
    inner: SinkInner,
}

#[derive(Debug, Clone)]
enum SinkInner {
    Channel(Sender<HistoryEntry>),
    Disabled,
}

impl HistorySink {
    /// Create a connected sink together with its receiving end.
    ///
    /// The enclosing system owns the receiver and decides what "recording
    /// history" means (persist, forward, test assertion).
    #[must_use]
    pub fn channel() -> (Self, Receiver<HistoryEntry>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                inner: SinkInner::Channel(sender),
            },
            receiver,
        )
    }

    /// Create a sink that silently discards every event.
    ///
    /// For embedders that do not consume history. Unlike a channel with a
    /// dropped receiver, this never logs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: SinkInner::Disabled,
        }
    }

    /// Record one history event.
    ///
    /// Non-blocking. If the receiver has disconnected, the entry is dropped
    /// and a warning is logged; the mutation that produced the entry is
    /// unaffected.
    pub fn record(&self, entry: HistoryEntry) {
        match &self.inner {
            SinkInner::Channel(sender) => {
                if let Err(e) = sender.send(entry) {
                    warn!(
                        asset = %e.0.asset_id,
                        action = e.0.action.as_str(),
                        "Dropped history event (receiver disconnected)"
                    );
                }
            }
            SinkInner::Disabled => {}
        }
    }
}
