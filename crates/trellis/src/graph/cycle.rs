//! Dependency cycle detection.
//!
//! Two entry points with different cost profiles:
//!
//! - [`dependency_path_exists`] answers "is `to` reachable from `from`?"
//!   with one walk over the dependency edges, one query per visited node.
//!   It backs [`CycleChecker::would_create_cycle`] and the guarded insert
//!   on the store.
//! - [`CycleChecker::find_cycles`] loads the whole dependency edge set once
//!   and finds every loop already present. Loops cannot be created through
//!   the guarded insert, so this is a diagnostic for data that arrived
//!   through imports or the unguarded path.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::store::{dependency_children_on, RelationshipStore};
use crate::types::{AssetId, Cycle};

/// Walk dependency edges from `from` and report whether `to` is reachable.
///
/// Iterative with an explicit stack and a visited set, so arbitrarily deep
/// chains cannot overflow the call stack and shared sub-graphs are expanded
/// once. `from == to` counts as reachable: an edge from a node to itself is
/// a loop.
///
/// Takes a plain connection so callers inside a transaction observe their
/// own snapshot.
pub(crate) fn dependency_path_exists(
    conn: &Connection,
    from: AssetId,
    to: AssetId,
) -> Result<bool> {
    if from == to {
        return Ok(true);
    }

    let mut visited: HashSet<AssetId> = HashSet::new();
    let mut pending = vec![from];

    while let Some(current) = pending.pop() {
        if !visited.insert(current) {
            continue;
        }

        for child in dependency_children_on(conn, current)? {
            if child == to {
                return Ok(true);
            }
            if !visited.contains(&child) {
                pending.push(child);
            }
        }
    }

    Ok(false)
}

/// Where a node stands in the depth-first scan.
#[derive(Debug, Clone, Copy)]
enum NodeState {
    /// On the current path, at this index into the path vector.
    OnPath(usize),
    /// Fully explored; no loop can run through it that was not already found.
    Done,
}

/// Detects loops in the dependency graph.
pub struct CycleChecker<'a> {
    store: &'a RelationshipStore,
}

impl<'a> CycleChecker<'a> {
    /// Create a checker over the given store.
    #[must_use]
    pub fn new(store: &'a RelationshipStore) -> Self {
        Self { store }
    }

    /// Whether adding a dependency edge `parent -> child` would close a loop.
    ///
    /// True exactly when `parent` is already reachable from `child` along
    /// dependency edges. Only dependency edges count; the other relationship
    /// types are allowed to form loops.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub fn would_create_cycle(&self, parent: AssetId, child: AssetId) -> Result<bool> {
        if parent == child {
            return Ok(true);
        }

        let conn = self.store.connection()?;
        dependency_path_exists(&conn, child, parent)
    }

    /// Find every dependency loop currently stored.
    ///
    /// Loads the dependency edges once, then runs an iterative depth-first
    /// scan with explicit frames over every node. Each loop is reported
    /// once, as the node sequence in walk order starting from the node the
    /// scan entered it through; loops that are rotations of one another are
    /// treated as the same loop. Roots are visited in ascending id order
    /// and children are expanded in ascending id order, so output is
    /// deterministic for a given edge set.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn find_cycles(&self) -> Result<Vec<Cycle>> {
        let edges = self.store.all_dependency_edges()?;

        let mut adjacency: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
        let mut nodes: BTreeSet<AssetId> = BTreeSet::new();
        for &(parent, child) in &edges {
            adjacency.entry(parent).or_default().push(child);
            nodes.insert(parent);
            nodes.insert(child);
        }
        for children in adjacency.values_mut() {
            children.sort_unstable();
        }

        let mut state: HashMap<AssetId, NodeState> = HashMap::new();
        let mut path: Vec<AssetId> = Vec::new();
        let mut seen: HashSet<Vec<AssetId>> = HashSet::new();
        let mut cycles: Vec<Cycle> = Vec::new();

        for &root in &nodes {
            if state.contains_key(&root) {
                continue;
            }

            // Frame = (node, index of the next child to expand).
            let mut frames: Vec<(AssetId, usize)> = vec![(root, 0)];
            state.insert(root, NodeState::OnPath(0));
            path.push(root);

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                let children = adjacency.get(&node).map_or(&[][..], Vec::as_slice);

                if frame.1 < children.len() {
                    let child = children[frame.1];
                    frame.1 += 1;

                    match state.get(&child) {
                        Some(&NodeState::OnPath(start)) => {
                            // Back edge: the loop is the path suffix from
                            // the first visit of `child`.
                            let assets = path[start..].to_vec();
                            if seen.insert(rotation_key(&assets)) {
                                cycles.push(Cycle { assets });
                            }
                        }
                        Some(NodeState::Done) => {}
                        None => {
                            state.insert(child, NodeState::OnPath(path.len()));
                            path.push(child);
                            frames.push((child, 0));
                        }
                    }
                } else {
                    state.insert(node, NodeState::Done);
                    path.pop();
                    frames.pop();
                }
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            cycles = cycles.len(),
            "Scanned dependency graph for cycles"
        );
        Ok(cycles)
    }
}

/// Canonical form of a loop for deduplication: rotated so the smallest
/// asset id comes first. The reported loop keeps walk order; only the key
/// is normalized.
fn rotation_key(assets: &[AssetId]) -> Vec<AssetId> {
    let min_pos = assets
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map_or(0, |(pos, _)| pos);

    let mut key = Vec::with_capacity(assets.len());
    key.extend_from_slice(&assets[min_pos..]);
    key.extend_from_slice(&assets[..min_pos]);
    key
}
