//! Integration tests for the relationship service.
//!
//! These tests pin validation order, the typed error for each rejected
//! create, history emission on both mutation paths, and the depth handling
//! of the graph reads.

use std::sync::Arc;

use trellis::{
    Asset, AssetCatalog, AssetId, AssetStatus, Error, HistoryAction, HistorySink, NewRelationship,
    QueryDirection, RelationshipService, RelationshipStore, RelationshipType, RiskLevel,
    StaticCatalog,
};

fn asset(id: i64) -> Asset {
    Asset {
        id: AssetId::from(id),
        tag: format!("AST-{id:04}"),
        name: format!("asset {id}"),
        status: AssetStatus::Active,
        metadata: None,
    }
}

fn catalog_of(ids: &[i64]) -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog::with_assets(ids.iter().map(|&id| asset(id))))
}

fn service_with_assets(ids: &[i64]) -> RelationshipService {
    RelationshipService::new(RelationshipStore::in_memory().unwrap(), catalog_of(ids))
}

fn edge(parent: i64, child: i64, rt: RelationshipType) -> NewRelationship {
    NewRelationship {
        parent_asset_id: AssetId::from(parent),
        child_asset_id: AssetId::from(child),
        relationship_type: rt,
        notes: None,
    }
}

/// Catalog that answers existence but fails every snapshot fetch.
struct OfflineCatalog;

impl AssetCatalog for OfflineCatalog {
    fn exists(&self, _id: AssetId) -> trellis::Result<bool> {
        Ok(true)
    }

    fn get(&self, _id: AssetId) -> trellis::Result<Option<Asset>> {
        Err(Error::Catalog("catalog offline".to_string()))
    }
}

// ========== Create validation ==========

#[test]
fn test_create_relationship_round_trip() {
    let service = service_with_assets(&[1, 2]);

    let created = service
        .create_relationship(edge(1, 2, RelationshipType::Component), "alice")
        .unwrap();

    assert!(created.id.as_i64() > 0);
    assert_eq!(created.parent_asset_id, AssetId::from(1));
    assert_eq!(created.child_asset_id, AssetId::from(2));
    assert_eq!(created.relationship_type, RelationshipType::Component);
    assert_eq!(service.relationship_stats().unwrap().total, 1);
}

#[test]
fn test_create_rejects_unknown_parent() {
    let service = service_with_assets(&[2]);

    let err = service
        .create_relationship(edge(1, 2, RelationshipType::Related), "alice")
        .unwrap_err();

    assert!(matches!(err, Error::AssetNotFound(id) if id == AssetId::from(1)));
    assert_eq!(service.relationship_stats().unwrap().total, 0);
}

#[test]
fn test_create_rejects_unknown_child() {
    let service = service_with_assets(&[1]);

    let err = service
        .create_relationship(edge(1, 2, RelationshipType::Related), "alice")
        .unwrap_err();

    assert!(matches!(err, Error::AssetNotFound(id) if id == AssetId::from(2)));
}

#[test]
fn test_missing_asset_is_reported_before_self_reference() {
    let service = service_with_assets(&[]);

    let err = service
        .create_relationship(edge(9, 9, RelationshipType::Related), "alice")
        .unwrap_err();

    assert!(matches!(err, Error::AssetNotFound(id) if id == AssetId::from(9)));
}

#[test]
fn test_create_rejects_self_reference() {
    let service = service_with_assets(&[1]);

    let err = service
        .create_relationship(edge(1, 1, RelationshipType::Component), "alice")
        .unwrap_err();

    assert!(matches!(err, Error::SelfReference(id) if id == AssetId::from(1)));
    assert_eq!(service.relationship_stats().unwrap().total, 0);
}

#[test]
fn test_create_rejects_duplicate_triple() {
    let service = service_with_assets(&[1, 2]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Related), "alice")
        .unwrap();

    let err = service
        .create_relationship(edge(1, 2, RelationshipType::Related), "bob")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::AlreadyExists {
            parent,
            child,
            relationship_type: RelationshipType::Related,
        } if parent == AssetId::from(1) && child == AssetId::from(2)
    ));
}

#[test]
fn test_same_pair_may_hold_several_types() {
    let service = service_with_assets(&[1, 2]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Related), "alice")
        .unwrap();
    service
        .create_relationship(edge(1, 2, RelationshipType::Upgrade), "alice")
        .unwrap();

    assert_eq!(service.relationship_stats().unwrap().total, 2);
}

#[test]
fn test_create_rejects_dependency_closing_a_loop() {
    let service = service_with_assets(&[1, 2, 3]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Dependency), "alice")
        .unwrap();
    service
        .create_relationship(edge(2, 3, RelationshipType::Dependency), "alice")
        .unwrap();

    let err = service
        .create_relationship(edge(3, 1, RelationshipType::Dependency), "alice")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::CircularDependency { parent, child }
            if parent == AssetId::from(3) && child == AssetId::from(1)
    ));
    assert_eq!(service.relationship_stats().unwrap().dependency, 2);
    assert!(service.find_circular_dependencies().unwrap().is_empty());
}

#[test]
fn test_mutual_related_links_are_allowed() {
    let service = service_with_assets(&[1, 2]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Related), "alice")
        .unwrap();
    service
        .create_relationship(edge(2, 1, RelationshipType::Related), "alice")
        .unwrap();

    assert_eq!(service.relationship_stats().unwrap().related, 2);
}

// ========== History ==========

#[test]
fn test_create_notifies_both_endpoints() {
    let (sink, events) = HistorySink::channel();
    let service = service_with_assets(&[1, 2]).with_history(sink);

    service
        .create_relationship(edge(1, 2, RelationshipType::Dependency), "alice")
        .unwrap();

    let entries: Vec<_> = events.try_iter().collect();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0].asset_id, AssetId::from(1));
    assert_eq!(entries[0].peer_asset_id, AssetId::from(2));
    assert_eq!(entries[1].asset_id, AssetId::from(2));
    assert_eq!(entries[1].peer_asset_id, AssetId::from(1));
    for entry in &entries {
        assert_eq!(entry.action, HistoryAction::RelationshipAdded);
        assert_eq!(entry.actor, "alice");
        assert_eq!(entry.relationship_type, RelationshipType::Dependency);
    }
}

#[test]
fn test_rejected_create_stays_out_of_history() {
    let (sink, events) = HistorySink::channel();
    let service = service_with_assets(&[1]).with_history(sink);

    let _ = service
        .create_relationship(edge(1, 1, RelationshipType::Related), "alice")
        .unwrap_err();

    assert!(events.try_recv().is_err());
}

#[test]
fn test_delete_notifies_both_endpoints() {
    let (sink, events) = HistorySink::channel();
    let service = service_with_assets(&[1, 2]).with_history(sink);

    let created = service
        .create_relationship(edge(1, 2, RelationshipType::Component), "alice")
        .unwrap();
    let _ = events.try_iter().count();

    let deleted = service.delete_relationship(created.id, "bob").unwrap();
    assert_eq!(deleted.id, created.id);

    let entries: Vec<_> = events.try_iter().collect();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e.action == HistoryAction::RelationshipRemoved && e.actor == "bob"));
}

#[test]
fn test_deleting_a_missing_edge_leaves_no_trace() {
    let (sink, events) = HistorySink::channel();
    let service = service_with_assets(&[1, 2]).with_history(sink);

    let created = service
        .create_relationship(edge(1, 2, RelationshipType::Component), "alice")
        .unwrap();
    let _ = events.try_iter().count();

    service.delete_relationship(created.id, "bob").unwrap();
    let err = service.delete_relationship(created.id, "bob").unwrap_err();

    assert!(matches!(err, Error::RelationshipNotFound(id) if id == created.id));
    // Only the first delete reached history.
    assert_eq!(events.try_iter().count(), 2);
}

// ========== Graph reads ==========

#[test]
fn test_relationship_graph_requires_a_known_asset() {
    let service = service_with_assets(&[]);

    let err = service
        .relationship_graph(AssetId::from(42), None)
        .unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(id) if id == AssetId::from(42)));
}

#[test]
fn test_relationship_graph_sorts_neighbors_into_buckets() {
    let service = service_with_assets(&[1, 2, 3, 4]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Component), "alice")
        .unwrap();
    service
        .create_relationship(edge(1, 3, RelationshipType::Dependency), "alice")
        .unwrap();
    service
        .create_relationship(edge(4, 1, RelationshipType::Related), "alice")
        .unwrap();

    let graph = service.relationship_graph(AssetId::from(1), Some(1)).unwrap();

    assert_eq!(graph.asset.id, AssetId::from(1));

    let children: Vec<AssetId> = graph.children.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(children, vec![AssetId::from(2), AssetId::from(3)]);

    let parents: Vec<AssetId> = graph.parents.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(parents, vec![AssetId::from(4)]);

    let components: Vec<AssetId> = graph.components.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(components, vec![AssetId::from(2)]);

    let related: Vec<AssetId> = graph.related.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(related, vec![AssetId::from(4)]);

    assert!(graph.upstream.is_some());
    assert!(graph.downstream.is_some());
}

#[test]
fn test_relationship_graph_defaults_to_three_levels() {
    let service = service_with_assets(&[1, 2, 3, 4, 5]);
    for (parent, child) in [(1, 2), (2, 3), (3, 4), (4, 5)] {
        service
            .create_relationship(edge(parent, child, RelationshipType::Dependency), "alice")
            .unwrap();
    }

    let graph = service.relationship_graph(AssetId::from(1), None).unwrap();

    let mut node = graph.downstream.as_ref().unwrap();
    while !node.dependencies.is_empty() {
        node = &node.dependencies[0];
    }
    // Three levels below the root: 2, 3, 4. Asset 5 is past the default.
    assert_eq!(node.asset_id, AssetId::from(4));
    assert_eq!(node.depth, 3);
}

#[test]
fn test_relationship_graph_clamps_requested_depth() {
    let ids: Vec<i64> = (1..=12).collect();
    let service = service_with_assets(&ids);
    for pair in ids.windows(2) {
        service
            .create_relationship(edge(pair[0], pair[1], RelationshipType::Dependency), "alice")
            .unwrap();
    }

    let graph = service
        .relationship_graph(AssetId::from(1), Some(50))
        .unwrap();

    let mut node = graph.downstream.as_ref().unwrap();
    while !node.dependencies.is_empty() {
        node = &node.dependencies[0];
    }
    assert_eq!(node.asset_id, AssetId::from(11));
    assert_eq!(node.depth, 10);
}

#[test]
fn test_impact_analysis_requires_a_known_asset() {
    let service = service_with_assets(&[]);

    let err = service.impact_analysis(AssetId::from(7)).unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(id) if id == AssetId::from(7)));
}

#[test]
fn test_impact_analysis_through_the_service() {
    let service = service_with_assets(&[1, 2, 3]);
    service
        .create_relationship(edge(1, 2, RelationshipType::Dependency), "alice")
        .unwrap();
    service
        .create_relationship(edge(2, 3, RelationshipType::Dependency), "alice")
        .unwrap();

    let impact = service.impact_analysis(AssetId::from(3)).unwrap();
    assert_eq!(impact.direct_dependents, 1);
    assert_eq!(impact.total_downstream_assets, 0);
    assert_eq!(impact.risk_level, RiskLevel::Medium);

    let impact = service.impact_analysis(AssetId::from(1)).unwrap();
    assert_eq!(impact.direct_dependents, 0);
    assert_eq!(impact.total_downstream_assets, 2);
    assert_eq!(impact.risk_level, RiskLevel::Low);
}

// ========== Relationship listing ==========

#[test]
fn test_assets_by_relationship_directions() {
    let service = service_with_assets(&[1, 2, 3, 4]);
    service
        .create_relationship(edge(2, 1, RelationshipType::Dependency), "alice")
        .unwrap();
    service
        .create_relationship(edge(1, 3, RelationshipType::Component), "alice")
        .unwrap();
    service
        .create_relationship(edge(1, 4, RelationshipType::Related), "alice")
        .unwrap();

    let parents = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Parent)
        .unwrap();
    let parent_peers: Vec<AssetId> = parents.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(parent_peers, vec![AssetId::from(2)]);

    let children = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Child)
        .unwrap();
    let child_peers: Vec<AssetId> = children.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(child_peers, vec![AssetId::from(3), AssetId::from(4)]);

    let both = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Both)
        .unwrap();
    let both_peers: Vec<AssetId> = both.iter().map(|r| r.peer_asset_id).collect();
    assert_eq!(
        both_peers,
        vec![AssetId::from(2), AssetId::from(3), AssetId::from(4)]
    );

    let components = service
        .assets_by_relationship(
            AssetId::from(1),
            Some(RelationshipType::Component),
            QueryDirection::Both,
        )
        .unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].peer_asset_id, AssetId::from(3));

    // Snapshots come from the catalog.
    assert!(both.iter().all(|r| r.asset.is_some()));
}

#[test]
fn test_assets_by_relationship_requires_a_known_asset() {
    let service = service_with_assets(&[]);

    let err = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Both)
        .unwrap_err();
    assert!(matches!(err, Error::AssetNotFound(_)));
}

#[test]
fn test_unknown_peers_get_no_snapshot() {
    // An edge whose peer left the catalog after it was recorded.
    let store = RelationshipStore::in_memory().unwrap();
    store
        .insert(&edge(1, 9, RelationshipType::Related))
        .unwrap();
    let service = RelationshipService::new(store, catalog_of(&[1]));

    let related = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Child)
        .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].peer_asset_id, AssetId::from(9));
    assert!(related[0].asset.is_none());
}

#[test]
fn test_catalog_failures_leave_peers_without_snapshots() {
    // Snapshot fetches fail outright; the listing still returns every edge.
    let store = RelationshipStore::in_memory().unwrap();
    store
        .insert(&edge(1, 2, RelationshipType::Related))
        .unwrap();
    let service = RelationshipService::new(store, Arc::new(OfflineCatalog));

    let related = service
        .assets_by_relationship(AssetId::from(1), None, QueryDirection::Child)
        .unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].peer_asset_id, AssetId::from(2));
    assert!(related[0].asset.is_none());
}

#[test]
fn test_find_circular_dependencies_reports_legacy_loops() {
    let store = RelationshipStore::in_memory().unwrap();
    store
        .insert(&edge(1, 2, RelationshipType::Dependency))
        .unwrap();
    store
        .insert(&edge(2, 1, RelationshipType::Dependency))
        .unwrap();
    let service = RelationshipService::new(store, catalog_of(&[1, 2]));

    let cycles = service.find_circular_dependencies().unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].assets, vec![AssetId::from(1), AssetId::from(2)]);
}

// ========== Boundary parsing ==========

#[test]
fn test_query_direction_tokens() {
    assert_eq!("parent".parse::<QueryDirection>().unwrap(), QueryDirection::Parent);
    assert_eq!("child".parse::<QueryDirection>().unwrap(), QueryDirection::Child);
    assert_eq!("both".parse::<QueryDirection>().unwrap(), QueryDirection::Both);

    let err = "sideways".parse::<QueryDirection>().unwrap_err();
    assert!(matches!(err, Error::InvalidDirection(token) if token == "sideways"));
}

#[test]
fn test_relationship_type_tokens() {
    assert_eq!(
        "dependency".parse::<RelationshipType>().unwrap(),
        RelationshipType::Dependency
    );
    assert_eq!(
        "component".parse::<RelationshipType>().unwrap(),
        RelationshipType::Component
    );

    let err = "friendship".parse::<RelationshipType>().unwrap_err();
    assert!(matches!(err, Error::InvalidRelationshipType(token) if token == "friendship"));
}
