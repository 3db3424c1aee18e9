//! Scenarios shared by the backend integration tests.
//!
//! Each scenario runs against a live store through the public repository
//! and wipes its own labels first.

#![allow(dead_code)]

use fundgraph::graph::{CompiledQuery, GraphBackend, QueryExecutor};
use fundgraph::{Field, GraphNode, GraphRepository, RelationshipSpec};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const LABELS: &[&str] = &["itmodel", "itaudited", "itcalculation"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItModel {
    pub id: String,
    pub name: String,
}

impl GraphNode for ItModel {
    const TYPE_NAME: &'static str = "ItModel";
    const INDEX_PROPERTIES: &'static [&'static str] = &["id"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItAudited {
    pub id: String,
    pub createdby: String,
    pub name: String,
}

impl GraphNode for ItAudited {
    const TYPE_NAME: &'static str = "ItAudited";
    const INDEX_PROPERTIES: &'static [&'static str] = &["id"];
    const IMMUTABLE_PROPERTIES: &'static [&'static str] = &["createdBy"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItCalculation {
    pub id: String,
}

impl GraphNode for ItCalculation {
    const TYPE_NAME: &'static str = "ItCalculation";
    const INDEX_PROPERTIES: &'static [&'static str] = &["id"];
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn id(value: &str) -> Field {
    Field::new("Id", value)
}

fn calculations(ids: &[&str]) -> Vec<ItCalculation> {
    ids.iter()
        .map(|id| ItCalculation { id: id.to_string() })
        .collect()
}

/// Runs `wipe(label)` for every label the scenarios write.
pub async fn cleanup<B, F>(repo: &GraphRepository<B>, wipe: F)
where
    B: GraphBackend,
    F: Fn(&str) -> CompiledQuery,
{
    for label in LABELS {
        repo.backend().run(wipe(label)).await.expect("cleanup failed");
    }
}

pub async fn round_trip<B: GraphBackend>(repo: &GraphRepository<B>) {
    let model = ItModel {
        id: "P1".into(),
        name: "Acme".into(),
    };
    repo.upsert_nodes(&[model.clone()]).await.unwrap();

    let entities = repo.get_all_entities::<ItModel>(&id("P1"), &[]).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].node, model);
}

pub async fn upsert_is_idempotent<B: GraphBackend>(repo: &GraphRepository<B>) {
    let first = ItModel {
        id: "P1".into(),
        name: "Acme".into(),
    };
    let renamed = ItModel {
        id: "P1".into(),
        name: "Acme Holdings".into(),
    };
    repo.upsert_nodes(&[first.clone(), first]).await.unwrap();
    repo.upsert_nodes(&[renamed.clone()]).await.unwrap();

    let entities = repo.get_all_entities::<ItModel>(&id("P1"), &[]).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].node, renamed);
}

pub async fn immutable_properties_survive<B: GraphBackend>(repo: &GraphRepository<B>) {
    let original = ItAudited {
        id: "M1".into(),
        createdby: "alice".into(),
        name: "Fund".into(),
    };
    let update = ItAudited {
        createdby: "bob".into(),
        name: "Fund II".into(),
        ..original.clone()
    };
    repo.upsert_nodes(&[original]).await.unwrap();
    repo.upsert_nodes(&[update]).await.unwrap();

    let entities = repo.get_all_entities::<ItAudited>(&id("M1"), &[]).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].node.createdby, "alice");
    assert_eq!(entities[0].node.name, "Fund II");
}

pub async fn relationship_upsert_is_idempotent<B: GraphBackend>(repo: &GraphRepository<B>) {
    repo.upsert_nodes(&calculations(&["A", "B"])).await.unwrap();
    for _ in 0..2 {
        repo.upsert_relationship::<ItCalculation, ItCalculation>("dependsOn", &id("A"), &id("B"))
            .await
            .unwrap();
    }

    let entities = repo
        .get_all_entities::<ItCalculation>(&id("A"), &["dependsOn"])
        .await
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].relationships.len(), 1);

    repo.delete_relationship::<ItCalculation, ItCalculation>("dependsOn", &id("A"), &id("B"))
        .await
        .unwrap();
    let entities = repo
        .get_all_entities::<ItCalculation>(&id("A"), &["dependsOn"])
        .await
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert!(entities[0].relationships.is_empty());
}

pub async fn cycle_is_detected<B: GraphBackend>(repo: &GraphRepository<B>) {
    repo.upsert_nodes(&calculations(&["A", "B", "C", "D"])).await.unwrap();
    let specs = vec![
        RelationshipSpec::new("dependsOn", id("A"), id("B")),
        RelationshipSpec::new("dependsOn", id("B"), id("C")),
        RelationshipSpec::new("dependsOn", id("C"), id("A")),
        RelationshipSpec::new("dependsOn", id("C"), id("D")),
    ];
    repo.upsert_relationships::<ItCalculation, ItCalculation>(&specs)
        .await
        .unwrap();

    let entities = repo
        .get_circular_dependencies::<ItCalculation>("dependsOn", &id("A"))
        .await
        .unwrap();

    let mut ids: Vec<_> = entities.iter().map(|e| e.node.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["A", "B", "C"]);

    let a = entities.iter().find(|e| e.node.id == "A").unwrap();
    let mut pairs: Vec<_> = a
        .relationships
        .iter()
        .map(|r| (r.one["id"].clone(), r.two["id"].clone()))
        .collect();
    pairs.sort_by_key(|(one, _)| one.to_string());
    assert_eq!(
        pairs,
        vec![
            (serde_json::json!("A"), serde_json::json!("B")),
            (serde_json::json!("C"), serde_json::json!("A")),
        ]
    );

    let acyclic = repo
        .get_circular_dependencies::<ItCalculation>("dependsOn", &id("D"))
        .await
        .unwrap();
    assert!(acyclic.is_empty());
}

pub async fn cascade_delete<B: GraphBackend>(repo: &GraphRepository<B>) {
    repo.upsert_nodes(&calculations(&["root", "child", "grandchild", "other"]))
        .await
        .unwrap();
    let specs = vec![
        RelationshipSpec::new("contains", id("root"), id("child")),
        RelationshipSpec::new("contains", id("child"), id("grandchild")),
        RelationshipSpec::new("contains", id("other"), id("root")),
    ];
    repo.upsert_relationships::<ItCalculation, ItCalculation>(&specs)
        .await
        .unwrap();

    repo.delete_node_and_child_nodes::<ItCalculation>(&id("root"))
        .await
        .unwrap();

    for gone in ["root", "child", "grandchild"] {
        let entities = repo
            .get_all_entities::<ItCalculation>(&id(gone), &[])
            .await
            .unwrap();
        assert!(entities.is_empty(), "{} should be deleted", gone);
    }
    let survivors = repo
        .get_all_entities::<ItCalculation>(&id("other"), &["contains"])
        .await
        .unwrap();
    assert_eq!(survivors.len(), 1);
    assert!(survivors[0].relationships.is_empty());
}

pub async fn delete_then_get_is_empty<B: GraphBackend>(repo: &GraphRepository<B>) {
    repo.upsert_nodes(&[ItModel {
        id: "P9".into(),
        name: "Initech".into(),
    }])
    .await
    .unwrap();

    repo.delete_nodes::<ItModel>(&[id("P9")]).await.unwrap();

    let entities = repo.get_all_entities::<ItModel>(&id("P9"), &[]).await.unwrap();
    assert!(entities.is_empty());
}
