// End-to-end: messages file -> service -> store -> export
use chat_kg::conversation::message::parse_messages;
use chat_kg::{Config, GraphService};
use serde_json::json;
use tempfile::TempDir;

fn service(dir: &TempDir) -> GraphService {
    let config = Config {
        storage_root: dir.path().join("graphs"),
        ..Config::default()
    };
    GraphService::new(&config).unwrap()
}

#[test]
fn test_alice_works_at_acme() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let messages = parse_messages(r#"[{"role":"user","content":"Alice works at Acme Corp."}]"#).unwrap();

    let graph = service.build_graph("conv-1", &messages);
    assert_eq!(graph.messages.len(), 1);
    assert_eq!(graph.entities.len(), 2);
    assert_eq!(graph.mentions.len(), 2);
    assert_eq!(graph.relations.len(), 1);

    let relation = &graph.relations[0];
    assert_eq!(relation.source, "person:alice");
    assert_eq!(relation.target, "organization:acme corp");
    assert_eq!(relation.predicate, "works_at");

    service.save_graph(&graph, "conv-1").unwrap();
    let loaded = service.load_graph("conv-1").unwrap().unwrap();
    assert_eq!(loaded, graph);

    let export = service.export_graph(&loaded, "node_link").unwrap().to_value().unwrap();
    let links = export["links"].as_array().unwrap();
    assert_eq!(links.len(), 3);
    assert_eq!(
        links[2],
        json!({
            "source": "person:alice",
            "target": "organization:acme corp",
            "type": "works_at",
            "attributes": {
                "confidence": 0.8,
                "message_ids": [0],
                "tier": "syntactic",
                "weight": 1
            }
        })
    );
}

#[test]
fn test_no_entities_gives_message_only_graph() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let messages = parse_messages(
        r#"{"messages": [
            {"role": "user", "content": "how are you doing?"},
            {"role": "assistant", "content": "doing well, thanks for asking"}
        ]}"#,
    )
    .unwrap();

    let graph = service.rebuild("quiet", &messages).unwrap();
    assert_eq!(graph.messages.len(), 2);
    assert!(graph.entities.is_empty());
    assert!(graph.relations.is_empty());

    let cytoscape = service.export_graph(&graph, "cytoscape").unwrap().to_value().unwrap();
    assert_eq!(cytoscape["elements"]["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(cytoscape["elements"]["edges"], json!([]));

    let node_link = service.export_graph(&graph, "node_link").unwrap().to_value().unwrap();
    assert_eq!(node_link["links"], json!([]));
    assert_eq!(node_link["nodes"][1]["name"], "Assistant Message 1");
}

#[test]
fn test_empty_graph_export_shapes() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let graph = service.build_graph("empty", &[]);

    assert_eq!(
        service.export_graph(&graph, "node_link").unwrap().to_value().unwrap(),
        json!({"nodes": [], "links": []})
    );
    assert_eq!(
        service.export_graph(&graph, "cytoscape").unwrap().to_value().unwrap(),
        json!({"elements": {"nodes": [], "edges": []}})
    );
    assert!(service.export_graph(&graph, "graphml").is_err());
}

#[test]
fn test_never_built_is_absent() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    assert!(service.load_graph("never-built").unwrap().is_none());
    assert!(service.list_graphs().unwrap().is_empty());
}

#[test]
fn test_corrupted_file_loads_as_absent() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service
        .rebuild("conv-1", &parse_messages(r#"[{"role":"user","content":"Bob lives in Paris"}]"#).unwrap())
        .unwrap();

    let path = service.store().path_for("conv-1").unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, &content[..content.len() / 2]).unwrap();

    assert!(service.load_graph("conv-1").unwrap().is_none());
}

#[test]
fn test_rebuild_replaces_stored_graph() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let first = parse_messages(r#"[{"role":"user","content":"Alice works at Acme Corp."}]"#).unwrap();
    let second = parse_messages(
        r#"[
            {"role":"user","content":"Alice works at Acme Corp.","timestamp":"2024-12-02T10:00:00Z"},
            {"role":"assistant","content":"Alice works at Acme Corp. Got it."}
        ]"#,
    )
    .unwrap();

    service.rebuild("conv-1", &first).unwrap();
    service.rebuild("conv-1", &second).unwrap();

    let loaded = service.load_graph("conv-1").unwrap().unwrap();
    assert_eq!(loaded.messages.len(), 2);
    assert!(loaded.messages[0].timestamp.is_some());
    assert_eq!(loaded.get_entity("person:alice").unwrap().mention_count, 2);

    // same triple inferred twice -> one edge, weight 2
    assert_eq!(loaded.relations.len(), 1);
    assert_eq!(loaded.relations[0].weight, 2);
    assert_eq!(loaded.relations[0].attributes.message_ids, vec![0, 1]);
}
