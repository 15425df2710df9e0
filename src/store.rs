// Per-conversation graph persistence
// One JSON file per conversation id under the storage root

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::conversation::graph::{KnowledgeGraph, SCHEMA_VERSION};
use crate::error::StoreError;

/// Format tag written into every persisted record
pub const GRAPH_FORMAT: &str = "chat-kg/graph";

/// On-disk record; `graph` is kept as a value so the checksum is taken over the
/// same canonical JSON on both sides
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: String,
    schema_version: u32,
    conversation_id: String,
    saved_at: DateTime<Utc>,
    checksum: String,
    graph: Value,
}

fn checksum(graph: &Value) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(graph)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn id_regex() -> &'static Regex {
    static ID: OnceLock<Regex> = OnceLock::new();
    ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("id regex is valid"))
}

/// Reject ids that could escape the storage root or collide after normalization
pub fn validate_conversation_id(conversation_id: &str) -> Result<(), StoreError> {
    if id_regex().is_match(conversation_id) && !conversation_id.contains("..") {
        Ok(())
    } else {
        Err(StoreError::InvalidConversationId(conversation_id.to_string()))
    }
}

/// File-backed graph store.
///
/// At most one writer per conversation id at a time; different ids never contend.
pub struct GraphStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GraphStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get storage file path for a conversation
    pub fn path_for(&self, conversation_id: &str) -> Result<PathBuf, StoreError> {
        validate_conversation_id(conversation_id)?;
        Ok(self.root.join(format!("{}.json", conversation_id)))
    }

    /// Run `f` holding the writer lock for `conversation_id`.
    ///
    /// Ids differing only in case share a lock, since they share a file on
    /// case-insensitive filesystems. The entry is dropped once no writer holds it.
    fn with_writer_lock<T>(&self, conversation_id: &str, f: impl FnOnce() -> T) -> T {
        let key = conversation_id.to_ascii_lowercase();
        let lock = self
            .locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);

        let mut locks = self.locks.lock();
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
        result
    }

    /// A stored id equal to `conversation_id` ignoring case, but not identical
    fn case_collision(&self, conversation_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|id| id != conversation_id && id.eq_ignore_ascii_case(conversation_id)))
    }

    /// Persist `graph`, replacing any previous record for `conversation_id`.
    ///
    /// Written to a temp file in the storage root, then renamed over the target.
    pub fn save(&self, graph: &KnowledgeGraph, conversation_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(conversation_id)?;
        if graph.conversation_id != conversation_id {
            return Err(StoreError::ConversationMismatch {
                graph: graph.conversation_id.clone(),
                requested: conversation_id.to_string(),
            });
        }

        let payload = serde_json::to_value(graph)?;
        let envelope = Envelope {
            format: GRAPH_FORMAT.to_string(),
            schema_version: SCHEMA_VERSION,
            conversation_id: conversation_id.to_string(),
            saved_at: Utc::now(),
            checksum: checksum(&payload)?,
            graph: payload,
        };
        let json = serde_json::to_vec(&envelope)?;

        self.with_writer_lock(conversation_id, || -> Result<(), StoreError> {
            if let Some(existing) = self.case_collision(conversation_id)? {
                return Err(StoreError::IdCollision {
                    requested: conversation_id.to_string(),
                    existing,
                });
            }

            let write_err = |source| StoreError::Write {
                path: path.clone(),
                source,
            };
            std::fs::create_dir_all(&self.root).map_err(write_err)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(write_err)?;
            tmp.write_all(&json).map_err(write_err)?;
            tmp.as_file().sync_all().map_err(write_err)?;
            tmp.persist(&path).map_err(|e| write_err(e.error))?;
            Ok(())
        })?;

        info!(
            conversation_id,
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            path = %path.display(),
            "Saved knowledge graph"
        );
        Ok(())
    }

    /// Load the graph for `conversation_id`.
    ///
    /// `Ok(None)` when nothing is stored or the record is unreadable, corrupt,
    /// from another schema version or fails its checksum. Only an invalid id is an error.
    pub fn load(&self, conversation_id: &str) -> Result<Option<KnowledgeGraph>, StoreError> {
        let path = self.path_for(conversation_id)?;

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(conversation_id, "No stored graph");
                return Ok(None);
            }
            Err(e) => {
                warn!(conversation_id, error = %e, path = %path.display(), "Unreadable graph record, treating as absent");
                return Ok(None);
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(conversation_id, error = %e, "Corrupted graph record, treating as absent");
                return Ok(None);
            }
        };

        if envelope.format != GRAPH_FORMAT {
            warn!(conversation_id, format = %envelope.format, "Unknown graph record format, treating as absent");
            return Ok(None);
        }
        if envelope.schema_version != SCHEMA_VERSION {
            warn!(
                conversation_id,
                found = envelope.schema_version,
                expected = SCHEMA_VERSION,
                "Outdated graph schema, treating as absent"
            );
            return Ok(None);
        }
        if envelope.conversation_id != conversation_id {
            warn!(conversation_id, stored = %envelope.conversation_id, "Graph record belongs to another conversation, treating as absent");
            return Ok(None);
        }
        match checksum(&envelope.graph) {
            Ok(sum) if sum == envelope.checksum => {}
            _ => {
                warn!(conversation_id, "Graph checksum mismatch, treating as absent");
                return Ok(None);
            }
        }

        let mut graph: KnowledgeGraph = match serde_json::from_value(envelope.graph) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(conversation_id, error = %e, "Graph payload does not match schema, treating as absent");
                return Ok(None);
            }
        };
        if graph.conversation_id != conversation_id {
            warn!(conversation_id, stored = %graph.conversation_id, "Graph payload belongs to another conversation, treating as absent");
            return Ok(None);
        }

        graph.rebuild_indices();
        Ok(Some(graph))
    }

    /// Remove the stored graph. Returns false if there was none.
    pub fn delete(&self, conversation_id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(conversation_id)?;
        self.with_writer_lock(conversation_id, || match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(conversation_id, "Deleted knowledge graph");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Delete { path: path.clone(), source }),
        })
    }

    pub fn exists(&self, conversation_id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(conversation_id)?.is_file())
    }

    /// Stored conversation ids, sorted
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .filter(|id| validate_conversation_id(id).is_ok())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::graph::{EntityType, InferenceTier, MessageNode};
    use crate::conversation::message::Role;
    use tempfile::TempDir;

    fn sample(conversation_id: &str) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new(conversation_id);
        graph.add_message(MessageNode {
            id: 0,
            role: Role::User,
            content_excerpt: "Alice works at Acme Corp.".to_string(),
            timestamp: None,
        });
        let a = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        let b = graph.record_entity("Acme Corp", EntityType::Organization, "ORG", "heuristic", 0);
        graph.add_mention(0, &a);
        graph.add_mention(0, &b);
        graph.add_relation(&a, "works_at", &b, &[0], InferenceTier::Syntactic);
        graph
    }

    fn store() -> (TempDir, GraphStore) {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::new(dir.path().join("graphs"));
        (dir, store)
    }

    #[test]
    fn test_conversation_id_validation() {
        assert!(validate_conversation_id("chat-2024.01_a").is_ok());
        assert!(validate_conversation_id("").is_err());
        assert!(validate_conversation_id("../etc/passwd").is_err());
        assert!(validate_conversation_id("a/b").is_err());
        assert!(validate_conversation_id("a..b").is_err());
        assert!(validate_conversation_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_round_trip() {
        let (_dir, store) = store();
        let graph = sample("c1");

        store.save(&graph, "c1").unwrap();
        let loaded = store.load("c1").unwrap().unwrap();

        assert_eq!(loaded, graph);
        assert!(loaded.get_entity("person:alice").is_some());
    }

    #[test]
    fn test_missing_graph_is_absent() {
        let (_dir, store) = store();
        assert!(store.load("never-built").unwrap().is_none());
        assert!(!store.exists("never-built").unwrap());
    }

    #[test]
    fn test_corrupted_record_is_absent() {
        let (_dir, store) = store();
        store.save(&sample("c1"), "c1").unwrap();
        let path = store.path_for("c1").unwrap();

        std::fs::write(&path, "{ not json").unwrap();
        assert!(store.load("c1").unwrap().is_none());

        std::fs::write(&path, r#"{"nodes": []}"#).unwrap();
        assert!(store.load("c1").unwrap().is_none());
    }

    #[test]
    fn test_tampered_payload_is_absent() {
        let (_dir, store) = store();
        store.save(&sample("c1"), "c1").unwrap();
        let path = store.path_for("c1").unwrap();

        let mut value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        value["graph"]["entities"][0]["mention_count"] = Value::from(42);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(store.load("c1").unwrap().is_none());
    }

    #[test]
    fn test_outdated_schema_is_absent() {
        let (_dir, store) = store();
        store.save(&sample("c1"), "c1").unwrap();
        let path = store.path_for("c1").unwrap();

        let mut value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        value["schema_version"] = Value::from(SCHEMA_VERSION + 1);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(store.load("c1").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_and_mismatch() {
        let (_dir, store) = store();
        store.save(&sample("c1"), "c1").unwrap();
        store.save(&KnowledgeGraph::new("c1"), "c1").unwrap();
        assert!(store.load("c1").unwrap().unwrap().entities.is_empty());

        let err = store.save(&sample("c2"), "c1").unwrap_err();
        assert!(matches!(err, StoreError::ConversationMismatch { .. }));
        let err = store.save(&sample("../x"), "../x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidConversationId(_)));
    }

    #[test]
    fn test_delete_and_list() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());

        store.save(&sample("b"), "b").unwrap();
        store.save(&sample("a"), "a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.load("a").unwrap().is_none());
        assert_eq!(store.list().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_concurrent_saves_same_id() {
        let (_dir, store) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut graph = sample("shared");
                    graph.add_warning(i, "marker");
                    store.save(&graph, "shared").unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load("shared").unwrap().unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(store.list().unwrap(), vec!["shared".to_string()]);
        assert!(store.locks.lock().is_empty());
    }

    #[test]
    fn test_lock_entries_released() {
        let (_dir, store) = store();
        for i in 0..20 {
            let id = format!("c{}", i);
            store.save(&sample(&id), &id).unwrap();
        }
        assert!(store.delete("c3").unwrap());
        assert!(!store.delete("never-built").unwrap());

        assert!(store.locks.lock().is_empty());
        assert_eq!(store.list().unwrap().len(), 19);
    }

    #[test]
    fn test_ids_differing_in_case_collide() {
        let (_dir, store) = store();
        store.save(&sample("Chat"), "Chat").unwrap();

        let err = store.save(&sample("chat"), "chat").unwrap_err();
        match err {
            StoreError::IdCollision { requested, existing } => {
                assert_eq!(requested, "chat");
                assert_eq!(existing, "Chat");
            }
            other => panic!("unexpected error: {other}"),
        }

        // the original record is untouched and can still be replaced
        assert!(store.load("Chat").unwrap().is_some());
        store.save(&KnowledgeGraph::new("Chat"), "Chat").unwrap();
        assert_eq!(store.list().unwrap(), vec!["Chat".to_string()]);
    }
}
