// Knowledge graph data structures
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::message::Role;

/// Bumped whenever the persisted shape of [`KnowledgeGraph`] changes
pub const SCHEMA_VERSION: u32 = 1;

/// Predicate used when no specific relation pattern fires
pub const DEFAULT_PREDICATE: &str = "related_to";

pub type EntityId = String;

/// Fixed entity taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Concept,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Organization => "organization",
            EntityType::Location => "location",
            EntityType::Concept => "concept",
            EntityType::Unknown => "unknown",
        }
    }

    /// Map a raw NER label into the taxonomy. Unmapped labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERSON" | "PER" => EntityType::Person,
            "ORG" | "ORGANIZATION" => EntityType::Organization,
            "GPE" | "LOC" | "LOCATION" | "FAC" => EntityType::Location,
            "NORP" | "PRODUCT" | "EVENT" | "WORK_OF_ART" | "LAW" | "LANGUAGE" => {
                EntityType::Concept
            }
            _ => EntityType::Unknown,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and whitespace-collapse a surface span
pub fn canonicalize(surface: &str) -> String {
    surface
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic entity id for a (surface form, type) pair, e.g. `person:alice`
pub fn entity_id(surface: &str, entity_type: EntityType) -> EntityId {
    format!("{}:{}", entity_type.as_str(), canonicalize(surface))
}

/// Entity node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: EntityId,
    pub display_name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub mention_count: usize,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Message node, one per input message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageNode {
    /// Sequence index within the conversation
    pub id: usize,
    pub role: Role,
    pub content_excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// Message → entity; at most one per pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEdge {
    pub message_id: usize,
    pub entity_id: EntityId,
}

/// How a relation was inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceTier {
    /// Verb phrase linking the two spans
    Syntactic,
    /// Same message, no linking phrase
    CoOccurrence,
    /// Adjacent messages only
    Window,
}

impl InferenceTier {
    pub fn confidence(&self) -> f64 {
        match self {
            InferenceTier::Syntactic => 0.8,
            InferenceTier::CoOccurrence => 0.5,
            InferenceTier::Window => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceTier::Syntactic => "syntactic",
            InferenceTier::CoOccurrence => "co_occurrence",
            InferenceTier::Window => "window",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationAttributes {
    /// Supporting messages, sorted and unique
    pub message_ids: Vec<usize>,
    pub confidence: f64,
    pub tier: InferenceTier,
}

/// Entity → entity; unique per (source, target, predicate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source: EntityId,
    pub target: EntityId,
    pub predicate: String,
    /// Number of times the triple was inferred
    pub weight: u32,
    pub attributes: RelationAttributes,
}

/// A message whose extraction was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWarning {
    pub message_id: usize,
    pub reason: String,
}

type TripleKey = (EntityId, EntityId, String);

/// Knowledge graph for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub schema_version: u32,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageNode>,
    pub entities: Vec<EntityNode>,
    pub mentions: Vec<MentionEdge>,
    pub relations: Vec<RelationEdge>,
    #[serde(default)]
    pub warnings: Vec<BuildWarning>,

    #[serde(skip)]
    entity_index: HashMap<EntityId, usize>,
    #[serde(skip)]
    mention_index: HashSet<(usize, EntityId)>,
    #[serde(skip)]
    relation_index: HashMap<TripleKey, usize>,
}

impl KnowledgeGraph {
    /// Create an empty graph owned by `conversation_id`
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            conversation_id: conversation_id.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
            entities: Vec::new(),
            mentions: Vec::new(),
            relations: Vec::new(),
            warnings: Vec::new(),
            entity_index: HashMap::new(),
            mention_index: HashSet::new(),
            relation_index: HashMap::new(),
        }
    }

    /// Rebuild lookup indices; required after deserialization
    pub fn rebuild_indices(&mut self) {
        self.entity_index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        self.mention_index = self
            .mentions
            .iter()
            .map(|m| (m.message_id, m.entity_id.clone()))
            .collect();
        self.relation_index = self
            .relations
            .iter()
            .enumerate()
            .map(|(i, r)| ((r.source.clone(), r.target.clone(), r.predicate.clone()), i))
            .collect();
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.entities.is_empty()
    }

    pub fn add_message(&mut self, node: MessageNode) {
        self.messages.push(node);
    }

    pub fn add_warning(&mut self, message_id: usize, reason: impl Into<String>) {
        self.warnings.push(BuildWarning {
            message_id,
            reason: reason.into(),
        });
    }

    /// Add an entity occurrence.
    ///
    /// A recurring canonical key reuses the existing node and bumps `mention_count`.
    /// Returns the entity id.
    pub fn record_entity(
        &mut self,
        surface: &str,
        entity_type: EntityType,
        raw_label: &str,
        recognizer: &str,
        message_id: usize,
    ) -> EntityId {
        let id = entity_id(surface, entity_type);

        if let Some(&idx) = self.entity_index.get(&id) {
            let node = &mut self.entities[idx];
            node.mention_count += 1;
            push_unique(&mut node.attributes, "surface_forms", surface);
            push_unique(&mut node.attributes, "raw_labels", raw_label);
            return id;
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("first_message".to_string(), Value::from(message_id));
        attributes.insert("recognizer".to_string(), Value::from(recognizer));
        push_unique(&mut attributes, "surface_forms", surface);
        push_unique(&mut attributes, "raw_labels", raw_label);

        self.entity_index.insert(id.clone(), self.entities.len());
        self.entities.push(EntityNode {
            id: id.clone(),
            display_name: surface.split_whitespace().collect::<Vec<_>>().join(" "),
            entity_type,
            mention_count: 1,
            attributes,
        });
        id
    }

    /// Add a mention edge unless the pair already has one. Returns true if added.
    pub fn add_mention(&mut self, message_id: usize, entity_id: &str) -> bool {
        if !self.entity_index.contains_key(entity_id) {
            return false;
        }
        if !self.mention_index.insert((message_id, entity_id.to_string())) {
            return false;
        }
        self.mentions.push(MentionEdge {
            message_id,
            entity_id: entity_id.to_string(),
        });
        true
    }

    /// Add or merge a relation edge.
    ///
    /// Self-relations and unknown endpoints are ignored. A repeated triple increments
    /// `weight`, merges the supporting messages and keeps the higher confidence.
    /// Returns true if a new edge was created.
    pub fn add_relation(
        &mut self,
        source: &str,
        predicate: &str,
        target: &str,
        message_ids: &[usize],
        tier: InferenceTier,
    ) -> bool {
        if source == target
            || !self.entity_index.contains_key(source)
            || !self.entity_index.contains_key(target)
        {
            return false;
        }

        let key = (source.to_string(), target.to_string(), predicate.to_string());
        if let Some(&idx) = self.relation_index.get(&key) {
            let edge = &mut self.relations[idx];
            edge.weight += 1;
            for &message_id in message_ids {
                if let Err(pos) = edge.attributes.message_ids.binary_search(&message_id) {
                    edge.attributes.message_ids.insert(pos, message_id);
                }
            }
            if tier.confidence() > edge.attributes.confidence {
                edge.attributes.confidence = tier.confidence();
                edge.attributes.tier = tier;
            }
            return false;
        }

        let mut supporting = message_ids.to_vec();
        supporting.sort_unstable();
        supporting.dedup();

        self.relation_index.insert(key, self.relations.len());
        self.relations.push(RelationEdge {
            source: source.to_string(),
            target: target.to_string(),
            predicate: predicate.to_string(),
            weight: 1,
            attributes: RelationAttributes {
                message_ids: supporting,
                confidence: tier.confidence(),
                tier,
            },
        });
        true
    }

    pub fn get_entity(&self, id: &str) -> Option<&EntityNode> {
        self.entity_index.get(id).map(|&i| &self.entities[i])
    }

    pub fn get_relation(&self, source: &str, predicate: &str, target: &str) -> Option<&RelationEdge> {
        let key = (source.to_string(), target.to_string(), predicate.to_string());
        self.relation_index.get(&key).map(|&i| &self.relations[i])
    }

    /// Entities linked to `id` by any relation edge, in edge order
    pub fn get_related_entities(&self, id: &str) -> Vec<&EntityNode> {
        let mut seen = HashSet::new();
        self.relations
            .iter()
            .filter_map(|r| {
                if r.source == id {
                    Some(r.target.as_str())
                } else if r.target == id {
                    Some(r.source.as_str())
                } else {
                    None
                }
            })
            .filter(|other| seen.insert(*other))
            .filter_map(|other| self.get_entity(other))
            .collect()
    }

    /// Entity ids mentioned in a message, in mention order
    pub fn entities_in_message(&self, message_id: usize) -> Vec<&str> {
        self.mentions
            .iter()
            .filter(|m| m.message_id == message_id)
            .map(|m| m.entity_id.as_str())
            .collect()
    }

    /// Calculate statistics
    pub fn stats(&self) -> GraphStats {
        let mut entities_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for entity in &self.entities {
            *entities_by_type
                .entry(entity.entity_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut top: Vec<&EntityNode> = self.entities.iter().collect();
        // mention_count desc, then first-seen order
        top.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        let top_entities = top
            .into_iter()
            .take(10)
            .map(|e| (e.display_name.clone(), e.mention_count))
            .collect();

        let avg_relations_per_entity = if self.entities.is_empty() {
            0.0
        } else {
            self.relations.len() as f32 / self.entities.len() as f32
        };

        GraphStats {
            total_messages: self.messages.len(),
            total_entities: self.entities.len(),
            total_mentions: self.mentions.len(),
            total_relations: self.relations.len(),
            skipped_messages: self.warnings.len(),
            entities_by_type,
            top_entities,
            avg_relations_per_entity,
        }
    }
}

fn push_unique(attributes: &mut BTreeMap<String, Value>, key: &str, value: &str) {
    let entry = attributes
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
        if !items.iter().any(|v| v.as_str() == Some(value)) {
            items.push(Value::from(value));
        }
    }
}

/// Graph statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_messages: usize,
    pub total_entities: usize,
    pub total_mentions: usize,
    pub total_relations: usize,
    pub skipped_messages: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub top_entities: Vec<(String, usize)>,
    pub avg_relations_per_entity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: usize) -> MessageNode {
        MessageNode {
            id,
            role: Role::User,
            content_excerpt: "Hello".to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_entity_id_is_canonical() {
        assert_eq!(entity_id("Acme   Corp", EntityType::Organization), "organization:acme corp");
        assert_eq!(
            entity_id("ACME corp", EntityType::Organization),
            entity_id(" Acme Corp ", EntityType::Organization)
        );
        assert_ne!(
            entity_id("Jordan", EntityType::Person),
            entity_id("Jordan", EntityType::Location)
        );
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(EntityType::from_label("PERSON"), EntityType::Person);
        assert_eq!(EntityType::from_label("org"), EntityType::Organization);
        assert_eq!(EntityType::from_label("GPE"), EntityType::Location);
        assert_eq!(EntityType::from_label("PRODUCT"), EntityType::Concept);
        assert_eq!(EntityType::from_label("CARDINAL"), EntityType::Unknown);
        assert_eq!(EntityType::from_label(""), EntityType::Unknown);
    }

    #[test]
    fn test_record_entity_reuses_node() {
        let mut graph = KnowledgeGraph::new("c1");
        graph.add_message(message(0));

        let a = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        let b = graph.record_entity("alice", EntityType::Person, "PER", "heuristic", 1);

        assert_eq!(a, b);
        assert_eq!(graph.entities.len(), 1);
        let node = graph.get_entity(&a).unwrap();
        assert_eq!(node.mention_count, 2);
        assert_eq!(node.display_name, "Alice");
        assert_eq!(node.attributes["surface_forms"].as_array().unwrap().len(), 2);
        assert_eq!(node.attributes["first_message"], Value::from(0));
    }

    #[test]
    fn test_mentions_deduplicated_per_message() {
        let mut graph = KnowledgeGraph::new("c1");
        let id = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);

        assert!(graph.add_mention(0, &id));
        assert!(!graph.add_mention(0, &id));
        assert!(graph.add_mention(1, &id));
        assert!(!graph.add_mention(1, "person:nobody"));
        assert_eq!(graph.mentions.len(), 2);
    }

    #[test]
    fn test_relation_merge_increments_weight() {
        let mut graph = KnowledgeGraph::new("c1");
        let a = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        let b = graph.record_entity("Acme Corp", EntityType::Organization, "ORG", "heuristic", 0);

        assert!(graph.add_relation(&a, DEFAULT_PREDICATE, &b, &[2], InferenceTier::CoOccurrence));
        assert!(!graph.add_relation(&a, DEFAULT_PREDICATE, &b, &[0], InferenceTier::Syntactic));
        assert!(!graph.add_relation(&a, DEFAULT_PREDICATE, &b, &[2], InferenceTier::Window));
        assert!(!graph.add_relation(&a, "works_at", &a, &[0], InferenceTier::Syntactic));

        assert_eq!(graph.relations.len(), 1);
        let edge = graph.get_relation(&a, DEFAULT_PREDICATE, &b).unwrap();
        assert_eq!(edge.weight, 3);
        assert_eq!(edge.attributes.message_ids, vec![0, 2]);
        assert_eq!(edge.attributes.confidence, 0.8);
        assert_eq!(edge.attributes.tier, InferenceTier::Syntactic);
    }

    #[test]
    fn test_indices_survive_serde() {
        let mut graph = KnowledgeGraph::new("c1");
        graph.add_message(message(0));
        let a = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        let b = graph.record_entity("Bob", EntityType::Person, "PERSON", "heuristic", 0);
        graph.add_mention(0, &a);
        graph.add_relation(&a, "knows", &b, &[0], InferenceTier::Syntactic);

        let json = serde_json::to_string(&graph).unwrap();
        let mut loaded: KnowledgeGraph = serde_json::from_str(&json).unwrap();
        loaded.rebuild_indices();

        assert_eq!(loaded, graph);
        assert!(loaded.get_entity(&b).is_some());
        assert_eq!(loaded.get_related_entities(&a)[0].id, b);
    }

    #[test]
    fn test_stats() {
        let mut graph = KnowledgeGraph::new("c1");
        assert_eq!(graph.stats().avg_relations_per_entity, 0.0);

        graph.add_message(message(0));
        let a = graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        graph.record_entity("Alice", EntityType::Person, "PERSON", "heuristic", 0);
        let b = graph.record_entity("Paris", EntityType::Location, "GPE", "heuristic", 0);
        graph.add_relation(&a, DEFAULT_PREDICATE, &b, &[0], InferenceTier::CoOccurrence);

        let stats = graph.stats();
        assert_eq!(stats.total_messages, 1);
        assert_eq!(stats.total_entities, 2);
        assert_eq!(stats.entities_by_type["person"], 1);
        assert_eq!(stats.top_entities[0], ("Alice".to_string(), 2));
        assert_eq!(stats.avg_relations_per_entity, 0.5);
    }
}
