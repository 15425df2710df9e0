// Knowledge graph builder
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::graph::{EntityId, KnowledgeGraph, MessageNode};
use super::message::Message;
use super::preprocess::TextPreprocessor;
use crate::config::Config;
use crate::extract::entity::{EntityExtractor, EntityRecognizer, ExtractedEntity};
use crate::extract::relation::RelationExtractor;

/// Assembles one [`KnowledgeGraph`] per conversation.
///
/// Holds the recognizer read-only; one builder can serve any number of builds,
/// from any thread.
pub struct GraphBuilder {
    preprocessor: TextPreprocessor,
    entities: EntityExtractor,
    relations: RelationExtractor,
    excerpt_chars: usize,
}

impl GraphBuilder {
    pub fn new(entities: EntityExtractor, relations: RelationExtractor, excerpt_chars: usize) -> Self {
        Self {
            preprocessor: TextPreprocessor::new(),
            entities,
            relations,
            excerpt_chars,
        }
    }

    /// Builder with the recognizer selected in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            EntityExtractor::from_config(config)?,
            RelationExtractor::from_config(config),
            config.excerpt_chars,
        ))
    }

    /// Builder with an explicitly supplied recognizer
    pub fn with_recognizer(config: &Config, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self::new(
            EntityExtractor::new(recognizer, config.max_message_chars),
            RelationExtractor::from_config(config),
            config.excerpt_chars,
        )
    }

    /// Build a fresh graph. Never fails: a message whose extraction fails is skipped
    /// and recorded in `graph.warnings`, its message node is kept.
    pub fn build(&self, conversation_id: &str, messages: &[Message]) -> KnowledgeGraph {
        let prepared = self.preprocessor.prepare(messages);
        let mut graph = KnowledgeGraph::new(conversation_id);
        let recognizer = self.entities.recognizer_name().to_string();

        // (seq, cleaned text, entities) kept for the relation pass
        let mut extracted: Vec<(usize, &str, Vec<ExtractedEntity>)> = Vec::with_capacity(prepared.len());

        for item in &prepared {
            let message = &item.message;
            graph.add_message(MessageNode {
                id: item.seq,
                role: message.role.clone(),
                content_excerpt: excerpt(&message.content, self.excerpt_chars),
                timestamp: message.timestamp,
            });

            match self.entities.extract(&message.content) {
                Ok(found) => {
                    for entity in &found {
                        let id = graph.record_entity(
                            &entity.surface,
                            entity.entity_type,
                            &entity.raw_label,
                            &recognizer,
                            item.seq,
                        );
                        graph.add_mention(item.seq, &id);
                    }
                    debug!(conversation_id, message_id = item.seq, entities = found.len(), "Extracted entities");
                    extracted.push((item.seq, message.content.as_str(), found));
                }
                Err(err) => {
                    warn!(conversation_id, message_id = item.seq, error = %err, "Skipping message");
                    graph.add_warning(item.seq, err.to_string());
                }
            }
        }

        // Relations run once every entity node exists
        for (seq, text, found) in &extracted {
            for relation in self.relations.infer_message(*seq, text, found) {
                graph.add_relation(
                    &relation.source,
                    &relation.predicate,
                    &relation.target,
                    &relation.message_ids,
                    relation.tier,
                );
            }
        }

        if self.relations.window() > 1 {
            let sets: Vec<(usize, Vec<EntityId>)> = extracted
                .iter()
                .map(|(seq, _, found)| {
                    let mut seen = HashSet::new();
                    let ids = found
                        .iter()
                        .map(|e| e.id())
                        .filter(|id| seen.insert(id.clone()))
                        .collect();
                    (*seq, ids)
                })
                .collect();
            for relation in self.relations.infer_window(&sets) {
                graph.add_relation(
                    &relation.source,
                    &relation.predicate,
                    &relation.target,
                    &relation.message_ids,
                    relation.tier,
                );
            }
        }

        info!(
            conversation_id,
            messages = graph.messages.len(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            skipped = graph.warnings.len(),
            "Built knowledge graph"
        );
        graph
    }
}

/// First `max_chars` characters, with "..." when cut
pub fn excerpt(content: &str, max_chars: usize) -> String {
    // 日本語対応：文字数でカット
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
