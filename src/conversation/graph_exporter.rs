// Graph data exporter for visualization clients
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::graph::{KnowledgeGraph, MessageNode};
use crate::error::ExportError;

/// Supported export shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// `{"nodes": [...], "links": [...]}`
    #[default]
    NodeLink,
    /// `{"elements": {"nodes": [...], "edges": [...]}}`
    Cytoscape,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::NodeLink => "node_link",
            ExportFormat::Cytoscape => "cytoscape",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "node_link" | "node-link" | "json" => Ok(ExportFormat::NodeLink),
            "cytoscape" => Ok(ExportFormat::Cytoscape),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node-link node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub attributes: BTreeMap<String, Value>,
}

/// Node-link edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkData {
    pub nodes: Vec<LinkNode>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CytoscapeNodeData {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CytoscapeEdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

/// `{"data": {...}}` wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CytoscapeElements {
    pub nodes: Vec<Element<CytoscapeNodeData>>,
    pub edges: Vec<Element<CytoscapeEdgeData>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CytoscapeData {
    pub elements: CytoscapeElements,
}

/// Exported graph in one of the two shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphExport {
    NodeLink(NodeLinkData),
    Cytoscape(CytoscapeData),
}

impl GraphExport {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save export data to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_json_pretty()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        Ok(())
    }
}

/// Node id of a message in exported graphs
pub fn message_node_id(id: usize) -> String {
    format!("message_{}", id)
}

fn message_name(node: &MessageNode) -> String {
    format!("{} Message {}", node.role.title(), node.id)
}

fn display_or_id<'a>(display_name: &'a str, id: &'a str) -> &'a str {
    if display_name.trim().is_empty() {
        id
    } else {
        display_name
    }
}

pub struct GraphExporter;

impl GraphExporter {
    pub fn export(graph: &KnowledgeGraph, format: ExportFormat) -> GraphExport {
        match format {
            ExportFormat::NodeLink => GraphExport::NodeLink(Self::node_link(graph)),
            ExportFormat::Cytoscape => GraphExport::Cytoscape(Self::cytoscape(graph)),
        }
    }

    /// Export by format name; unknown names are an error, never a silent default
    pub fn export_named(graph: &KnowledgeGraph, format: &str) -> std::result::Result<GraphExport, ExportError> {
        Ok(Self::export(graph, format.parse()?))
    }

    pub fn node_link(graph: &KnowledgeGraph) -> NodeLinkData {
        let mut nodes = Vec::with_capacity(graph.messages.len() + graph.entities.len());

        for message in &graph.messages {
            let mut attributes = BTreeMap::new();
            attributes.insert("role".to_string(), Value::from(message.role.as_str()));
            attributes.insert(
                "content_excerpt".to_string(),
                Value::from(message.content_excerpt.as_str()),
            );
            if let Some(ts) = &message.timestamp {
                attributes.insert("timestamp".to_string(), Value::from(ts.to_rfc3339()));
            }
            nodes.push(LinkNode {
                id: message_node_id(message.id),
                name: message_name(message),
                node_type: "message".to_string(),
                attributes,
            });
        }

        for entity in &graph.entities {
            let mut attributes = entity.attributes.clone();
            attributes.insert("mention_count".to_string(), Value::from(entity.mention_count));
            nodes.push(LinkNode {
                id: entity.id.clone(),
                name: display_or_id(&entity.display_name, &entity.id).to_string(),
                node_type: entity.entity_type.as_str().to_string(),
                attributes,
            });
        }

        let mut links = Vec::with_capacity(graph.mentions.len() + graph.relations.len());
        for mention in &graph.mentions {
            links.push(Link {
                source: message_node_id(mention.message_id),
                target: mention.entity_id.clone(),
                link_type: "mentions".to_string(),
                attributes: BTreeMap::new(),
            });
        }
        for relation in &graph.relations {
            let mut attributes = BTreeMap::new();
            attributes.insert("weight".to_string(), Value::from(relation.weight));
            attributes.insert("confidence".to_string(), Value::from(relation.attributes.confidence));
            attributes.insert("tier".to_string(), Value::from(relation.attributes.tier.as_str()));
            attributes.insert(
                "message_ids".to_string(),
                Value::from(relation.attributes.message_ids.clone()),
            );
            links.push(Link {
                source: relation.source.clone(),
                target: relation.target.clone(),
                link_type: relation.predicate.clone(),
                attributes,
            });
        }

        NodeLinkData { nodes, links }
    }

    pub fn cytoscape(graph: &KnowledgeGraph) -> CytoscapeData {
        let mut nodes = Vec::with_capacity(graph.messages.len() + graph.entities.len());
        for message in &graph.messages {
            nodes.push(Element {
                data: CytoscapeNodeData {
                    id: message_node_id(message.id),
                    label: message_name(message),
                    node_type: "message".to_string(),
                },
            });
        }
        for entity in &graph.entities {
            nodes.push(Element {
                data: CytoscapeNodeData {
                    id: entity.id.clone(),
                    label: display_or_id(&entity.display_name, &entity.id).to_string(),
                    node_type: entity.entity_type.as_str().to_string(),
                },
            });
        }

        let mut edges = Vec::with_capacity(graph.mentions.len() + graph.relations.len());
        let mut push_edge = |source: String, label: &str, target: &str| {
            edges.push(Element {
                data: CytoscapeEdgeData {
                    id: format!("{}|{}|{}", source, label, target),
                    source,
                    target: target.to_string(),
                    label: label.to_string(),
                },
            });
        };
        for mention in &graph.mentions {
            push_edge(message_node_id(mention.message_id), "mentions", &mention.entity_id);
        }
        for relation in &graph.relations {
            push_edge(relation.source.clone(), &relation.predicate, &relation.target);
        }

        CytoscapeData {
            elements: CytoscapeElements { nodes, edges },
        }
    }
}
