// Graph service: the operations exposed to callers (CLI, web/API layers)
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::conversation::builder::GraphBuilder;
use crate::conversation::graph::KnowledgeGraph;
use crate::conversation::graph_exporter::{ExportFormat, GraphExport, GraphExporter};
use crate::conversation::message::Message;
use crate::error::ServiceError;
use crate::extract::entity::EntityRecognizer;
use crate::store::{validate_conversation_id, GraphStore};

/// Owns the recognizer (built once, reused read-only) and the store
pub struct GraphService {
    builder: Arc<GraphBuilder>,
    store: GraphStore,
}

impl GraphService {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            builder: Arc::new(GraphBuilder::from_config(config)?),
            store: GraphStore::new(config.storage_root.clone()),
        })
    }

    /// Service using `recognizer` instead of the configured one
    pub fn with_recognizer(config: &Config, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self {
            builder: Arc::new(GraphBuilder::with_recognizer(config, recognizer)),
            store: GraphStore::new(config.storage_root.clone()),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Build a graph in memory; nothing is persisted
    pub fn build_graph(&self, conversation_id: &str, messages: &[Message]) -> KnowledgeGraph {
        self.builder.build(conversation_id, messages)
    }

    pub fn save_graph(&self, graph: &KnowledgeGraph, conversation_id: &str) -> Result<(), ServiceError> {
        Ok(self.store.save(graph, conversation_id)?)
    }

    /// `Ok(None)` if never built, deleted or unreadable
    pub fn load_graph(&self, conversation_id: &str) -> Result<Option<KnowledgeGraph>, ServiceError> {
        Ok(self.store.load(conversation_id)?)
    }

    /// Export by format name (`node_link`, `cytoscape`)
    pub fn export_graph(&self, graph: &KnowledgeGraph, format: &str) -> Result<GraphExport, ServiceError> {
        let format: ExportFormat = format.parse()?;
        Ok(GraphExporter::export(graph, format))
    }

    pub fn delete_graph(&self, conversation_id: &str) -> Result<bool, ServiceError> {
        Ok(self.store.delete(conversation_id)?)
    }

    pub fn list_graphs(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.list()?)
    }

    /// Build from scratch and replace whatever is stored for `conversation_id`
    pub fn rebuild(&self, conversation_id: &str, messages: &[Message]) -> Result<KnowledgeGraph, ServiceError> {
        validate_conversation_id(conversation_id)?;
        let graph = self.builder.build(conversation_id, messages);
        self.store.save(&graph, conversation_id)?;
        Ok(graph)
    }

    /// [`rebuild`](Self::rebuild) with a deadline on the build.
    ///
    /// The build runs on a worker thread. If it misses the deadline its result is
    /// discarded and the stored graph is left as it was.
    pub fn rebuild_with_timeout(
        &self,
        conversation_id: &str,
        messages: Vec<Message>,
        timeout: Duration,
    ) -> Result<KnowledgeGraph, ServiceError> {
        validate_conversation_id(conversation_id)?;

        let (tx, rx) = mpsc::channel();
        let builder = Arc::clone(&self.builder);
        let cid = conversation_id.to_string();
        std::thread::spawn(move || {
            let graph = builder.build(&cid, &messages);
            // receiver is gone after a timeout
            let _ = tx.send(graph);
        });

        match rx.recv_timeout(timeout) {
            Ok(graph) => {
                self.store.save(&graph, conversation_id)?;
                info!(conversation_id, "Rebuilt knowledge graph");
                Ok(graph)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(conversation_id, timeout_ms = timeout.as_millis() as u64, "Graph build timed out, stored graph untouched");
                Err(ServiceError::Timeout {
                    conversation_id: conversation_id.to_string(),
                    timeout,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ServiceError::WorkerLost(conversation_id.to_string()))
            }
        }
    }
}
