// Conversation knowledge graph: messages in, entity graph out

pub mod builder;
pub mod graph;
pub mod graph_exporter;
pub mod message;
pub mod preprocess;

pub use builder::GraphBuilder;
pub use graph::{EntityType, GraphStats, KnowledgeGraph};
pub use graph_exporter::{ExportFormat, GraphExport, GraphExporter};
pub use message::{Message, Role};
pub use preprocess::TextPreprocessor;
