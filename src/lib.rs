// chat-kgライブラリのエントリポイント
// CLIやWeb/APIレイヤーから使用するためのモジュールを公開

pub mod config;
pub mod error;
pub mod error_helper;
pub mod logging;

// 会話 → ナレッジグラフ
pub mod conversation;
pub mod extract;

// 永続化とサービス
pub mod service;
pub mod store;

// 再エクスポート
pub use config::{Config, RecognizerKind};
pub use conversation::{ExportFormat, GraphBuilder, GraphExporter, KnowledgeGraph, Message};
pub use error::{ExportError, ExtractionError, ServiceError, StoreError};
pub use service::GraphService;
pub use store::GraphStore;
