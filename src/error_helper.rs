use colored::*;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ServiceError, StoreError};

/// エラーメッセージと解決方法を表示
pub fn print_error_with_help(error_type: &ErrorType) {
    eprintln!("\n{}", "❌ エラーが発生しました".red().bold());
    eprintln!();

    match error_type {
        ErrorType::MessagesNotFound(path) => {
            eprintln!("原因: {} が見つかりません", path.display());
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. パスが正しいか確認:");
            eprintln!("     {}", format!("ls {}", parent_of(path).display()).cyan());
            eprintln!("  2. メッセージJSONは配列か {{\"messages\": [...]}} 形式");
        }
        ErrorType::MessagesMalformed(path, reason) => {
            eprintln!("原因: {} を読み込めません: {}", path.display(), reason);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. 各メッセージに role と content があるか確認");
            eprintln!("  2. JSONの構文を確認:");
            eprintln!("     {}", format!("jq . {}", path.display()).cyan());
        }
        ErrorType::GraphNotFound(conversation_id) => {
            eprintln!("原因: 会話 {} のグラフが保存されていません", conversation_id);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. グラフを作成:");
            eprintln!("     {}", format!("chat-kg build <MESSAGES_JSON> --id {}", conversation_id).cyan());
            eprintln!("  2. 保存済みの会話を確認:");
            eprintln!("     {}", "chat-kg list".cyan());
            eprintln!("  3. 壊れた/古い形式のファイルは読み込み時に無視されます (ログを確認)");
        }
        ErrorType::InvalidConversationId(conversation_id) => {
            eprintln!("原因: 会話ID `{}` は使用できません", conversation_id);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. 英数字で始め、英数字 . _ - のみ、128文字以内");
        }
        ErrorType::ConversationIdCollision(requested, existing) => {
            eprintln!("原因: 会話ID `{}` は保存済みの `{}` と大文字小文字だけが異なります", requested, existing);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. 保存済みのIDをそのまま使う:");
            eprintln!("     {}", format!("chat-kg build <MESSAGES_JSON> --id {}", existing).cyan());
            eprintln!("  2. または別のIDを指定する");
        }
        ErrorType::UnsupportedFormat(format) => {
            eprintln!("原因: エクスポート形式 `{}` は未対応です", format);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. 対応形式: {} / {}", "node_link".cyan(), "cytoscape".cyan());
        }
        ErrorType::StorageUnwritable(path) => {
            eprintln!("原因: {} に書き込めません", path.display());
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. ディレクトリの権限を確認:");
            eprintln!("     {}", format!("ls -ld {}", parent_of(path).display()).cyan());
            eprintln!("  2. 保存先を変更:");
            eprintln!("     {}", "CHAT_KG_PATH=/path/to/dir chat-kg ...".cyan());
        }
        ErrorType::BuildTimeout(conversation_id, secs) => {
            eprintln!("原因: 会話 {} のグラフ構築が {} 秒以内に終わりませんでした", conversation_id, secs);
            eprintln!();
            eprintln!("{}", "💡 解決方法:".yellow().bold());
            eprintln!("  1. 保存済みのグラフは変更されていません");
            eprintln!("  2. タイムアウトを延ばす:");
            eprintln!("     {}", format!("--timeout-secs {}", secs * 2).cyan());
        }
    }
    eprintln!();
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

/// エラーの種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    MessagesNotFound(PathBuf),
    MessagesMalformed(PathBuf, String),
    GraphNotFound(String),
    InvalidConversationId(String),
    ConversationIdCollision(String, String),
    UnsupportedFormat(String),
    StorageUnwritable(PathBuf),
    BuildTimeout(String, u64),
}

impl ErrorType {
    /// Help entry for a service error, if there is one
    pub fn from_service_error(err: &ServiceError) -> Option<Self> {
        match err {
            ServiceError::Store(StoreError::InvalidConversationId(id)) => {
                Some(ErrorType::InvalidConversationId(id.clone()))
            }
            ServiceError::Store(StoreError::IdCollision { requested, existing }) => Some(
                ErrorType::ConversationIdCollision(requested.clone(), existing.clone()),
            ),
            ServiceError::Store(StoreError::Write { path, .. }) => {
                Some(ErrorType::StorageUnwritable(path.clone()))
            }
            ServiceError::Export(ExportError::UnsupportedFormat(format)) => {
                Some(ErrorType::UnsupportedFormat(format.clone()))
            }
            ServiceError::Timeout {
                conversation_id,
                timeout,
            } => Some(ErrorType::BuildTimeout(conversation_id.clone(), timeout.as_secs())),
            _ => None,
        }
    }
}
