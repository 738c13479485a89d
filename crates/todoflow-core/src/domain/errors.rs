//! Errors - エラー型と分類
//!
//! ストレージ層のエラーは TodoStore の境界で捕捉され、ログに記録されます。
//! 表示層（UI）には届きません。

use thiserror::Error;

use super::ids::{TodoId, UserId};

/// ErrorKind はエラーの運用分類
///
/// - NotFound: 対象が存在しない（古い ID）
/// - Persistence: 保存先の障害（I/O, ネットワーク, シリアライズ）
/// - Unauthorized: 所有者以外の行へのアクセス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Persistence,
    Unauthorized,
}

/// StorageError は Storage Adapter が返すエラー
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("todo not found: {0}")]
    NotFound(TodoId),

    #[error("{user} may not access {todo}")]
    Unauthorized { user: UserId, todo: TodoId },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Unauthorized { .. } => ErrorKind::Unauthorized,
            StorageError::Unavailable(_)
            | StorageError::Io(_)
            | StorageError::Json(_)
            | StorageError::Join(_) => ErrorKind::Persistence,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
