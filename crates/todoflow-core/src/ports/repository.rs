//! TodoRepository port - Task Store から見た Storage Adapter
//!
//! ローカル（スロット）とリモート（行ストア）の 2 実装を持ち、
//! 起動時に一度だけ選択されます。

use async_trait::async_trait;

use crate::domain::{StorageResult, Todo, TodoId};

/// TodoRepository は正本の並びを永続化する
///
/// すべての操作は「確定済みの状態」を受け取り、保存だけを行います。
/// 楽観的更新とロールバックは呼び出し側（TodoStore）の責務です。
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// ログ用の名前（"local" / "remote"）
    fn backend(&self) -> &'static str;

    /// 正本の並びで全件を読み出す
    async fn fetch_all(&self) -> StorageResult<Vec<Todo>>;

    /// 列の先頭に追加する
    async fn insert_front(&self, todo: &Todo) -> StorageResult<()>;

    /// パッチ適用後のレコードを書き込む
    async fn update(&self, todo: &Todo) -> StorageResult<()>;

    async fn delete(&self, id: TodoId) -> StorageResult<()>;

    async fn clear_completed(&self) -> StorageResult<()>;

    /// 並び順を丸ごと保存する（列の順に順位を振り直す）
    async fn save_order(&self, todos: &[Todo]) -> StorageResult<()>;
}
