//! TodoTable port - リモートの行ストア（ホスト型 DB の `todos` テーブル）
//!
//! すべての操作は所有者（`user_id`）でスコープされます。
//! 他人の行は見えず、書き込めません。

use async_trait::async_trait;

use crate::domain::{StorageResult, TodoId, TodoRow, UserId};

/// 更新可能な列（`updated_at` はテーブル側が刻印する）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

/// TodoTable は所有者単位の行操作を提供
///
/// # 設計原則
/// - 読み出しは `order_index` 昇順
/// - 書き込みごとに `updated_at` を更新
/// - `set_order` は一括更新。一括更新を持たない実装では既定実装が
///   `set_order_index` を 1 行ずつ順に呼ぶため、途中失敗で順序が混在しうる
#[async_trait]
pub trait TodoTable: Send + Sync {
    async fn select_by_owner(&self, owner: UserId) -> StorageResult<Vec<TodoRow>>;

    async fn insert(&self, row: TodoRow) -> StorageResult<TodoRow>;

    async fn update(
        &self,
        owner: UserId,
        id: TodoId,
        changes: RowChanges,
    ) -> StorageResult<TodoRow>;

    async fn delete(&self, owner: UserId, id: TodoId) -> StorageResult<()>;

    /// Returns the number of deleted rows.
    async fn delete_completed(&self, owner: UserId) -> StorageResult<usize>;

    async fn set_order_index(
        &self,
        owner: UserId,
        id: TodoId,
        order_index: i64,
    ) -> StorageResult<()>;

    async fn set_order(&self, owner: UserId, order: &[(TodoId, i64)]) -> StorageResult<()> {
        for (id, order_index) in order {
            self.set_order_index(owner, *id, *order_index).await?;
        }
        Ok(())
    }

    async fn min_order_index(&self, owner: UserId) -> StorageResult<Option<i64>> {
        let rows = self.select_by_owner(owner).await?;
        Ok(rows.iter().map(|r| r.order_index).min())
    }
}
