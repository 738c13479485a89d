//! InMemoryTodoTable - ホスト型 `todos` テーブルの開発用実装
//!
//! # 学習ポイント
//! - 所有者スコープ（row-level security 相当）をすべての操作で強制
//! - 書き込みごとに `updated_at` を Clock で刻印
//! - 障害注入（N 回目以降の書き込みを失敗させる）で部分失敗を再現

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{StorageError, StorageResult, TodoId, TodoRow, UserId};
use crate::ports::{Clock, RowChanges, SystemClock, TodoTable};

struct TableState {
    rows: HashMap<TodoId, TodoRow>,
    /// 成功させる残りの書き込み回数（None = 無制限）
    writes_before_failure: Option<usize>,
    offline: bool,
    writes: usize,
}

impl TableState {
    fn begin_write(&mut self) -> StorageResult<()> {
        if self.offline {
            return Err(StorageError::Unavailable("table is offline".to_string()));
        }
        if let Some(remaining) = self.writes_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(StorageError::Unavailable("injected write failure".to_string()));
            }
            *remaining -= 1;
        }
        self.writes += 1;
        Ok(())
    }

    fn owned_row_mut(&mut self, owner: UserId, id: TodoId) -> StorageResult<&mut TodoRow> {
        let row = self.rows.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        if row.user_id != owner {
            return Err(StorageError::Unauthorized {
                user: owner,
                todo: id,
            });
        }
        Ok(row)
    }
}

/// InMemoryTodoTable はプロセス内の行ストア
///
/// `batched_order` が false の場合、`set_order` は 1 行ずつ順に書き込みます
/// （一括更新を持たないストアの再現）。
pub struct InMemoryTodoTable {
    state: Mutex<TableState>,
    clock: Arc<dyn Clock>,
    batched_order: bool,
}

impl InMemoryTodoTable {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(TableState {
                rows: HashMap::new(),
                writes_before_failure: None,
                offline: false,
                writes: 0,
            }),
            clock,
            batched_order: true,
        }
    }

    /// 一括順序更新を無効にする
    pub fn without_batched_order(mut self) -> Self {
        self.batched_order = false;
        self
    }

    /// `successful_writes` 回の書き込み後、以降の書き込みをすべて失敗させる
    pub async fn fail_writes_after(&self, successful_writes: usize) {
        self.state.lock().await.writes_before_failure = Some(successful_writes);
    }

    /// 読み書きともに失敗させる（ネットワーク断）
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.writes_before_failure = None;
        state.offline = false;
    }

    /// これまでに成功した書き込み回数
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    /// 所有者に関係なく全行を返す（テスト・検査用）
    pub async fn all_rows(&self) -> Vec<TodoRow> {
        self.state.lock().await.rows.values().cloned().collect()
    }
}

impl Default for InMemoryTodoTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoTable for InMemoryTodoTable {
    async fn select_by_owner(&self, owner: UserId) -> StorageResult<Vec<TodoRow>> {
        let state = self.state.lock().await;
        if state.offline {
            return Err(StorageError::Unavailable("table is offline".to_string()));
        }
        let mut rows: Vec<TodoRow> = state
            .rows
            .values()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect();
        // order_index が同値の場合も決定的に並べる
        rows.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn insert(&self, mut row: TodoRow) -> StorageResult<TodoRow> {
        let mut state = self.state.lock().await;
        state.begin_write()?;
        row.updated_at = self.clock.now();
        state.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        owner: UserId,
        id: TodoId,
        changes: RowChanges,
    ) -> StorageResult<TodoRow> {
        let mut state = self.state.lock().await;
        state.owned_row_mut(owner, id)?;
        state.begin_write()?;
        let now = self.clock.now();
        let row = state.owned_row_mut(owner, id)?;
        if let Some(text) = changes.text {
            row.text = text;
        }
        if let Some(completed) = changes.completed {
            row.completed = completed;
        }
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn delete(&self, owner: UserId, id: TodoId) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state.owned_row_mut(owner, id)?;
        state.begin_write()?;
        state.rows.remove(&id);
        Ok(())
    }

    async fn delete_completed(&self, owner: UserId) -> StorageResult<usize> {
        let mut state = self.state.lock().await;
        state.begin_write()?;
        let before = state.rows.len();
        state
            .rows
            .retain(|_, row| !(row.user_id == owner && row.completed));
        Ok(before - state.rows.len())
    }

    async fn set_order_index(
        &self,
        owner: UserId,
        id: TodoId,
        order_index: i64,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state.owned_row_mut(owner, id)?;
        state.begin_write()?;
        let now = self.clock.now();
        let row = state.owned_row_mut(owner, id)?;
        row.order_index = order_index;
        row.updated_at = now;
        Ok(())
    }

    async fn set_order(&self, owner: UserId, order: &[(TodoId, i64)]) -> StorageResult<()> {
        if !self.batched_order {
            for (id, order_index) in order {
                self.set_order_index(owner, *id, *order_index).await?;
            }
            return Ok(());
        }

        // 一括更新: 全行を検証してから 1 回の書き込みとして適用する
        let mut state = self.state.lock().await;
        for (id, _) in order {
            state.owned_row_mut(owner, *id)?;
        }
        state.begin_write()?;
        let now = self.clock.now();
        for (id, order_index) in order {
            let row = state.owned_row_mut(owner, *id)?;
            row.order_index = *order_index;
            row.updated_at = now;
        }
        Ok(())
    }
}
