//! RemoteTodoRepository - 所有者に束縛された行ストア版の Storage Adapter
//!
//! # 順位キー
//! - 新規行は先頭に入るので `order_index = 現在の最小値 - 1`
//! - 並べ替えでは列の順に `0..n` を振り直す（一括更新）
//!
//! # 消えた行
//! 別の端末で先に削除された行への更新・削除は、目的が達成済みとして成功扱い

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{ErrorKind, StorageResult, Todo, TodoId, TodoRow, UserId};
use crate::ports::{RowChanges, TodoRepository, TodoTable};

pub struct RemoteTodoRepository {
    table: Arc<dyn TodoTable>,
    owner: UserId,
}

impl RemoteTodoRepository {
    pub fn new(table: Arc<dyn TodoTable>, owner: UserId) -> Self {
        Self { table, owner }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    fn already_gone(&self, op: &str, id: TodoId, result: StorageResult<()>) -> StorageResult<()> {
        match result {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(op, owner = %self.owner, %id, "row already removed elsewhere");
                Ok(())
            }
            other => other,
        }
    }
}

#[async_trait]
impl TodoRepository for RemoteTodoRepository {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Todo>> {
        let rows = self.table.select_by_owner(self.owner).await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn insert_front(&self, todo: &Todo) -> StorageResult<()> {
        let order_index = self
            .table
            .min_order_index(self.owner)
            .await?
            .map_or(0, |min| min - 1);
        self.table
            .insert(TodoRow::from_todo(todo, self.owner, order_index))
            .await?;
        Ok(())
    }

    async fn update(&self, todo: &Todo) -> StorageResult<()> {
        let changes = RowChanges {
            text: Some(todo.text.clone()),
            completed: Some(todo.completed),
        };
        let result = self.table.update(self.owner, todo.id, changes).await;
        self.already_gone("update", todo.id, result.map(|_| ()))
    }

    async fn delete(&self, id: TodoId) -> StorageResult<()> {
        let result = self.table.delete(self.owner, id).await;
        self.already_gone("delete", id, result)
    }

    async fn clear_completed(&self) -> StorageResult<()> {
        let removed = self.table.delete_completed(self.owner).await?;
        tracing::debug!(owner = %self.owner, removed, "cleared completed rows");
        Ok(())
    }

    async fn save_order(&self, todos: &[Todo]) -> StorageResult<()> {
        let order: Vec<(TodoId, i64)> = todos
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i as i64))
            .collect();
        self.table.set_order(self.owner, &order).await
    }
}
