//! LocalTodoRepository - `"todos"` スロットに列全体を保存する Storage Adapter
//!
//! 並び順は配列の位置そのものなので、順位キーは持ちません。
//! 各操作はスロットを読み、変更し、丸ごと書き戻します。

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{StorageResult, Todo, TodoId};
use crate::ports::{KeyValueStore, TODOS_KEY, TodoRepository, load_slot, save_slot};

pub struct LocalTodoRepository {
    store: Arc<dyn KeyValueStore>,
}

impl LocalTodoRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read(&self) -> StorageResult<Vec<Todo>> {
        Ok(load_slot(self.store.as_ref(), TODOS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn write(&self, todos: &[Todo]) -> StorageResult<()> {
        save_slot(self.store.as_ref(), TODOS_KEY, todos).await
    }
}

#[async_trait]
impl TodoRepository for LocalTodoRepository {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Todo>> {
        self.read().await
    }

    async fn insert_front(&self, todo: &Todo) -> StorageResult<()> {
        let mut todos = self.read().await?;
        todos.insert(0, todo.clone());
        self.write(&todos).await
    }

    async fn update(&self, todo: &Todo) -> StorageResult<()> {
        let mut todos = self.read().await?;
        match todos.iter_mut().find(|t| t.id == todo.id) {
            Some(slot) => *slot = todo.clone(),
            None => return Ok(()),
        }
        self.write(&todos).await
    }

    async fn delete(&self, id: TodoId) -> StorageResult<()> {
        let mut todos = self.read().await?;
        todos.retain(|t| t.id != id);
        self.write(&todos).await
    }

    async fn clear_completed(&self) -> StorageResult<()> {
        let mut todos = self.read().await?;
        todos.retain(|t| !t.completed);
        self.write(&todos).await
    }

    async fn save_order(&self, todos: &[Todo]) -> StorageResult<()> {
        self.write(todos).await
    }
}
