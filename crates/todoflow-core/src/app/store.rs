//! TodoStore - 正本の並びを保持し、保存先との間を仲介する
//!
//! # 楽観的更新
//! 1. メモリ上の正本を即座に変更する（表示は保存完了を待たない）
//! 2. Storage Adapter に保存を依頼する
//! 3. 失敗したらログに記録する。並べ替えは必ず再取得でロールバックする
//!    （1 行ずつの順位更新が途中まで反映されている可能性があるため）
//!
//! エラーはこの境界で捕捉され、呼び出し側には `SyncOutcome` だけが返ります。
//!
//! # 並行性
//! 単一ユーザー・単一クライアント前提。保存待ちの間も、後続の操作は
//! 楽観的に更新された状態を参照します。再取得にも失敗した場合の復元は、
//! その間に並びが変わっていないときだけ行います。

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::backend::Backend;
use crate::config::RollbackPolicy;
use crate::domain::{
    DragGesture, ReorderError, Reordered, StorageResult, Todo, TodoFilter, TodoId, TodoPatch,
    TodoStats, filter_todos, reorder,
};
use crate::ports::{AuthSession, Clock, IdGenerator, StorageChange, TODOS_KEY, TodoRepository};

/// What happened to a mutation after the optimistic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Rejected or no-op; nothing changed and nothing was persisted.
    Unchanged,
    /// Applied and persisted.
    Persisted,
    /// Persistence failed; the optimistic state was kept (and logged).
    PersistFailed,
    /// Persistence failed; state was re-read from the store.
    RolledBack,
}

/// A successfully created todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Added {
    pub id: TodoId,
    pub outcome: SyncOutcome,
}

pub struct TodoStore {
    todos: RwLock<Vec<Todo>>,
    /// `None` = サインアウト中（空の集合・保存なし）
    repository: RwLock<Option<Arc<dyn TodoRepository>>>,
    backend: Backend,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    rollback: RollbackPolicy,
}

impl TodoStore {
    /// Detached store; call [`TodoStore::attach`] or [`TodoStore::sync_session`] to load.
    pub fn new(
        backend: Backend,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        rollback: RollbackPolicy,
    ) -> Self {
        Self {
            todos: RwLock::new(Vec::new()),
            repository: RwLock::new(None),
            backend,
            clock,
            ids,
            rollback,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn rollback_policy(&self) -> RollbackPolicy {
        self.rollback
    }

    // =========================================================================
    // Session / loading
    // =========================================================================

    /// Bind to the session's current user and load their todos.
    pub async fn sync_session(&self, session: &dyn AuthSession) -> SyncOutcome {
        let repository = self.backend.repository_for(session.current_user());
        self.attach(repository).await
    }

    /// Sign out through the session and drop every todo from memory.
    pub async fn sign_out(&self, session: &dyn AuthSession) {
        session.sign_out().await;
        self.attach(self.backend.repository_for(None)).await;
    }

    /// Replace the Storage Adapter and load from it.
    pub async fn attach(&self, repository: Option<Arc<dyn TodoRepository>>) -> SyncOutcome {
        *self.repository.write().await = repository;
        self.refresh().await
    }

    /// Re-read the authoritative state.
    pub async fn refresh(&self) -> SyncOutcome {
        let Some(repository) = self.repository().await else {
            self.todos.write().await.clear();
            return SyncOutcome::Unchanged;
        };
        match repository.fetch_all().await {
            Ok(todos) => {
                tracing::debug!(backend = repository.backend(), count = todos.len(), "loaded todos");
                *self.todos.write().await = todos;
                SyncOutcome::Persisted
            }
            Err(e) => {
                tracing::error!(
                    backend = repository.backend(),
                    kind = ?e.kind(),
                    error = %e,
                    "failed to load todos"
                );
                SyncOutcome::PersistFailed
            }
        }
    }

    /// Storage callback: another writer changed a slot.
    pub async fn on_storage_change(&self, change: &StorageChange) -> SyncOutcome {
        if change.key != TODOS_KEY {
            return SyncOutcome::Unchanged;
        }
        self.refresh().await
    }

    pub async fn is_attached(&self) -> bool {
        self.repository.read().await.is_some()
    }

    async fn repository(&self) -> Option<Arc<dyn TodoRepository>> {
        self.repository.read().await.clone()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Canonical sequence.
    pub async fn todos(&self) -> Vec<Todo> {
        self.todos.read().await.clone()
    }

    pub async fn filtered(&self, filter: TodoFilter) -> Vec<Todo> {
        filter_todos(&self.todos.read().await, filter)
    }

    pub async fn stats(&self) -> TodoStats {
        TodoStats::of(&self.todos.read().await)
    }

    pub async fn get(&self, id: TodoId) -> Option<Todo> {
        self.todos.read().await.iter().find(|t| t.id == id).cloned()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a todo at the front. Blank text is rejected without persisting.
    pub async fn add(&self, text: &str) -> Option<Added> {
        let repository = self.repository().await?;
        let todo = Todo::new(self.ids.generate_todo_id(), text, self.clock.now())?;
        let id = todo.id;

        let snapshot = {
            let mut todos = self.todos.write().await;
            let before = todos.clone();
            todos.insert(0, todo.clone());
            Snapshot::taken(before, &todos)
        };

        let result = repository.insert_front(&todo).await;
        let outcome = self.settle("add", repository.as_ref(), result, snapshot, false).await;
        Some(Added { id, outcome })
    }

    /// Apply a partial update. Unknown ids and empty patches are no-ops.
    pub async fn update(&self, id: TodoId, patch: TodoPatch) -> SyncOutcome {
        let Some(repository) = self.repository().await else {
            return SyncOutcome::Unchanged;
        };
        let now = self.clock.now();

        let (snapshot, updated) = {
            let mut todos = self.todos.write().await;
            let before = todos.clone();
            let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
                return SyncOutcome::Unchanged;
            };
            if !todo.apply(&patch, now) {
                return SyncOutcome::Unchanged;
            }
            let updated = todo.clone();
            (Snapshot::taken(before, &todos), updated)
        };

        let result = repository.update(&updated).await;
        self.settle("update", repository.as_ref(), result, snapshot, false)
            .await
    }

    /// Replace the text. Blank text cancels the edit.
    pub async fn edit_text(&self, id: TodoId, text: &str) -> SyncOutcome {
        self.update(id, TodoPatch::text(text)).await
    }

    /// Flip `completed`. Unknown ids leave the sequence untouched.
    pub async fn toggle(&self, id: TodoId) -> SyncOutcome {
        let current = self
            .todos
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.completed);
        match current {
            Some(completed) => self.update(id, TodoPatch::completed(!completed)).await,
            None => SyncOutcome::Unchanged,
        }
    }

    pub async fn delete(&self, id: TodoId) -> SyncOutcome {
        let Some(repository) = self.repository().await else {
            return SyncOutcome::Unchanged;
        };

        let snapshot = {
            let mut todos = self.todos.write().await;
            if !todos.iter().any(|t| t.id == id) {
                return SyncOutcome::Unchanged;
            }
            let before = todos.clone();
            todos.retain(|t| t.id != id);
            Snapshot::taken(before, &todos)
        };

        let result = repository.delete(id).await;
        self.settle("delete", repository.as_ref(), result, snapshot, false)
            .await
    }

    /// Remove every completed todo, keeping the order of the rest.
    pub async fn clear_completed(&self) -> SyncOutcome {
        let Some(repository) = self.repository().await else {
            return SyncOutcome::Unchanged;
        };

        let snapshot = {
            let mut todos = self.todos.write().await;
            if !todos.iter().any(|t| t.completed) {
                return SyncOutcome::Unchanged;
            }
            let before = todos.clone();
            todos.retain(|t| !t.completed);
            Snapshot::taken(before, &todos)
        };

        let result = repository.clear_completed().await;
        self.settle("clear_completed", repository.as_ref(), result, snapshot, false)
            .await
    }

    /// Replace the canonical order.
    ///
    /// `order` must be a permutation of the current sequence; anything else is
    /// a stale view and is ignored. Every todo whose position changed gets a new
    /// `updated_at`. A failed save always rolls back by re-reading the store
    /// before this returns.
    pub async fn reorder(&self, mut order: Vec<Todo>) -> SyncOutcome {
        let Some(repository) = self.repository().await else {
            return SyncOutcome::Unchanged;
        };
        let now = self.clock.now();

        let snapshot = {
            let mut todos = self.todos.write().await;
            if !same_members(&todos, &order) {
                tracing::warn!(
                    current = todos.len(),
                    proposed = order.len(),
                    "ignoring reorder that is not a permutation of the current todos"
                );
                return SyncOutcome::Unchanged;
            }
            if todos.iter().map(|t| t.id).eq(order.iter().map(|t| t.id)) {
                return SyncOutcome::Unchanged;
            }
            for (old, todo) in todos.iter().zip(order.iter_mut()) {
                if old.id != todo.id {
                    todo.updated_at = now;
                }
            }
            let before = std::mem::replace(&mut *todos, order.clone());
            Snapshot::taken(before, &todos)
        };

        let result = repository.save_order(&order).await;
        self.settle("reorder", repository.as_ref(), result, snapshot, true)
            .await
    }

    /// Apply a drag gesture made on the `filter` view.
    pub async fn move_in_view(
        &self,
        filter: TodoFilter,
        gesture: DragGesture,
    ) -> Result<SyncOutcome, ReorderError> {
        let full = self.todos().await;
        let view = filter_todos(&full, filter);
        match reorder(&full, &view, gesture)? {
            Reordered::Unchanged => Ok(SyncOutcome::Unchanged),
            Reordered::Moved(order) => Ok(self.reorder(order).await),
        }
    }

    // =========================================================================
    // Persistence outcome
    // =========================================================================

    async fn settle(
        &self,
        op: &'static str,
        repository: &dyn TodoRepository,
        result: StorageResult<()>,
        snapshot: Snapshot,
        always_roll_back: bool,
    ) -> SyncOutcome {
        let err = match result {
            Ok(()) => {
                tracing::debug!(op, backend = repository.backend(), "persisted");
                return SyncOutcome::Persisted;
            }
            Err(err) => err,
        };
        tracing::error!(
            op,
            backend = repository.backend(),
            kind = ?err.kind(),
            error = %err,
            "failed to persist change"
        );

        if !always_roll_back && self.rollback == RollbackPolicy::ReorderOnly {
            return SyncOutcome::PersistFailed;
        }

        match repository.fetch_all().await {
            Ok(todos) => {
                tracing::warn!(op, "rolled back to the stored state");
                *self.todos.write().await = todos;
                SyncOutcome::RolledBack
            }
            Err(refetch) => {
                let mut todos = self.todos.write().await;
                // 保存待ちの間に別の操作が入っていたら、それを上書きしない
                if *todos != snapshot.after {
                    tracing::warn!(
                        op,
                        error = %refetch,
                        "refetch failed and the list changed meanwhile; keeping it"
                    );
                    return SyncOutcome::PersistFailed;
                }
                tracing::warn!(
                    op,
                    error = %refetch,
                    "refetch failed; restoring the state from before the change"
                );
                *todos = snapshot.before;
                SyncOutcome::RolledBack
            }
        }
    }
}

/// The list right before and right after an optimistic change.
struct Snapshot {
    before: Vec<Todo>,
    after: Vec<Todo>,
}

impl Snapshot {
    fn taken(before: Vec<Todo>, after: &[Todo]) -> Self {
        Self {
            before,
            after: after.to_vec(),
        }
    }
}

fn same_members(current: &[Todo], proposed: &[Todo]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a: Vec<TodoId> = current.iter().map(|t| t.id).collect();
    let mut b: Vec<TodoId> = proposed.iter().map(|t| t.id).collect();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::domain::filter::fixtures::texts;
    use crate::impls::{InMemoryKeyValueStore, InMemoryTodoTable, LocalTodoRepository, StaticSession};
    use crate::ports::{FixedClock, KeyValueStore, SystemClock, TodoTable, UlidGenerator};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ulid::Ulid;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn store_with(backend: Backend, rollback: RollbackPolicy) -> (TodoStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let store = TodoStore::new(
            backend,
            clock.clone(),
            Arc::new(UlidGenerator::new(SystemClock)),
            rollback,
        );
        (store, clock)
    }

    async fn local_store() -> (TodoStore, Arc<InMemoryKeyValueStore>, Arc<FixedClock>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let (store, clock) = store_with(Backend::Local(kv.clone()), RollbackPolicy::ReorderOnly);
        store.sync_session(&StaticSession::signed_out()).await;
        (store, kv, clock)
    }

    async fn remote_store(table: Arc<InMemoryTodoTable>, rollback: RollbackPolicy) -> TodoStore {
        let user = UserId::from_ulid(Ulid::new());
        let (store, _) = store_with(Backend::Remote(table), rollback);
        store.sync_session(&StaticSession::signed_in(user)).await;
        store
    }

    async fn stored_locally(kv: Arc<InMemoryKeyValueStore>) -> Vec<Todo> {
        LocalTodoRepository::new(kv).fetch_all().await.unwrap()
    }

    /// Add in reverse so the canonical order reads like the argument list.
    async fn seed(store: &TodoStore, items: &[(&str, bool)]) -> Vec<TodoId> {
        let mut ids = Vec::new();
        for (text, _) in items.iter().rev() {
            ids.push(store.add(text).await.unwrap().id);
        }
        ids.reverse();
        for ((_, completed), id) in items.iter().zip(&ids) {
            if *completed {
                store.toggle(*id).await;
            }
        }
        ids
    }

    #[tokio::test]
    async fn add_creates_one_active_todo_at_the_front() {
        let (store, _, _) = local_store().await;
        store.add("older").await.unwrap();
        let added = store.add("Buy milk").await.unwrap();

        assert_eq!(added.outcome, SyncOutcome::Persisted);
        let todos = store.todos().await;
        assert_eq!(texts(&todos), vec!["Buy milk", "older"]);
        assert_eq!(todos[0].id, added.id);
        assert!(!todos[0].completed);
    }

    #[tokio::test]
    async fn blank_add_does_not_touch_storage() {
        let table = Arc::new(InMemoryTodoTable::new());
        let store = remote_store(table.clone(), RollbackPolicy::ReorderOnly).await;

        assert!(store.add("").await.is_none());
        assert!(store.add("   ").await.is_none());
        assert!(store.todos().await.is_empty());
        assert_eq!(table.write_count().await, 0);
    }

    #[tokio::test]
    async fn mutations_are_persisted_to_the_local_slot() {
        let (store, kv, _) = local_store().await;
        seed(&store, &[("a", false), ("b", true), ("c", false)]).await;

        let reloaded = stored_locally(kv).await;
        assert_eq!(texts(&reloaded), vec!["a", "b", "c"]);
        assert!(reloaded[1].completed);
    }

    #[tokio::test]
    async fn toggle_stamps_updated_at() {
        let (store, _, clock) = local_store().await;
        let id = store.add("task").await.unwrap().id;

        clock.advance(Duration::minutes(3));
        assert_eq!(store.toggle(id).await, SyncOutcome::Persisted);

        let todo = store.get(id).await.unwrap();
        assert!(todo.completed);
        assert_eq!(todo.created_at, start());
        assert_eq!(todo.updated_at, start() + Duration::minutes(3));
    }

    #[tokio::test]
    async fn toggle_of_unknown_id_changes_nothing() {
        let (store, _, _) = local_store().await;
        seed(&store, &[("a", false), ("b", true)]).await;
        let before = store.todos().await;

        let outcome = store.toggle(TodoId::from_ulid(Ulid::new())).await;
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(store.todos().await, before);
    }

    #[tokio::test]
    async fn blank_edit_is_cancelled() {
        let (store, _, _) = local_store().await;
        let id = store.add("keep me").await.unwrap().id;

        assert_eq!(store.edit_text(id, "  ").await, SyncOutcome::Unchanged);
        assert_eq!(store.edit_text(id, " renamed ").await, SyncOutcome::Persisted);
        assert_eq!(store.get(id).await.unwrap().text, "renamed");
    }

    #[tokio::test]
    async fn delete_of_stale_id_is_silent() {
        let (store, _, _) = local_store().await;
        let ids = seed(&store, &[("a", false), ("b", false)]).await;

        assert_eq!(store.delete(ids[0]).await, SyncOutcome::Persisted);
        assert_eq!(store.delete(ids[0]).await, SyncOutcome::Unchanged);
        assert_eq!(texts(&store.todos().await), vec!["b"]);
    }

    #[tokio::test]
    async fn clear_completed_keeps_active_in_order() {
        let (store, _, _) = local_store().await;
        seed(&store, &[("done 1", true), ("open", false), ("done 2", true)]).await;

        assert_eq!(store.clear_completed().await, SyncOutcome::Persisted);
        assert_eq!(texts(&store.todos().await), vec!["open"]);
        assert_eq!(store.clear_completed().await, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn move_in_active_view_is_persisted() {
        let (store, kv, clock) = local_store().await;
        seed(&store, &[("A", false), ("B", true), ("C", false)]).await;
        let b_stamp = store.todos().await[1].updated_at;

        clock.advance(Duration::minutes(5));
        let outcome = store
            .move_in_view(TodoFilter::Active, DragGesture::new(0, 1))
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Persisted);
        let todos = store.todos().await;
        assert_eq!(texts(&todos), vec!["C", "B", "A"]);

        // 位置が変わった C と A だけが刻印される
        let moved = start() + Duration::minutes(5);
        assert_eq!(todos[0].updated_at, moved);
        assert_eq!(todos[1].updated_at, b_stamp);
        assert_eq!(todos[2].updated_at, moved);
        assert_eq!(stored_locally(kv).await, todos);
    }

    #[tokio::test]
    async fn cancelled_drag_is_not_persisted() {
        let table = Arc::new(InMemoryTodoTable::new());
        let store = remote_store(table.clone(), RollbackPolicy::ReorderOnly).await;
        seed(&store, &[("A", false), ("B", false)]).await;
        let writes = table.write_count().await;

        let outcome = store
            .move_in_view(TodoFilter::All, DragGesture::cancelled(0))
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
        let outcome = store
            .move_in_view(TodoFilter::All, DragGesture::new(1, 1))
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert_eq!(table.write_count().await, writes);
    }

    #[tokio::test]
    async fn out_of_range_drag_is_an_error() {
        let (store, _, _) = local_store().await;
        seed(&store, &[("A", false), ("B", false)]).await;
        let result = store
            .move_in_view(TodoFilter::All, DragGesture::new(5, 0))
            .await;
        assert!(matches!(result, Err(ReorderError::SourceOutOfRange { .. })));
    }

    #[tokio::test]
    async fn partial_reorder_failure_rolls_back_to_the_stored_mix() {
        let table = Arc::new(InMemoryTodoTable::new().without_batched_order());
        let store = remote_store(table.clone(), RollbackPolicy::ReorderOnly).await;
        // order_index: A=-2, B=-1, C=0
        seed(&store, &[("A", false), ("B", false), ("C", false)]).await;

        // [C, A, B] は C=0, A=1, B=2 の 3 書き込み。B だけ失敗させる
        table.fail_writes_after(2).await;
        let outcome = store
            .move_in_view(TodoFilter::All, DragGesture::new(2, 0))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::RolledBack);
        // 保存先の実際の状態: B=-1, C=0, A=1
        assert_eq!(texts(&store.todos().await), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn reorder_failure_with_unreachable_store_restores_previous_order() {
        let table = Arc::new(InMemoryTodoTable::new());
        let store = remote_store(table.clone(), RollbackPolicy::ReorderOnly).await;
        seed(&store, &[("A", false), ("B", false), ("C", false)]).await;
        let before = store.todos().await;

        table.set_offline(true).await;
        let outcome = store
            .move_in_view(TodoFilter::All, DragGesture::new(0, 2))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::RolledBack);
        assert_eq!(store.todos().await, before);
    }

    #[tokio::test]
    async fn edits_to_rows_deleted_elsewhere_still_persist() {
        let table = Arc::new(InMemoryTodoTable::new());
        let user = UserId::from_ulid(Ulid::new());
        let (store, _) = store_with(Backend::Remote(table.clone()), RollbackPolicy::AllMutations);
        store.sync_session(&StaticSession::signed_in(user)).await;
        let ids = seed(&store, &[("toggled", false), ("deleted", false)]).await;

        // 別の端末が先に消した
        for id in &ids {
            table.delete(user, *id).await.unwrap();
        }

        assert_eq!(store.toggle(ids[0]).await, SyncOutcome::Persisted);
        assert_eq!(store.delete(ids[1]).await, SyncOutcome::Persisted);
        assert_eq!(texts(&store.todos().await), vec!["toggled"]);
    }

    /// Holds `save_order` open until released, then fails it.
    /// Reads always fail.
    struct GatedRepository {
        entered: Arc<tokio::sync::Notify>,
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl TodoRepository for GatedRepository {
        fn backend(&self) -> &'static str {
            "gated"
        }

        async fn fetch_all(&self) -> StorageResult<Vec<Todo>> {
            Err(crate::domain::StorageError::Unavailable("unreachable".to_string()))
        }

        async fn insert_front(&self, _todo: &Todo) -> StorageResult<()> {
            Ok(())
        }

        async fn update(&self, _todo: &Todo) -> StorageResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: TodoId) -> StorageResult<()> {
            Ok(())
        }

        async fn clear_completed(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn save_order(&self, _todos: &[Todo]) -> StorageResult<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Err(crate::domain::StorageError::Unavailable("dropped".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_reorder_does_not_discard_a_later_add() {
        let (store, _) = store_with(
            Backend::Local(Arc::new(InMemoryKeyValueStore::new())),
            RollbackPolicy::ReorderOnly,
        );
        let store = Arc::new(store);
        let entered = Arc::new(tokio::sync::Notify::new());
        let release = Arc::new(tokio::sync::Notify::new());
        let repo = GatedRepository {
            entered: entered.clone(),
            release: release.clone(),
        };
        store.attach(Some(Arc::new(repo))).await;
        seed(&store, &[("A", false), ("B", false)]).await;

        let moving = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .move_in_view(TodoFilter::All, DragGesture::new(0, 1))
                    .await
            })
        };
        entered.notified().await;

        let late = store.add("late").await.unwrap();
        assert_eq!(late.outcome, SyncOutcome::Persisted);
        release.notify_one();

        let outcome = moving.await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome::PersistFailed);
        assert_eq!(texts(&store.todos().await), vec!["late", "B", "A"]);
    }

    #[tokio::test]
    async fn failed_toggle_keeps_optimistic_state_by_default() {
        let table = Arc::new(InMemoryTodoTable::new());
        let store = remote_store(table.clone(), RollbackPolicy::ReorderOnly).await;
        let id = store.add("task").await.unwrap().id;

        table.fail_writes_after(0).await;
        assert_eq!(store.toggle(id).await, SyncOutcome::PersistFailed);
        assert!(store.get(id).await.unwrap().completed);
    }

    #[tokio::test]
    async fn failed_mutations_roll_back_when_configured() {
        let table = Arc::new(InMemoryTodoTable::new());
        let store = remote_store(table.clone(), RollbackPolicy::AllMutations).await;
        let id = store.add("task").await.unwrap().id;

        table.fail_writes_after(0).await;
        assert_eq!(store.toggle(id).await, SyncOutcome::RolledBack);
        assert!(!store.get(id).await.unwrap().completed);

        let added = store.add("never stored").await.unwrap();
        assert_eq!(added.outcome, SyncOutcome::RolledBack);
        assert!(store.get(added.id).await.is_none());
    }

    #[tokio::test]
    async fn signed_out_remote_store_is_empty_and_inert() {
        let table = Arc::new(InMemoryTodoTable::new());
        let (store, _) = store_with(Backend::Remote(table.clone()), RollbackPolicy::ReorderOnly);
        store.sync_session(&StaticSession::signed_out()).await;

        assert!(!store.is_attached().await);
        assert!(store.add("hello").await.is_none());
        assert_eq!(store.clear_completed().await, SyncOutcome::Unchanged);
        assert!(store.todos().await.is_empty());
        assert_eq!(table.write_count().await, 0);
    }

    #[tokio::test]
    async fn sign_out_drops_the_user_todos() {
        let table = Arc::new(InMemoryTodoTable::new());
        let user = UserId::from_ulid(Ulid::new());
        let session = StaticSession::signed_in(user);
        let (store, _) = store_with(Backend::Remote(table.clone()), RollbackPolicy::ReorderOnly);
        store.sync_session(&session).await;
        store.add("private").await.unwrap();

        store.sign_out(&session).await;
        assert!(store.todos().await.is_empty());
        assert_eq!(session.current_user(), None);

        // 再ログインで取り戻せる
        store.sync_session(&StaticSession::signed_in(user)).await;
        assert_eq!(texts(&store.todos().await), vec!["private"]);
    }

    #[tokio::test]
    async fn storage_change_on_the_todos_slot_triggers_refresh() {
        let (store, kv, _) = local_store().await;
        let other = LocalTodoRepository::new(kv.clone());
        let todo = Todo::new(TodoId::from_ulid(Ulid::new()), "from another tab", start()).unwrap();

        let mut changes = kv.subscribe();
        kv.save("theme", serde_json::json!(true)).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(store.on_storage_change(&change).await, SyncOutcome::Unchanged);

        other.insert_front(&todo).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, TODOS_KEY);
        assert_eq!(store.on_storage_change(&change).await, SyncOutcome::Persisted);
        assert_eq!(texts(&store.todos().await), vec!["from another tab"]);
    }

    #[tokio::test]
    async fn stale_reorder_is_ignored() {
        let (store, _, _) = local_store().await;
        seed(&store, &[("A", false), ("B", false)]).await;
        let mut stale = store.todos().await;
        stale.pop();

        assert_eq!(store.reorder(stale).await, SyncOutcome::Unchanged);
        assert_eq!(store.todos().await.len(), 2);
    }
}
