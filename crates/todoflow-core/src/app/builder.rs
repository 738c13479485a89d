//! StoreBuilder - 起動時のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 保存先の選択は一度だけ行い、以降は `Backend` を注入する

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::backend::Backend;
use super::store::TodoStore;
use super::theme::ThemePreference;
use crate::config::{BackendKind, Config, RollbackPolicy};
use crate::ports::{Clock, IdGenerator, KeyValueStore, SystemClock, TodoTable, UlidGenerator};

/// StoreBuilder は App を構築
///
/// # 使用例
/// ```ignore
/// let app = StoreBuilder::from_config(&config)
///     .key_value_store(Arc::new(JsonFileKeyValueStore::new(&config.data_file)))
///     .build()?;
/// app.store.sync_session(&session).await;
/// ```
///
/// # Fail-fast 設計
/// - テーマは常にローカルスロットに保存されるので、key-value store は必須
/// - `BackendKind::Remote` ならテーブルが必須
pub struct StoreBuilder {
    backend: BackendKind,
    rollback: RollbackPolicy,
    kv: Option<Arc<dyn KeyValueStore>>,
    table: Option<Arc<dyn TodoTable>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は App 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No key-value store was provided. The local slot store is always required.")]
    MissingKeyValueStore,

    #[error("Backend is \"remote\" but no todo table was provided.")]
    MissingRemoteTable,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            backend: BackendKind::default(),
            rollback: RollbackPolicy::default(),
            kv: None,
            table: None,
            clock: None,
            ids: None,
        }
    }

    /// Backend と rollback policy を設定ファイルから取る
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .backend(config.backend)
            .rollback(config.rollback)
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    pub fn key_value_store(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn todo_table(mut self, table: Arc<dyn TodoTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// 省略時は SystemClock
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時は clock を使う UlidGenerator
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - key-value store が設定されているか
    /// - remote の場合にテーブルが設定されているか
    pub fn build(self) -> Result<App, BuildError> {
        let kv = self.kv.ok_or(BuildError::MissingKeyValueStore)?;
        let backend = match self.backend {
            BackendKind::Local => Backend::Local(kv.clone()),
            BackendKind::Remote => {
                Backend::Remote(self.table.ok_or(BuildError::MissingRemoteTable)?)
            }
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        tracing::debug!(?backend, rollback = ?self.rollback, "built todo store");
        Ok(App {
            store: Arc::new(TodoStore::new(backend, clock, ids, self.rollback)),
            theme: ThemePreference::new(kv.clone()),
            kv,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は起動済みのアプリケーション
pub struct App {
    pub store: Arc<TodoStore>,
    pub theme: ThemePreference,
    kv: Arc<dyn KeyValueStore>,
}

impl App {
    /// Forward slot change notifications to the store until the sender is dropped.
    pub fn watch_storage(&self) -> JoinHandle<()> {
        let mut changes = self.kv.subscribe();
        let store = self.store.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        store.on_storage_change(&change).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "storage notifications lagged; reloading");
                        store.refresh().await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SyncOutcome;
    use crate::domain::UserId;
    use crate::impls::{InMemoryKeyValueStore, InMemoryTodoTable, LocalTodoRepository, StaticSession};
    use crate::ports::TodoRepository;
    use std::time::Duration;
    use ulid::Ulid;

    #[test]
    fn build_requires_a_key_value_store() {
        let app = StoreBuilder::new().build();
        assert!(matches!(app, Err(BuildError::MissingKeyValueStore)));
    }

    #[test]
    fn remote_backend_requires_a_table() {
        let app = StoreBuilder::new()
            .backend(BackendKind::Remote)
            .key_value_store(Arc::new(InMemoryKeyValueStore::new()))
            .build();
        assert!(matches!(app, Err(BuildError::MissingRemoteTable)));
    }

    #[test]
    fn config_selects_backend_and_policy() {
        let config = Config {
            backend: BackendKind::Remote,
            rollback: RollbackPolicy::AllMutations,
            ..Config::default()
        };
        let app = StoreBuilder::from_config(&config)
            .key_value_store(Arc::new(InMemoryKeyValueStore::new()))
            .todo_table(Arc::new(InMemoryTodoTable::new()))
            .build()
            .unwrap();
        assert_eq!(app.store.backend().kind(), BackendKind::Remote);
        assert_eq!(app.store.rollback_policy(), RollbackPolicy::AllMutations);
    }

    #[tokio::test]
    async fn remote_app_loads_after_sign_in() {
        let app = StoreBuilder::new()
            .backend(BackendKind::Remote)
            .key_value_store(Arc::new(InMemoryKeyValueStore::new()))
            .todo_table(Arc::new(InMemoryTodoTable::new()))
            .build()
            .unwrap();

        let session = StaticSession::signed_in(UserId::from_ulid(Ulid::new()));
        assert_eq!(app.store.sync_session(&session).await, SyncOutcome::Persisted);
        assert!(app.store.add("hello").await.is_some());
    }

    #[tokio::test]
    async fn watcher_reloads_on_external_writes() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let app = StoreBuilder::new()
            .key_value_store(kv.clone())
            .build()
            .unwrap();
        app.store.sync_session(&StaticSession::signed_out()).await;
        let watcher = app.watch_storage();

        let other = LocalTodoRepository::new(kv);
        let todo = crate::domain::Todo::new(
            crate::domain::TodoId::from_ulid(Ulid::new()),
            "written elsewhere",
            chrono::Utc::now(),
        )
        .unwrap();
        other.insert_front(&todo).await.unwrap();

        let mut seen = false;
        for _ in 0..50 {
            if app.store.get(todo.id).await.is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        watcher.abort();
        assert!(seen);
    }
}
