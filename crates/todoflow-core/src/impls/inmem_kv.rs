//! InMemoryKeyValueStore - プロセス内のスロット（開発用・テスト用）

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, broadcast};

use crate::domain::StorageResult;
use crate::ports::{KeyValueStore, StorageChange};

const CHANGE_CAPACITY: usize = 64;

/// InMemoryKeyValueStore は HashMap でスロットを保持する
///
/// 保存のたびに `StorageChange` をブロードキャストします。
pub struct InMemoryKeyValueStore {
    slots: Mutex<HashMap<String, serde_json::Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            slots: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, key: &str) {
        // 購読者がいなければ送信は失敗するが問題ない
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn load(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: serde_json::Value) -> StorageResult<()> {
        self.slots.lock().await.insert(key.to_string(), value);
        self.notify(key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if self.slots.lock().await.remove(key).is_some() {
            self.notify(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
