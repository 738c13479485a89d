//! KeyValueStore port - ローカル永続スロット（ブラウザの localStorage 相当）
//!
//! 文字列キーから JSON 値へのマッピングを保持します。
//! 保存済みの値が読めない場合は「存在しない」として扱います。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::domain::StorageResult;

/// Slot holding the ordered todo sequence.
pub const TODOS_KEY: &str = "todos";

/// Slot holding the dark-theme flag.
pub const THEME_KEY: &str = "theme";

/// 保存時に購読者へ通知される変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

/// KeyValueStore はキー単位で JSON 値を保存する
///
/// # 設計原則
/// - 1 キー = 1 スロット、書き込みはスロット全体の置き換え
/// - `subscribe` で他の書き手による変更を検知できる
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> StorageResult<Option<serde_json::Value>>;

    async fn save(&self, key: &str, value: serde_json::Value) -> StorageResult<()>;

    async fn remove(&self, key: &str) -> StorageResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// 型付きで読み出す。デコードできない値は `None`。
pub async fn load_slot<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(value) = store.load(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable slot");
            Ok(None)
        }
    }
}

/// 型付きで書き込む
pub async fn save_slot<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let value = serde_json::to_value(value)?;
    store.save(key, value).await
}
