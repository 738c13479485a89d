//! JsonFileKeyValueStore - ファイルに永続化するスロット
//!
//! すべてのスロットを 1 つの JSON ドキュメント（オブジェクト）に保存します。
//! 書き込みは一時ファイル + rename で原子的に行います。
//!
//! # 学習ポイント
//! - spawn_blocking で同期 I/O を async context から実行
//! - 壊れたファイルは空として扱う（起動を妨げない）

use async_trait::async_trait;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, broadcast};

use crate::domain::StorageResult;
use crate::ports::{KeyValueStore, StorageChange};

type Slots = serde_json::Map<String, serde_json::Value>;

const CHANGE_CAPACITY: usize = 64;

pub struct JsonFileKeyValueStore {
    path: PathBuf,
    /// read-modify-write を直列化する
    write_lock: Mutex<()>,
    changes: broadcast::Sender<StorageChange>,
}

impl JsonFileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            changes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_slots(&self) -> StorageResult<Slots> {
        let path = self.path.clone();
        let slots = tokio::task::spawn_blocking(move || read_slots_blocking(&path)).await??;
        Ok(slots)
    }

    async fn write_slots(&self, slots: Slots) -> StorageResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_slots_blocking(&path, &slots)).await??;
        Ok(())
    }

    async fn modify<F>(&self, key: &str, change: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Slots) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut slots = self.read_slots().await?;
        if !change(&mut slots) {
            return Ok(());
        }
        self.write_slots(slots).await?;
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
        Ok(())
    }
}

fn read_slots_blocking(path: &Path) -> StorageResult<Slots> {
    if !path.exists() {
        return Ok(Slots::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Slots::new());
    }
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Object(slots)) => Ok(slots),
        Ok(_) | Err(_) => {
            tracing::warn!(path = %path.display(), "data file is not a JSON object; starting empty");
            Ok(Slots::new())
        }
    }
}

fn write_slots_blocking(path: &Path, slots: &Slots) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(slots)?;
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn load(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        let mut slots = self.read_slots().await?;
        Ok(slots.remove(key))
    }

    async fn save(&self, key: &str, value: serde_json::Value) -> StorageResult<()> {
        self.modify(key, |slots| {
            slots.insert(key.to_string(), value);
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.modify(key, |slots| slots.remove(key).is_some()).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
