//! ThemePreference - `"theme"` スロットのダーク表示フラグ

use std::sync::Arc;

use crate::domain::StorageResult;
use crate::ports::{KeyValueStore, THEME_KEY, load_slot, save_slot};

#[derive(Clone)]
pub struct ThemePreference {
    store: Arc<dyn KeyValueStore>,
}

impl ThemePreference {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Missing or unreadable slot means light.
    pub async fn is_dark(&self) -> StorageResult<bool> {
        Ok(load_slot::<bool>(self.store.as_ref(), THEME_KEY)
            .await?
            .unwrap_or(false))
    }

    pub async fn set_dark(&self, dark: bool) -> StorageResult<()> {
        save_slot(self.store.as_ref(), THEME_KEY, &dark).await?;
        tracing::debug!(dark, "saved theme");
        Ok(())
    }

    /// Flip the flag and return the new value.
    pub async fn toggle(&self) -> StorageResult<bool> {
        let dark = !self.is_dark().await?;
        self.set_dark(dark).await?;
        Ok(dark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryKeyValueStore;

    #[tokio::test]
    async fn defaults_to_light_and_toggles() {
        let theme = ThemePreference::new(Arc::new(InMemoryKeyValueStore::new()));
        assert!(!theme.is_dark().await.unwrap());

        assert!(theme.toggle().await.unwrap());
        assert!(theme.is_dark().await.unwrap());
        assert!(!theme.toggle().await.unwrap());
    }

    #[tokio::test]
    async fn unreadable_slot_reads_as_light() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        kv.save(THEME_KEY, serde_json::json!("dark")).await.unwrap();

        let theme = ThemePreference::new(kv);
        assert!(!theme.is_dark().await.unwrap());
    }
}
