//! Backend - 起動時に選択される保存先
//!
//! 実行時の型判定ではなく、この列挙型を一度だけ組み立てて注入します。

use std::sync::Arc;

use crate::config::BackendKind;
use crate::domain::UserId;
use crate::impls::{LocalTodoRepository, RemoteTodoRepository};
use crate::ports::{KeyValueStore, TodoRepository, TodoTable};

#[derive(Clone)]
pub enum Backend {
    Local(Arc<dyn KeyValueStore>),
    Remote(Arc<dyn TodoTable>),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// 現在のユーザーに対応する Storage Adapter
    ///
    /// リモートでユーザーがいない場合は `None`（空の集合・保存なし）。
    pub fn repository_for(&self, user: Option<UserId>) -> Option<Arc<dyn TodoRepository>> {
        match self {
            Backend::Local(store) => {
                Some(Arc::new(LocalTodoRepository::new(store.clone())) as Arc<dyn TodoRepository>)
            }
            Backend::Remote(table) => user.map(|owner| {
                Arc::new(RemoteTodoRepository::new(table.clone(), owner)) as Arc<dyn TodoRepository>
            }),
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backend::{:?}", self.kind())
    }
}
