//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ローカルスロット, ホスト型 DB, 認証）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod auth;
pub mod clock;
pub mod id_generator;
pub mod kv_store;
pub mod repository;
pub mod todo_table;

// 主要な trait を再エクスポート
pub use self::auth::AuthSession;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::{KeyValueStore, StorageChange, THEME_KEY, TODOS_KEY, load_slot, save_slot};
pub use self::repository::TodoRepository;
pub use self::todo_table::{RowChanges, TodoTable};
