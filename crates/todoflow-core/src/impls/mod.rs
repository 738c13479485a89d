//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryKeyValueStore**: 開発用・テスト用のスロット
//! - **JsonFileKeyValueStore**: ファイルに永続化するスロット（CLI 用）
//! - **InMemoryTodoTable**: ホスト型 `todos` テーブルの開発用実装
//! - **LocalTodoRepository** / **RemoteTodoRepository**: Storage Adapter の 2 実装
//! - **StaticSession**: 固定ユーザーの AuthSession
//!
//! # 本番用実装
//! ホスト型 DB のクライアントは別クレートに配置し、`TodoTable` を実装します。

pub mod inmem_kv;
pub mod inmem_table;
pub mod json_file_kv;
pub mod local_repo;
pub mod remote_repo;
pub mod session;

// 主要な型を再エクスポート
pub use self::inmem_kv::InMemoryKeyValueStore;
pub use self::inmem_table::InMemoryTodoTable;
pub use self::json_file_kv::JsonFileKeyValueStore;
pub use self::local_repo::LocalTodoRepository;
pub use self::remote_repo::RemoteTodoRepository;
pub use self::session::StaticSession;
