//! todoflow-core
//!
//! Core building blocks for the todoflow task list.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, todo, filter, reorder, errors）
//! - **ports**: 抽象化レイヤー（KeyValueStore, TodoTable, TodoRepository, AuthSession, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryKeyValueStore, JsonFileKeyValueStore, InMemoryTodoTable など）
//! - **app**: アプリケーションロジック（store, builder, theme）
//! - **config**: `todoflow.toml` の読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
