//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **StoreBuilder**: アプリケーションの構築とワイヤリング
//! - **Backend**: 起動時に選ばれる保存先
//! - **TodoStore**: 正本の並びと楽観的更新・ロールバック
//! - **ThemePreference**: ダーク表示フラグ

pub mod backend;
pub mod builder;
pub mod store;
pub mod theme;

// 主要な型を再エクスポート
pub use self::backend::Backend;
pub use self::builder::{App, BuildError, StoreBuilder};
pub use self::store::{Added, SyncOutcome, TodoStore};
pub use self::theme::ThemePreference;
