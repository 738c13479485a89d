//! Domain model (ids, todo, filter view, reorder engine, errors).
//!
//! ドメイン層は純粋な計算のみで、保存先には依存しません。

pub mod errors;
pub mod filter;
pub mod ids;
pub mod reorder;
pub mod todo;

pub use self::errors::{ErrorKind, StorageError, StorageResult};
pub use self::filter::{TodoFilter, TodoStats, UnknownFilter, filter_todos};
pub use self::ids::{TodoId, UserId};
pub use self::reorder::{DragGesture, ReorderError, Reordered, reorder};
pub use self::todo::{Todo, TodoPatch, TodoRow, normalize_text};
