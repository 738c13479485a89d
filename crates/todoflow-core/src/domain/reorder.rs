//! Reorder engine - フィルタ済みビュー上のドラッグを正本の並び順に反映する
//!
//! # アルゴリズム
//! 1. destination がなければ何もしない（ドロップ先なし）
//! 2. フィルタ済み列のコピーから source の要素を取り除き、destination に挿入する
//! 3. 旧フィルタ順に各要素を走査し、正本の列から取り除いて
//!    「新しいフィルタ順で直前にある要素の直後」（先頭なら列の先頭）に挿入し直す
//!
//! フィルタに含まれない要素は一度も動かされないため、互いの相対順序は変わりません。
//! 結果は常に入力の置換（permutation）です。

use serde::{Deserialize, Serialize};

use super::ids::TodoId;
use super::todo::Todo;

/// Drag gesture in filtered-view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragGesture {
    pub source: usize,
    /// `None` when dropped outside any drop target.
    pub destination: Option<usize>,
}

impl DragGesture {
    pub fn new(source: usize, destination: usize) -> Self {
        Self {
            source,
            destination: Some(destination),
        }
    }

    pub fn cancelled(source: usize) -> Self {
        Self {
            source,
            destination: None,
        }
    }
}

/// Result of applying a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reordered {
    /// Identity result; nothing to persist.
    Unchanged,
    /// New canonical order.
    Moved(Vec<Todo>),
}

impl Reordered {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Reordered::Unchanged)
    }

    /// Canonical order after the gesture, borrowing `full` for the identity case.
    pub fn into_order(self, full: &[Todo]) -> Vec<Todo> {
        match self {
            Reordered::Unchanged => full.to_vec(),
            Reordered::Moved(todos) => todos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("drag source {index} is outside the view (len={len})")]
    SourceOutOfRange { index: usize, len: usize },

    #[error("drag destination {index} is outside the view (len={len})")]
    DestinationOutOfRange { index: usize, len: usize },
}

/// Translate a gesture on `filtered` into a new order for `full`.
///
/// `filtered` must be a subsequence of `full` (as produced by
/// [`filter_todos`](super::filter::filter_todos)); members missing from `full`
/// are skipped.
pub fn reorder(
    full: &[Todo],
    filtered: &[Todo],
    gesture: DragGesture,
) -> Result<Reordered, ReorderError> {
    let Some(destination) = gesture.destination else {
        return Ok(Reordered::Unchanged);
    };
    let len = filtered.len();
    if len < 2 {
        return Ok(Reordered::Unchanged);
    }
    if gesture.source >= len {
        return Err(ReorderError::SourceOutOfRange {
            index: gesture.source,
            len,
        });
    }
    if destination >= len {
        return Err(ReorderError::DestinationOutOfRange {
            index: destination,
            len,
        });
    }
    if gesture.source == destination {
        return Ok(Reordered::Unchanged);
    }

    let mut view_order: Vec<TodoId> = filtered.iter().map(|t| t.id).collect();
    let dragged = view_order.remove(gesture.source);
    view_order.insert(destination, dragged);

    let mut next = full.to_vec();
    for todo in filtered {
        let Some(current) = position_of(&next, todo.id) else {
            continue;
        };
        let Some(rank) = view_order.iter().position(|id| *id == todo.id) else {
            continue;
        };
        let item = next.remove(current);
        let insert_at = match rank {
            0 => 0,
            _ => position_of(&next, view_order[rank - 1]).map_or(0, |p| p + 1),
        };
        next.insert(insert_at, item);
    }

    Ok(Reordered::Moved(next))
}

fn position_of(todos: &[Todo], id: TodoId) -> Option<usize> {
    todos.iter().position(|t| t.id == id)
}
