//! Todo record and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TodoId, UserId};

/// Trim user input; blank input is rejected.
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A single task.
///
/// The local slot stores a sequence of these in canonical order, so field names
/// follow the camelCase layout of that slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Create a new active todo. Returns `None` for blank text.
    pub fn new(id: TodoId, text: &str, now: DateTime<Utc>) -> Option<Self> {
        let text = normalize_text(text)?;
        Some(Self {
            id,
            text,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch and stamp `updated_at`.
    ///
    /// Returns `false` (and leaves the record untouched) when the patch carries
    /// nothing applicable.
    pub fn apply(&mut self, patch: &TodoPatch, now: DateTime<Utc>) -> bool {
        let patch = patch.normalized();
        if patch.is_empty() {
            return false;
        }
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = now;
        true
    }
}

/// Partial update for a todo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    /// Trim the text field; a blank edit is dropped (the edit is cancelled).
    pub fn normalized(&self) -> Self {
        Self {
            text: self.text.as_deref().and_then(normalize_text),
            completed: self.completed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}

/// Row of the remote `todos` table.
///
/// `order_index` ascending is the display order; gaps are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRow {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub user_id: UserId,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoRow {
    pub fn from_todo(todo: &Todo, user_id: UserId, order_index: i64) -> Self {
        Self {
            id: todo.id,
            text: todo.text.clone(),
            completed: todo.completed,
            user_id,
            order_index,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
