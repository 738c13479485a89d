//! Filter view over the canonical sequence.
//!
//! フィルタは並び替えを行わず、要素を取り除くだけです（相対順序は常に保存される）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::todo::Todo;

/// Which todos a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TodoFilter {
    pub const ALL: [TodoFilter; 3] = [TodoFilter::All, TodoFilter::Active, TodoFilter::Completed];

    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Active => !todo.completed,
            TodoFilter::Completed => todo.completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoFilter::All => "all",
            TodoFilter::Active => "active",
            TodoFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter '{0}' (expected all, active or completed)")]
pub struct UnknownFilter(pub String);

impl FromStr for TodoFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TodoFilter::All),
            "active" => Ok(TodoFilter::Active),
            "completed" | "done" => Ok(TodoFilter::Completed),
            _ => Err(UnknownFilter(s.to_string())),
        }
    }
}

/// Visible subsequence of `todos` for `filter`, in canonical order.
pub fn filter_todos(todos: &[Todo], filter: TodoFilter) -> Vec<Todo> {
    todos.iter().filter(|t| filter.matches(t)).cloned().collect()
}

/// Counts shown in the header and on the filter tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TodoStats {
    pub fn of(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total: todos.len(),
            active: todos.len() - completed,
            completed,
        }
    }

    pub fn count(&self, filter: TodoFilter) -> usize {
        match filter {
            TodoFilter::All => self.total,
            TodoFilter::Active => self.active,
            TodoFilter::Completed => self.completed,
        }
    }
}
