//! Command-line interface for todoflow
//!
//! Every invocation loads the list from the data file, applies one command
//! and exits. Ids may be abbreviated to any unique prefix, or to the short
//! form shown by `list`.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use todoflow_core::app::{App, StoreBuilder, SyncOutcome};
use todoflow_core::config::{BackendKind, CONFIG_FILE, Config};
use todoflow_core::domain::{DragGesture, Todo, TodoFilter, TodoId};
use todoflow_core::impls::{JsonFileKeyValueStore, StaticSession};

/// todoflow - a small ordered task list
#[derive(Parser, Debug)]
#[command(name = "todoflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "TODOFLOW_CONFIG", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// JSON file holding the list (overrides `data_file` from the config)
    #[arg(long, global = true, env = "TODOFLOW_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a todo at the top of the list
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Show the list
    List {
        /// all, active or completed
        #[arg(long, default_value = "all")]
        filter: TodoFilter,
    },

    /// Mark a todo done, or not done
    Toggle { id: String },

    /// Replace the text of a todo
    Edit {
        id: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a todo
    Rm { id: String },

    /// Move a todo within a filtered view (positions as shown by `list`)
    Move {
        #[arg(long, default_value = "all")]
        filter: TodoFilter,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },

    /// Delete every completed todo
    ClearCompleted,

    /// Show counts
    Stats,

    /// Show or toggle the dark theme flag
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    /// Flip between light and dark
    Toggle,
}

impl Cli {
    /// Config file merged with command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if let Some(data_file) = &self.data_file {
            config.data_file = data_file.clone();
            config.validate()?;
        }
        Ok(config)
    }

    pub async fn run(self, config: Config) -> Result<()> {
        if config.backend == BackendKind::Remote {
            bail!("backend \"remote\" needs a hosted table client; the command-line client only supports \"local\"");
        }

        let kv = Arc::new(JsonFileKeyValueStore::new(&config.data_file));
        let app = StoreBuilder::from_config(&config)
            .key_value_store(kv)
            .build()?;
        if app.store.sync_session(&StaticSession::signed_out()).await != SyncOutcome::Persisted {
            bail!("could not read {}", config.data_file.display());
        }

        let json = self.json;
        match self.command {
            Commands::Add { text } => {
                let added = app
                    .store
                    .add(&text.join(" "))
                    .await
                    .ok_or_else(|| anyhow!("nothing to add: text is blank"))?;
                ensure_saved(added.outcome)?;
                let todo = app.store.get(added.id).await;
                emit(json, &todo, || format!("added {}", added.id))
            }
            Commands::List { filter } => {
                let todos = app.store.filtered(filter).await;
                emit(json, &todos, || render_list(&todos))
            }
            Commands::Toggle { id } => {
                let id = resolve(&app, &id).await?;
                ensure_saved(app.store.toggle(id).await)?;
                let todo = app.store.get(id).await;
                emit(json, &todo, || match &todo {
                    Some(t) => render_line(None, t),
                    None => String::new(),
                })
            }
            Commands::Edit { id, text } => {
                let id = resolve(&app, &id).await?;
                let outcome = app.store.edit_text(id, &text.join(" ")).await;
                if outcome == SyncOutcome::Unchanged {
                    tracing::info!(%id, "edit left the todo unchanged");
                }
                ensure_saved(outcome)?;
                let todo = app.store.get(id).await;
                emit(json, &todo, || match &todo {
                    Some(t) => render_line(None, t),
                    None => String::new(),
                })
            }
            Commands::Rm { id } => {
                let id = resolve(&app, &id).await?;
                ensure_saved(app.store.delete(id).await)?;
                emit(json, &id, || format!("removed {id}"))
            }
            Commands::Move { filter, from, to } => {
                let outcome = app
                    .store
                    .move_in_view(filter, DragGesture::new(from, to))
                    .await?;
                ensure_saved(outcome)?;
                let todos = app.store.filtered(filter).await;
                emit(json, &todos, || render_list(&todos))
            }
            Commands::ClearCompleted => {
                let before = app.store.stats().await.completed;
                ensure_saved(app.store.clear_completed().await)?;
                let removed = before - app.store.stats().await.completed;
                emit(json, &serde_json::json!({ "removed": removed }), || {
                    format!("removed {removed} completed")
                })
            }
            Commands::Stats => {
                let stats = app.store.stats().await;
                emit(json, &stats, || {
                    format!(
                        "{} total, {} active, {} completed",
                        stats.total, stats.active, stats.completed
                    )
                })
            }
            Commands::Theme { action } => {
                let dark = match action {
                    Some(ThemeAction::Toggle) => app.theme.toggle().await?,
                    None => app.theme.is_dark().await?,
                };
                let name = if dark { "dark" } else { "light" };
                emit(json, &serde_json::json!({ "dark": dark }), || name.to_string())
            }
        }
    }
}

/// Unchanged is fine (the command was a no-op); anything that failed to save is not.
fn ensure_saved(outcome: SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::Persisted | SyncOutcome::Unchanged => Ok(()),
        SyncOutcome::PersistFailed => bail!("failed to save the change"),
        SyncOutcome::RolledBack => bail!("failed to save the change; reverted to the stored list"),
    }
}

/// Shortest abbreviation `resolve` accepts, not counting the `todo-` prefix.
const MIN_ID_LEN: usize = 4;

/// Resolve a full id, a bare ULID, a unique prefix of either, or the short
/// suffix printed by `list`.
async fn resolve(app: &App, raw: &str) -> Result<TodoId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<TodoId>() {
        if app.store.get(id).await.is_some() {
            return Ok(id);
        }
    }

    let upper = raw.to_ascii_uppercase();
    let needle = upper.strip_prefix("TODO-").unwrap_or(&upper);
    if needle.is_empty() {
        bail!("todo id must not be empty");
    }
    if needle.len() < MIN_ID_LEN {
        bail!("{raw:?} is too short; give at least {MIN_ID_LEN} characters of the id");
    }

    let matches: Vec<TodoId> = app
        .store
        .todos()
        .await
        .iter()
        .map(|t| t.id)
        .filter(|id| {
            let ulid = id.as_ulid().to_string();
            ulid.starts_with(needle) || ulid.ends_with(needle)
        })
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no todo matches {raw:?}"),
        _ => bail!("{raw:?} matches {} todos; use a longer prefix", matches.len()),
    }
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = text();
        if !text.is_empty() {
            println!("{text}");
        }
    }
    Ok(())
}

fn render_list(todos: &[Todo]) -> String {
    todos
        .iter()
        .enumerate()
        .map(|(i, t)| render_line(Some(i), t))
        .collect::<Vec<_>>()
        .join("\n")
}

const SHORT_ID_LEN: usize = 8;

fn render_line(position: Option<usize>, todo: &Todo) -> String {
    let mark = if todo.completed { "x" } else { " " };
    let ulid = todo.id.as_ulid().to_string();
    // 先頭は作成時刻なので、短縮表示には末尾のランダム部を使う
    let short = &ulid[ulid.len() - SHORT_ID_LEN..];
    match position {
        Some(i) => format!("{i:>3} [{mark}] {}  ({short})", todo.text),
        None => format!("[{mark}] {}  ({short})", todo.text),
    }
}
