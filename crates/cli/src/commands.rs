#![forbid(unsafe_code)]

use crate::args::Command;
use crate::render::{branch_json, node_json, nodes_json, parse_content};
use orgtree_core::{IntervalStore, NestedSetEngine, TreeError};
use orgtree_storage::StoreError;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug)]
pub(crate) enum CliError {
    Tree(TreeError),
    Store(StoreError),
    Corrupt(Vec<String>),
}

impl CliError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::Tree(err) => err.code(),
            Self::Store(err) => err.code(),
            Self::Corrupt(_) => "CORRUPT",
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Corrupt(violations) => write!(
                f,
                "{} invariant violation(s): {}",
                violations.len(),
                violations.join("; ")
            ),
        }
    }
}

impl std::error::Error for CliError {}

impl From<TreeError> for CliError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Runs one command and returns the JSON document to print on stdout.
pub(crate) fn execute<S: IntervalStore>(
    engine: &mut NestedSetEngine<S>,
    command: Command,
) -> Result<Value, CliError> {
    let out = match command {
        Command::Init => json!({ "nodes": engine.len()? }),
        Command::Insert { content, placement } => {
            let content = parse_content(&content, engine.store().schema())?;
            let id = engine.insert(content, placement)?;
            info!(%id, "node inserted");
            json!({ "id": id.get() })
        }
        Command::Update { id, content } => {
            let content = parse_content(&content, engine.store().schema())?;
            engine.update(id, &content)?;
            node_json(&engine.get(id)?.ok_or(TreeError::NotFound(id))?)
        }
        Command::Move { ids, target } => {
            engine.move_nodes(&ids, target)?;
            json!({ "moved": ids.iter().map(|id| id.get()).collect::<Vec<_>>() })
        }
        Command::Delete { id } => json!({ "removed": engine.delete(id)? }),
        Command::Get { id } => node_json(&engine.get(id)?.ok_or(TreeError::NotFound(id))?),
        Command::Path {
            id,
            field,
            separator,
        } => match field {
            Some(field) => {
                let path = engine
                    .path_string(id, &field, &separator)?
                    .ok_or(TreeError::NotFound(id))?;
                json!({ "path": path })
            }
            None => {
                let path = engine.path(id)?;
                if path.is_empty() {
                    return Err(TreeError::NotFound(id).into());
                }
                nodes_json(&path)
            }
        },
        Command::Depth { id } => {
            let depth = engine.depth(id)?.ok_or(TreeError::NotFound(id))?;
            json!({ "depth": depth })
        }
        Command::Children { ids, query } => nodes_json(&engine.children(&ids, query)?),
        Command::Siblings { id } => {
            engine.get(id)?.ok_or(TreeError::NotFound(id))?;
            let previous = engine.previous_sibling(id)?;
            let next = engine.next_sibling(id)?;
            json!({
                "previous": previous.as_ref().map(node_json),
                "next": next.as_ref().map(node_json),
            })
        }
        Command::Resolve {
            path,
            start,
            field,
            separator,
        } => {
            let id = engine.id_by_path(&path, start, &field, &separator)?;
            json!({ "id": id.map(|id| id.get()) })
        }
        Command::Subtree { id, max_depth } => {
            let branch = engine.subtree(id, max_depth)?;
            if branch.is_empty() {
                return Err(TreeError::NotFound(id).into());
            }
            branch_json(&branch)
        }
        Command::Verify => {
            let violations = engine
                .verify()?
                .iter()
                .map(|violation| violation.to_string())
                .collect::<Vec<_>>();
            if !violations.is_empty() {
                return Err(CliError::Corrupt(violations));
            }
            json!({ "violations": [] })
        }
    };
    Ok(out)
}
