#![forbid(unsafe_code)]

use crate::ids::NodeId;

#[derive(Debug)]
pub enum TreeError {
    NotFound(NodeId),
    Cycle {
        node: NodeId,
        target: NodeId,
    },
    InvalidInput(String),
    Store(String),
    Aggregate(Vec<(NodeId, TreeError)>),
}

impl TreeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Cycle { .. } => "CYCLE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Store(_) => "STORE",
            Self::Aggregate(_) => "AGGREGATE",
        }
    }

    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "node {id} not found"),
            Self::Cycle { node, target } => write!(
                f,
                "cannot move node {node} under {target}: target is inside the moved subtree"
            ),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Store(message) => write!(f, "store: {message}"),
            Self::Aggregate(failures) => {
                write!(f, "{} move(s) failed", failures.len())?;
                for (id, err) in failures {
                    write!(f, "; {id}: {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TreeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_lists_every_failure() {
        let err = TreeError::Aggregate(vec![
            (NodeId::new(3), TreeError::NotFound(NodeId::new(3))),
            (
                NodeId::new(4),
                TreeError::Cycle {
                    node: NodeId::new(4),
                    target: NodeId::new(9),
                },
            ),
        ]);
        assert_eq!(err.code(), "AGGREGATE");
        let text = err.to_string();
        assert!(text.starts_with("2 move(s) failed"));
        assert!(text.contains("3: node 3 not found"));
        assert!(text.contains("4: cannot move node 4 under 9"));
    }
}
