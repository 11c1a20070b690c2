#![forbid(unsafe_code)]

use super::NestedSetEngine;
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::Node;
use crate::store::{IntervalReads, IntervalStore};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    EmptyInterval {
        id: NodeId,
        lft: i64,
        rgt: i64,
    },
    EvenSpan {
        id: NodeId,
        lft: i64,
        rgt: i64,
    },
    DuplicateBoundary {
        value: i64,
    },
    MissingBoundary {
        value: i64,
    },
    PartialOverlap {
        left: NodeId,
        right: NodeId,
    },
    ParentMismatch {
        id: NodeId,
        recorded: Option<NodeId>,
        enclosing: Option<NodeId>,
    },
    RootCount {
        count: usize,
    },
    RootNotFirst {
        id: NodeId,
        lft: i64,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInterval { id, lft, rgt } => {
                write!(f, "node {id}: lft {lft} is not below rgt {rgt}")
            }
            Self::EvenSpan { id, lft, rgt } => {
                write!(f, "node {id}: interval [{lft}, {rgt}] has an even span")
            }
            Self::DuplicateBoundary { value } => write!(f, "boundary {value} is used twice"),
            Self::MissingBoundary { value } => write!(f, "boundary {value} is unused"),
            Self::PartialOverlap { left, right } => {
                write!(f, "nodes {left} and {right} overlap without nesting")
            }
            Self::ParentMismatch {
                id,
                recorded,
                enclosing,
            } => write!(
                f,
                "node {id}: parent_id is {} but the enclosing interval belongs to {}",
                display_opt(*recorded),
                display_opt(*enclosing)
            ),
            Self::RootCount { count } => write!(f, "expected exactly one root, found {count}"),
            Self::RootNotFirst { id, lft } => write!(f, "root {id} has lft {lft}, expected 1"),
        }
    }
}

fn display_opt(id: Option<NodeId>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl<S: IntervalStore> NestedSetEngine<S> {
    /// Checks the whole table against the nested-set invariants. An empty tree is valid.
    pub fn verify(&self) -> Result<Vec<Violation>, TreeError> {
        let rows = self.store.reader().fetch_all()?;
        Ok(check_rows(&rows))
    }
}

/// `rows` must be ordered by `lft`.
pub(crate) fn check_rows(rows: &[Node]) -> Vec<Violation> {
    let mut violations = Vec::new();
    if rows.is_empty() {
        return violations;
    }

    let mut usage: BTreeMap<i64, usize> = BTreeMap::new();
    for node in rows {
        let Node { id, interval, .. } = node;
        if interval.lft >= interval.rgt {
            violations.push(Violation::EmptyInterval {
                id: *id,
                lft: interval.lft,
                rgt: interval.rgt,
            });
        } else if (interval.rgt - interval.lft) % 2 == 0 {
            violations.push(Violation::EvenSpan {
                id: *id,
                lft: interval.lft,
                rgt: interval.rgt,
            });
        }
        *usage.entry(interval.lft).or_default() += 1;
        *usage.entry(interval.rgt).or_default() += 1;
    }

    for (&value, &count) in &usage {
        if count > 1 {
            violations.push(Violation::DuplicateBoundary { value });
        }
    }
    let expected_max = i64::try_from(rows.len() * 2).unwrap_or(i64::MAX);
    for value in 1..=expected_max {
        if !usage.contains_key(&value) {
            violations.push(Violation::MissingBoundary { value });
        }
    }

    let roots = rows.iter().filter(|node| node.is_root()).collect::<Vec<_>>();
    if roots.len() != 1 {
        violations.push(Violation::RootCount { count: roots.len() });
    }
    for root in roots {
        if root.interval.lft != 1 {
            violations.push(Violation::RootNotFirst {
                id: root.id,
                lft: root.interval.lft,
            });
        }
    }

    let mut open: Vec<&Node> = Vec::new();
    for node in rows {
        while open
            .last()
            .is_some_and(|top| top.interval.rgt < node.interval.lft)
        {
            open.pop();
        }
        if let Some(top) = open.last()
            && top.interval.rgt < node.interval.rgt
        {
            violations.push(Violation::PartialOverlap {
                left: top.id,
                right: node.id,
            });
        }
        let enclosing = open.last().map(|top| top.id);
        if node.parent_id != enclosing {
            violations.push(Violation::ParentMismatch {
                id: node.id,
                recorded: node.parent_id,
                enclosing,
            });
        }
        open.push(node);
    }

    violations
}
