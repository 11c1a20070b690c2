#![forbid(unsafe_code)]

//! Nested-set tree engine.
//!
//! A tree lives in one flat table; every node owns an interval `[lft, rgt]` and ancestry is
//! interval containment. Persistence goes through the [`IntervalStore`] trait, the
//! [`NestedSetEngine`] computes the boundary shifts for every structural change and runs each
//! change inside one store transaction.

mod content;
mod engine;
mod error;
pub mod memory;
mod model;
mod store;

pub use content::{
    Content, ContentSchema, FieldType, FieldValue, IdentifierError, RESERVED_COLUMNS,
    validate_identifier,
};
pub use engine::{BranchEntry, NestedSetEngine, Violation};
pub use error::TreeError;
pub use memory::MemoryStore;
pub use model::{ChildrenQuery, Interval, MoveTarget, NewRow, Node, Placement};
pub use store::{IntervalOps, IntervalReads, IntervalStore};

pub mod ids {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct NodeId(i64);

    impl NodeId {
        pub fn new(value: i64) -> Self {
            Self(value)
        }

        pub fn get(self) -> i64 {
            self.0
        }

        pub fn parse(value: &str) -> Result<Self, NodeIdError> {
            let value = value.trim();
            if value.is_empty() {
                return Err(NodeIdError::Empty);
            }
            let parsed = value.parse::<i64>().map_err(|_| NodeIdError::NotNumeric)?;
            if parsed <= 0 {
                return Err(NodeIdError::NotPositive);
            }
            Ok(Self(parsed))
        }
    }

    impl std::fmt::Display for NodeId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl From<i64> for NodeId {
        fn from(value: i64) -> Self {
            Self(value)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum NodeIdError {
        Empty,
        NotNumeric,
        NotPositive,
    }

    impl NodeIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "node id must not be empty",
                Self::NotNumeric => "node id must be an integer",
                Self::NotPositive => "node id must be positive",
            }
        }
    }
}
