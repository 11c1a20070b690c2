#![forbid(unsafe_code)]

use crate::content::Content;
use crate::ids::NodeId;

/// Boundary pair of one node. Ancestry is strict containment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lft: i64,
    pub rgt: i64,
}

impl Interval {
    pub fn new(lft: i64, rgt: i64) -> Self {
        Self { lft, rgt }
    }

    /// Number of boundary slots taken by the subtree: `rgt - lft + 1`.
    pub fn span(self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of nodes in the subtree, the node itself included.
    pub fn width(self) -> i64 {
        self.span() / 2
    }

    pub fn strictly_contains(self, other: Interval) -> bool {
        self.lft < other.lft && self.rgt > other.rgt
    }

    /// `other` lies within `self`, bounds included.
    pub fn encloses(self, other: Interval) -> bool {
        self.lft <= other.lft && self.rgt >= other.rgt
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub interval: Interval,
    pub content: Content,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        self.interval.rgt - self.interval.lft > 1
    }

    pub fn is_descendant_of(&self, ancestor: &Node) -> bool {
        ancestor.interval.strictly_contains(self.interval)
    }
}

/// Row handed to the store on insert; the store assigns the id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewRow {
    pub parent_id: Option<NodeId>,
    pub interval: Interval,
    pub content: Content,
}

/// Where a new node goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// A new root. No check is made that the tree is empty.
    Root,
    FirstChildOf(NodeId),
    After(NodeId),
}

/// Where a moved subtree goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveTarget {
    FirstChildOf(NodeId),
    After(NodeId),
}

impl MoveTarget {
    pub fn anchor(self) -> NodeId {
        match self {
            Self::FirstChildOf(id) | Self::After(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildrenQuery {
    pub only_first: bool,
    pub levels: usize,
}

impl Default for ChildrenQuery {
    fn default() -> Self {
        Self {
            only_first: false,
            levels: 1,
        }
    }
}

impl ChildrenQuery {
    pub fn levels(levels: usize) -> Self {
        Self {
            only_first: false,
            levels,
        }
    }

    pub fn first_only() -> Self {
        Self {
            only_first: true,
            levels: 1,
        }
    }
}
