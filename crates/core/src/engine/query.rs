#![forbid(unsafe_code)]

use super::NestedSetEngine;
use crate::content::FieldValue;
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::{ChildrenQuery, Node};
use crate::store::{IntervalReads, IntervalStore};

/// One row of [`NestedSetEngine::subtree`], with its depth relative to the subtree root.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchEntry {
    pub depth: usize,
    pub node: Node,
}

impl<S: IntervalStore> NestedSetEngine<S> {
    pub fn get(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        self.store.reader().fetch_by_id(id)
    }

    pub fn root(&self) -> Result<Option<Node>, TreeError> {
        self.store.reader().fetch_by_left(1)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        let reader = self.store.reader();
        let Some(parent_id) = reader.fetch_by_id(id)?.and_then(|node| node.parent_id) else {
            return Ok(None);
        };
        reader.fetch_by_id(parent_id)
    }

    pub fn len(&self) -> Result<usize, TreeError> {
        self.store.reader().count_rows()
    }

    pub fn is_empty(&self) -> Result<bool, TreeError> {
        Ok(self.len()? == 0)
    }

    /// Ancestors of `id` and the node itself, root first. Empty for unknown ids.
    pub fn path(&self, id: NodeId) -> Result<Vec<Node>, TreeError> {
        let reader = self.store.reader();
        match reader.fetch_by_id(id)? {
            Some(node) => reader.fetch_containing(node.interval),
            None => Ok(Vec::new()),
        }
    }

    /// Root depth is 0.
    pub fn depth(&self, id: NodeId) -> Result<Option<usize>, TreeError> {
        let path = self.path(id)?;
        Ok(path.len().checked_sub(1))
    }

    /// Children of `ids`, expanded breadth-first for `query.levels` levels (at least one).
    ///
    /// Each level is ordered by `lft`; expansion stops at the first empty level.
    pub fn children(&self, ids: &[NodeId], query: ChildrenQuery) -> Result<Vec<Node>, TreeError> {
        let reader = self.store.reader();

        if query.only_first {
            let mut out = Vec::new();
            for &id in ids {
                let Some(node) = reader.fetch_by_id(id)? else {
                    continue;
                };
                if !node.has_children() {
                    continue;
                }
                if let Some(first) = reader.fetch_by_left(node.interval.lft + 1)? {
                    out.push(first);
                }
            }
            return Ok(out);
        }

        let mut out = Vec::new();
        let mut frontier = ids.to_vec();
        for _ in 0..query.levels.max(1) {
            let level = reader.fetch_by_parent(&frontier)?;
            if level.is_empty() {
                break;
            }
            frontier = level.iter().map(|node| node.id).collect();
            out.extend(level);
        }
        Ok(out)
    }

    pub fn next_sibling(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        let reader = self.store.reader();
        let Some(node) = reader.fetch_by_id(id)? else {
            return Ok(None);
        };
        Ok(reader
            .fetch_by_left(node.interval.rgt + 1)?
            .filter(|sibling| sibling.parent_id == node.parent_id))
    }

    pub fn previous_sibling(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        let reader = self.store.reader();
        let Some(node) = reader.fetch_by_id(id)? else {
            return Ok(None);
        };
        Ok(reader
            .fetch_by_right(node.interval.lft - 1)?
            .filter(|sibling| sibling.parent_id == node.parent_id))
    }

    /// Strict: a node is not its own descendant. Unknown ids yield `false`.
    pub fn is_descendant_of(&self, id: NodeId, ancestor_id: NodeId) -> Result<bool, TreeError> {
        let reader = self.store.reader();
        let (Some(node), Some(ancestor)) =
            (reader.fetch_by_id(id)?, reader.fetch_by_id(ancestor_id)?)
        else {
            return Ok(false);
        };
        Ok(node.is_descendant_of(&ancestor))
    }

    /// First node (in tree order) whose `field` equals `value`.
    pub fn find_by_content(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> Result<Option<Node>, TreeError> {
        self.store.schema().require_field(field)?;
        Ok(self
            .store
            .reader()
            .fetch_by_content(field, value)?
            .into_iter()
            .next())
    }

    /// Values of `field` along the path to `id`, root first, joined by `separator`.
    pub fn path_string(
        &self,
        id: NodeId,
        field: &str,
        separator: &str,
    ) -> Result<Option<String>, TreeError> {
        self.store.schema().require_field(field)?;
        let path = self.path(id)?;
        if path.is_empty() {
            return Ok(None);
        }
        let segments = path
            .iter()
            .map(|node| {
                node.content
                    .get(field)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        Ok(Some(segments.join(separator)))
    }

    /// Resolves a `separator`-delimited list of `field` values to a node id.
    ///
    /// Without `start_id` the first segment names the root; with it, segments are relative to
    /// `start_id`. A path equal to the separator resolves to the starting node. When several
    /// siblings carry the same value the leftmost one is taken.
    pub fn id_by_path(
        &self,
        path: &str,
        start_id: Option<NodeId>,
        field: &str,
        separator: &str,
    ) -> Result<Option<NodeId>, TreeError> {
        if separator.is_empty() {
            return Err(TreeError::invalid("path separator must not be empty"));
        }
        self.store.schema().require_field(field)?;

        let reader = self.store.reader();
        let start = match start_id {
            Some(start_id) => reader.fetch_by_id(start_id)?,
            None => None,
        };
        if start_id.is_some() && start.is_none() {
            return Ok(None);
        }

        let path = path.trim();
        if path == separator {
            return match start {
                Some(start) => Ok(Some(start.id)),
                None => Ok(reader.fetch_by_left(1)?.map(|root| root.id)),
            };
        }

        let segments = path
            .split(separator)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return Ok(None);
        }

        let mut candidates = match start {
            Some(start) => reader.fetch_by_parent(&[start.id])?,
            None => reader.fetch_by_left(1)?.into_iter().collect(),
        };
        let mut resolved = None;
        for segment in segments {
            let Some(found) = candidates.into_iter().find(|node| {
                node.content
                    .get(field)
                    .is_some_and(|value| value.to_string() == segment)
            }) else {
                return Ok(None);
            };
            candidates = reader.fetch_by_parent(&[found.id])?;
            resolved = Some(found.id);
        }
        Ok(resolved)
    }

    /// The node and its descendants in tree order, down to `max_depth` levels below it.
    pub fn subtree(
        &self,
        id: NodeId,
        max_depth: Option<usize>,
    ) -> Result<Vec<BranchEntry>, TreeError> {
        let reader = self.store.reader();
        let Some(top) = reader.fetch_by_id(id)? else {
            return Ok(Vec::new());
        };

        let mut open_rights: Vec<i64> = Vec::new();
        let mut out = Vec::new();
        for node in reader.fetch_by_interval(top.interval)? {
            while open_rights
                .last()
                .is_some_and(|&rgt| rgt < node.interval.lft)
            {
                open_rights.pop();
            }
            let depth = open_rights.len();
            open_rights.push(node.interval.rgt);
            if max_depth.is_none_or(|max| depth <= max) {
                out.push(BranchEntry { depth, node });
            }
        }
        Ok(out)
    }
}
