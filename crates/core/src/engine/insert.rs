#![forbid(unsafe_code)]

use super::{NestedSetEngine, open_gap, require_node};
use crate::content::Content;
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::{Interval, NewRow, Placement};
use crate::store::{IntervalOps, IntervalStore};
use tracing::debug;

impl<S: IntervalStore> NestedSetEngine<S> {
    /// Creates a single node and returns its id.
    ///
    /// `Placement::Root` does not check for an existing root; the caller vouches for an empty
    /// tree.
    pub fn insert(&mut self, content: Content, placement: Placement) -> Result<NodeId, TreeError> {
        self.store.schema().validate(&content)?;

        let (id, interval) = self.store.with_transaction(|tx| {
            let (boundary, parent_id) = match placement {
                Placement::Root => (0, None),
                Placement::FirstChildOf(parent_id) => {
                    let parent = require_node(tx.reads(), parent_id)?;
                    (parent.interval.lft, Some(parent.id))
                }
                Placement::After(sibling_id) => {
                    let sibling = require_node(tx.reads(), sibling_id)?;
                    let Some(parent_id) = sibling.parent_id else {
                        return Err(TreeError::invalid(format!(
                            "node {sibling_id} is a root; a node placed after it would have no parent"
                        )));
                    };
                    (sibling.interval.rgt, Some(parent_id))
                }
            };

            if parent_id.is_some() {
                open_gap(tx, boundary, 2)?;
            }

            let interval = Interval::new(boundary + 1, boundary + 2);
            let id = tx.insert_row(NewRow {
                parent_id,
                interval,
                content,
            })?;
            Ok((id, interval))
        })?;

        debug!(%id, lft = interval.lft, rgt = interval.rgt, ?placement, "inserted node");
        Ok(id)
    }

    /// Overwrites content fields of one node. Structural columns are not content and cannot be
    /// reached from here.
    pub fn update(&mut self, id: NodeId, content: &Content) -> Result<(), TreeError> {
        self.store.schema().validate(content)?;
        if content.is_empty() {
            return require_node(&self.store.reader(), id).map(|_| ());
        }

        self.store.with_transaction(|tx| {
            if !tx.update_content(id, content)? {
                return Err(TreeError::NotFound(id));
            }
            Ok(())
        })?;

        debug!(%id, fields = content.len(), "updated node content");
        Ok(())
    }
}
