#![forbid(unsafe_code)]

use super::{NestedSetEngine, close_gap, require_node};
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::store::{IntervalOps, IntervalStore};
use tracing::debug;

impl<S: IntervalStore> NestedSetEngine<S> {
    /// Removes the node and its whole subtree. Returns the number of removed rows.
    pub fn delete(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let (removed, interval) = self.store.with_transaction(|tx| {
            let node = require_node(tx.reads(), id)?;
            let removed = tx.delete_rows_in_interval(node.interval)?;
            close_gap(tx, node.interval.lft, node.interval.span())?;
            Ok((removed, node.interval))
        })?;

        debug!(%id, lft = interval.lft, rgt = interval.rgt, removed, "deleted subtree");
        Ok(removed)
    }
}
