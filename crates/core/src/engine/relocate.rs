#![forbid(unsafe_code)]

use super::{NestedSetEngine, close_gap, open_gap, require_node};
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::MoveTarget;
use crate::store::{IntervalOps, IntervalStore};
use tracing::{debug, warn};

impl<S: IntervalStore> NestedSetEngine<S> {
    /// Moves each id independently. Failures are collected; moves that succeeded stay applied.
    pub fn move_nodes(&mut self, ids: &[NodeId], target: MoveTarget) -> Result<(), TreeError> {
        let mut failures = Vec::new();
        for &id in ids {
            if let Err(err) = self.move_node(id, target) {
                warn!(%id, error = %err, "move failed");
                failures.push((id, err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TreeError::Aggregate(failures))
        }
    }

    /// Relocates the subtree rooted at `id`, descendants included.
    ///
    /// Targeting the node itself is a no-op success.
    pub fn move_node(&mut self, id: NodeId, target: MoveTarget) -> Result<(), TreeError> {
        if target.anchor() == id {
            debug!(%id, ?target, "move onto itself, nothing to do");
            return Ok(());
        }

        let (from, to) = self
            .store
            .with_transaction(|tx| relocate_subtree(tx, id, target))?;

        debug!(%id, ?target, from, to, "moved subtree");
        Ok(())
    }
}

/// Returns the subtree's `lft` before and after the move.
fn relocate_subtree<T: IntervalOps>(
    tx: &mut T,
    id: NodeId,
    target: MoveTarget,
) -> Result<(i64, i64), TreeError> {
    let node = require_node(tx.reads(), id)?;

    let (parent_id, boundary) = match target {
        MoveTarget::FirstChildOf(parent_id) => {
            let parent = require_node(tx.reads(), parent_id)?;
            (parent.id, parent.interval.lft)
        }
        MoveTarget::After(sibling_id) => {
            let sibling = require_node(tx.reads(), sibling_id)?;
            let Some(parent_id) = sibling.parent_id else {
                return Err(TreeError::invalid(format!(
                    "node {sibling_id} is a root; nothing can be placed beside it"
                )));
            };
            (parent_id, sibling.interval.rgt)
        }
    };

    let parent = require_node(tx.reads(), parent_id)?;
    if parent.id == id || node.interval.strictly_contains(parent.interval) {
        return Err(TreeError::Cycle {
            node: id,
            target: target.anchor(),
        });
    }

    let span = node.interval.span();
    open_gap(tx, boundary, span)?;

    if !tx.set_parent(id, Some(parent_id))? {
        return Err(TreeError::NotFound(id));
    }

    // Both the destination boundary and the subtree may have shifted with the gap.
    let destination = match target {
        MoveTarget::FirstChildOf(parent_id) => require_node(tx.reads(), parent_id)?.interval.lft,
        MoveTarget::After(sibling_id) => require_node(tx.reads(), sibling_id)?.interval.rgt,
    };
    let shifted = require_node(tx.reads(), id)?.interval;
    let offset = destination - shifted.lft + 1;
    tx.shift_interval(shifted, offset)?;

    close_gap(tx, shifted.lft, span)?;

    let placed = require_node(tx.reads(), id)?.interval;
    Ok((node.interval.lft, placed.lft))
}
