#![forbid(unsafe_code)]

mod insert;
mod query;
mod relocate;
mod remove;
#[cfg(test)]
mod tests;
mod verify;

pub use query::BranchEntry;
pub use verify::Violation;

use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::Node;
use crate::store::{IntervalOps, IntervalReads, IntervalStore};
use tracing::trace;

/// Nested-set operations over one tree table.
///
/// Every structural mutation runs as exactly one store transaction. Reads go through the
/// store's reader handle and never fail on missing rows: they return `None` or an empty list.
#[derive(Debug)]
pub struct NestedSetEngine<S> {
    store: S,
}

impl<S: IntervalStore> NestedSetEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

fn require_node<R: IntervalReads + ?Sized>(reads: &R, id: NodeId) -> Result<Node, TreeError> {
    reads.fetch_by_id(id)?.ok_or(TreeError::NotFound(id))
}

/// Reserves `delta` boundary slots right after `boundary`.
///
/// `rgt` moves before `lft` so no row ever has `lft >= rgt` between the two statements.
fn open_gap<T: IntervalOps>(tx: &mut T, boundary: i64, delta: i64) -> Result<(), TreeError> {
    let rights = tx.shift_right_boundaries_after(boundary, delta)?;
    let lefts = tx.shift_left_boundaries_after(boundary, delta)?;
    trace!(boundary, delta, lefts, rights, "opened gap");
    Ok(())
}

/// Collapses an emptied run of `span` boundary slots starting right after `threshold`.
///
/// Rows to the right move left by `span`; ancestors only lose `span` on their `rgt`.
fn close_gap<T: IntervalOps>(tx: &mut T, threshold: i64, span: i64) -> Result<(), TreeError> {
    let lefts = tx.shift_left_boundaries_after(threshold, -span)?;
    let rights = tx.shift_right_boundaries_after(threshold, -span)?;
    trace!(threshold, span, lefts, rights, "closed gap");
    Ok(())
}
