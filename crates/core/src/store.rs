#![forbid(unsafe_code)]

//! Narrow persistence boundary of the engine.
//!
//! Reads are available from any handle. Writes only exist on the transaction handle passed to
//! [`IntervalStore::with_transaction`], so every boundary shift happens inside a transaction.

use crate::content::{Content, ContentSchema, FieldValue};
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::{Interval, NewRow, Node};

pub trait IntervalReads {
    fn fetch_by_id(&self, id: NodeId) -> Result<Option<Node>, TreeError>;

    /// Rows whose interval lies within `interval`, bounds included, ordered by `lft`.
    fn fetch_by_interval(&self, interval: Interval) -> Result<Vec<Node>, TreeError>;

    /// Rows whose interval contains `interval`, bounds included, ordered by `lft`.
    fn fetch_containing(&self, interval: Interval) -> Result<Vec<Node>, TreeError>;

    /// Direct children of every id in `parents`, ordered by `lft`.
    fn fetch_by_parent(&self, parents: &[NodeId]) -> Result<Vec<Node>, TreeError>;

    fn fetch_by_left(&self, lft: i64) -> Result<Option<Node>, TreeError>;

    fn fetch_by_right(&self, rgt: i64) -> Result<Option<Node>, TreeError>;

    /// Rows whose content `field` equals `value`, ordered by `lft`.
    fn fetch_by_content(&self, field: &str, value: &FieldValue) -> Result<Vec<Node>, TreeError>;

    /// Every row, ordered by `lft`.
    fn fetch_all(&self) -> Result<Vec<Node>, TreeError>;

    fn count_rows(&self) -> Result<usize, TreeError>;
}

impl<T: IntervalReads + ?Sized> IntervalReads for &T {
    fn fetch_by_id(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        (**self).fetch_by_id(id)
    }

    fn fetch_by_interval(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        (**self).fetch_by_interval(interval)
    }

    fn fetch_containing(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        (**self).fetch_containing(interval)
    }

    fn fetch_by_parent(&self, parents: &[NodeId]) -> Result<Vec<Node>, TreeError> {
        (**self).fetch_by_parent(parents)
    }

    fn fetch_by_left(&self, lft: i64) -> Result<Option<Node>, TreeError> {
        (**self).fetch_by_left(lft)
    }

    fn fetch_by_right(&self, rgt: i64) -> Result<Option<Node>, TreeError> {
        (**self).fetch_by_right(rgt)
    }

    fn fetch_by_content(&self, field: &str, value: &FieldValue) -> Result<Vec<Node>, TreeError> {
        (**self).fetch_by_content(field, value)
    }

    fn fetch_all(&self) -> Result<Vec<Node>, TreeError> {
        (**self).fetch_all()
    }

    fn count_rows(&self) -> Result<usize, TreeError> {
        (**self).count_rows()
    }
}

/// Write access inside one open transaction.
pub trait IntervalOps {
    type Reads: IntervalReads + ?Sized;

    /// Reads that observe the transaction's own uncommitted writes.
    fn reads(&self) -> &Self::Reads;

    /// Adds `delta` to every `lft` strictly greater than `threshold`.
    fn shift_left_boundaries_after(&mut self, threshold: i64, delta: i64)
    -> Result<usize, TreeError>;

    /// Adds `delta` to every `rgt` strictly greater than `threshold`.
    fn shift_right_boundaries_after(
        &mut self,
        threshold: i64,
        delta: i64,
    ) -> Result<usize, TreeError>;

    /// Adds `offset` to both boundaries of every row lying within `interval`.
    fn shift_interval(&mut self, interval: Interval, offset: i64) -> Result<usize, TreeError>;

    fn insert_row(&mut self, row: NewRow) -> Result<NodeId, TreeError>;

    fn set_parent(&mut self, id: NodeId, parent_id: Option<NodeId>) -> Result<bool, TreeError>;

    /// Overwrites the given fields only; fields absent from `content` keep their value.
    fn update_content(&mut self, id: NodeId, content: &Content) -> Result<bool, TreeError>;

    fn delete_rows_in_interval(&mut self, interval: Interval) -> Result<usize, TreeError>;
}

pub trait IntervalStore {
    type Reader<'s>: IntervalReads
    where
        Self: 's;

    type Tx<'s>: IntervalOps
    where
        Self: 's;

    fn schema(&self) -> &ContentSchema;

    fn reader(&self) -> Self::Reader<'_>;

    /// Runs `body` in one transaction: commit if it returns `Ok`, roll back otherwise.
    fn with_transaction<'s, T, F>(&'s mut self, body: F) -> Result<T, TreeError>
    where
        F: FnOnce(&mut Self::Tx<'s>) -> Result<T, TreeError>;
}
