#![forbid(unsafe_code)]

//! In-memory interval table.
//!
//! A transaction works on a copy of the rows and swaps it in on commit, so a failed body leaves
//! the table untouched.

use crate::content::{Content, ContentSchema, FieldValue};
use crate::error::TreeError;
use crate::ids::NodeId;
use crate::model::{Interval, NewRow, Node};
use crate::store::{IntervalOps, IntervalReads, IntervalStore};
use std::marker::PhantomData;
use tracing::warn;

#[derive(Clone, Debug, Default)]
pub struct MemoryRows {
    schema: ContentSchema,
    rows: Vec<Node>,
}

impl MemoryRows {
    fn sorted(&self, mut filter: impl FnMut(&Node) -> bool) -> Vec<Node> {
        let mut out = self
            .rows
            .iter()
            .filter(|node| filter(node))
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|node| node.interval.lft);
        out
    }

    fn find(&self, filter: impl FnMut(&Node) -> bool) -> Option<Node> {
        self.sorted(filter).into_iter().next()
    }
}

impl IntervalReads for MemoryRows {
    fn fetch_by_id(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        Ok(self.rows.iter().find(|node| node.id == id).cloned())
    }

    fn fetch_by_interval(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        Ok(self.sorted(|node| interval.encloses(node.interval)))
    }

    fn fetch_containing(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        Ok(self.sorted(|node| node.interval.encloses(interval)))
    }

    fn fetch_by_parent(&self, parents: &[NodeId]) -> Result<Vec<Node>, TreeError> {
        Ok(self.sorted(|node| node.parent_id.is_some_and(|parent| parents.contains(&parent))))
    }

    fn fetch_by_left(&self, lft: i64) -> Result<Option<Node>, TreeError> {
        Ok(self.find(|node| node.interval.lft == lft))
    }

    fn fetch_by_right(&self, rgt: i64) -> Result<Option<Node>, TreeError> {
        Ok(self.find(|node| node.interval.rgt == rgt))
    }

    fn fetch_by_content(&self, field: &str, value: &FieldValue) -> Result<Vec<Node>, TreeError> {
        self.schema.require_field(field)?;
        Ok(self.sorted(|node| match node.content.get(field) {
            Some(stored) => stored == value,
            None => value.is_null(),
        }))
    }

    fn fetch_all(&self) -> Result<Vec<Node>, TreeError> {
        Ok(self.sorted(|_| true))
    }

    fn count_rows(&self) -> Result<usize, TreeError> {
        Ok(self.rows.len())
    }
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
    rows: MemoryRows,
    next_id: i64,
}

impl MemoryStore {
    pub fn new(schema: ContentSchema) -> Self {
        Self {
            rows: MemoryRows {
                schema,
                rows: Vec::new(),
            },
            next_id: 1,
        }
    }

    /// Raw rows, bypassing the engine. Intended for fixtures that need a hand-built table.
    pub fn from_rows(schema: ContentSchema, rows: Vec<Node>) -> Self {
        let next_id = rows.iter().map(|node| node.id.get()).max().unwrap_or(0) + 1;
        Self {
            rows: MemoryRows { schema, rows },
            next_id,
        }
    }
}

pub struct MemoryTx<'s> {
    rows: MemoryRows,
    next_id: i64,
    _store: PhantomData<&'s MemoryStore>,
}

impl MemoryTx<'_> {
    fn row_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.rows.rows.iter_mut().find(|node| node.id == id)
    }
}

impl IntervalOps for MemoryTx<'_> {
    type Reads = MemoryRows;

    fn reads(&self) -> &MemoryRows {
        &self.rows
    }

    fn shift_left_boundaries_after(
        &mut self,
        threshold: i64,
        delta: i64,
    ) -> Result<usize, TreeError> {
        let mut changed = 0;
        for node in self
            .rows
            .rows
            .iter_mut()
            .filter(|node| node.interval.lft > threshold)
        {
            node.interval.lft += delta;
            changed += 1;
        }
        Ok(changed)
    }

    fn shift_right_boundaries_after(
        &mut self,
        threshold: i64,
        delta: i64,
    ) -> Result<usize, TreeError> {
        let mut changed = 0;
        for node in self
            .rows
            .rows
            .iter_mut()
            .filter(|node| node.interval.rgt > threshold)
        {
            node.interval.rgt += delta;
            changed += 1;
        }
        Ok(changed)
    }

    fn shift_interval(&mut self, interval: Interval, offset: i64) -> Result<usize, TreeError> {
        let mut changed = 0;
        for node in self
            .rows
            .rows
            .iter_mut()
            .filter(|node| interval.encloses(node.interval))
        {
            node.interval.lft += offset;
            node.interval.rgt += offset;
            changed += 1;
        }
        Ok(changed)
    }

    fn insert_row(&mut self, row: NewRow) -> Result<NodeId, TreeError> {
        if row.interval.lft >= row.interval.rgt {
            return Err(TreeError::store("CHECK constraint failed: lft < rgt"));
        }
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        let content = row
            .content
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect::<Content>();
        self.rows.rows.push(Node {
            id,
            parent_id: row.parent_id,
            interval: row.interval,
            content,
        });
        Ok(id)
    }

    fn set_parent(&mut self, id: NodeId, parent_id: Option<NodeId>) -> Result<bool, TreeError> {
        let Some(node) = self.row_mut(id) else {
            return Ok(false);
        };
        node.parent_id = parent_id;
        Ok(true)
    }

    fn update_content(&mut self, id: NodeId, content: &Content) -> Result<bool, TreeError> {
        let Some(node) = self.row_mut(id) else {
            return Ok(false);
        };
        for (name, value) in content {
            if value.is_null() {
                node.content.remove(name);
            } else {
                node.content.insert(name.clone(), value.clone());
            }
        }
        Ok(true)
    }

    fn delete_rows_in_interval(&mut self, interval: Interval) -> Result<usize, TreeError> {
        let before = self.rows.rows.len();
        self.rows
            .rows
            .retain(|node| !interval.encloses(node.interval));
        Ok(before - self.rows.rows.len())
    }
}

impl IntervalStore for MemoryStore {
    type Reader<'s> = &'s MemoryRows;
    type Tx<'s> = MemoryTx<'s>;

    fn schema(&self) -> &ContentSchema {
        &self.rows.schema
    }

    fn reader(&self) -> Self::Reader<'_> {
        &self.rows
    }

    fn with_transaction<'s, T, F>(&'s mut self, body: F) -> Result<T, TreeError>
    where
        F: FnOnce(&mut Self::Tx<'s>) -> Result<T, TreeError>,
    {
        let mut tx = MemoryTx {
            rows: self.rows.clone(),
            next_id: self.next_id,
            _store: PhantomData,
        };
        match body(&mut tx) {
            Ok(value) => {
                self.rows = tx.rows;
                self.next_id = tx.next_id;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "memory transaction rolled back");
                Err(err)
            }
        }
    }
}
