#![forbid(unsafe_code)]

use super::layout::sql_value;
use super::{StoreError, TableLayout};
use orgtree_core::ids::NodeId;
use orgtree_core::{
    Content, FieldValue, Interval, IntervalOps, IntervalReads, NewRow, Node, TreeError,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params_from_iter};

/// Read access to one tree table, bound to the store's scope.
#[derive(Clone, Copy, Debug)]
pub struct SqliteReader<'c> {
    conn: &'c Connection,
    layout: &'c TableLayout,
}

impl<'c> SqliteReader<'c> {
    pub(crate) fn new(conn: &'c Connection, layout: &'c TableLayout) -> Self {
        Self { conn, layout }
    }

    fn select_many(&self, predicate: &str, params: Vec<Value>) -> Result<Vec<Node>, StoreError> {
        let sql = self.layout.select(predicate);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(self.layout.bind(params)), |row| {
            self.layout.decode(row)
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn select_one(&self, predicate: &str, params: Vec<Value>) -> Result<Option<Node>, StoreError> {
        Ok(self.select_many(predicate, params)?.into_iter().next())
    }
}

impl IntervalReads for SqliteReader<'_> {
    fn fetch_by_id(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        Ok(self.select_one("id = ?", vec![Value::Integer(id.get())])?)
    }

    fn fetch_by_interval(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        Ok(self.select_many(
            "lft >= ? AND rgt <= ?",
            vec![Value::Integer(interval.lft), Value::Integer(interval.rgt)],
        )?)
    }

    fn fetch_containing(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        Ok(self.select_many(
            "lft <= ? AND rgt >= ?",
            vec![Value::Integer(interval.lft), Value::Integer(interval.rgt)],
        )?)
    }

    fn fetch_by_parent(&self, parents: &[NodeId]) -> Result<Vec<Node>, TreeError> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; parents.len()].join(", ");
        let params = parents
            .iter()
            .map(|id| Value::Integer(id.get()))
            .collect::<Vec<_>>();
        Ok(self.select_many(&format!("parent_id IN ({placeholders})"), params)?)
    }

    fn fetch_by_left(&self, lft: i64) -> Result<Option<Node>, TreeError> {
        Ok(self.select_one("lft = ?", vec![Value::Integer(lft)])?)
    }

    fn fetch_by_right(&self, rgt: i64) -> Result<Option<Node>, TreeError> {
        Ok(self.select_one("rgt = ?", vec![Value::Integer(rgt)])?)
    }

    fn fetch_by_content(&self, field: &str, value: &FieldValue) -> Result<Vec<Node>, TreeError> {
        self.layout.schema().require_field(field)?;
        if value.is_null() {
            return Ok(self.select_many(&format!("{field} IS NULL"), Vec::new())?);
        }
        Ok(self.select_many(&format!("{field} = ?"), vec![sql_value(value)])?)
    }

    fn fetch_all(&self) -> Result<Vec<Node>, TreeError> {
        Ok(self.select_many("1 = 1", Vec::new())?)
    }

    fn count_rows(&self) -> Result<usize, TreeError> {
        let sql = format!(
            "SELECT COUNT(1) FROM {} WHERE 1 = 1{}",
            self.layout.table(),
            self.layout.scope_clause()
        );
        let count = self
            .conn
            .query_row(&sql, params_from_iter(self.layout.bind(Vec::new())), |row| {
                row.get::<_, i64>(0)
            })
            .map_err(StoreError::from)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// One open `BEGIN IMMEDIATE` transaction. Dropping it without commit rolls back.
#[derive(Debug)]
pub struct SqliteTx<'c> {
    pub(crate) tx: Transaction<'c>,
    pub(crate) layout: &'c TableLayout,
}

impl SqliteTx<'_> {
    fn reader(&self) -> SqliteReader<'_> {
        SqliteReader::new(&self.tx, self.layout)
    }

    /// Runs `statement WHERE predicate` within the scope. `params` covers both, in text order.
    fn execute_scoped(
        &self,
        statement: &str,
        predicate: &str,
        params: Vec<Value>,
    ) -> Result<usize, StoreError> {
        let sql = format!("{statement} WHERE {predicate}{}", self.layout.scope_clause());
        let mut stmt = self.tx.prepare_cached(&sql)?;
        Ok(stmt.execute(params_from_iter(self.layout.bind(params)))?)
    }
}

impl IntervalReads for SqliteTx<'_> {
    fn fetch_by_id(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        self.reader().fetch_by_id(id)
    }

    fn fetch_by_interval(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        self.reader().fetch_by_interval(interval)
    }

    fn fetch_containing(&self, interval: Interval) -> Result<Vec<Node>, TreeError> {
        self.reader().fetch_containing(interval)
    }

    fn fetch_by_parent(&self, parents: &[NodeId]) -> Result<Vec<Node>, TreeError> {
        self.reader().fetch_by_parent(parents)
    }

    fn fetch_by_left(&self, lft: i64) -> Result<Option<Node>, TreeError> {
        self.reader().fetch_by_left(lft)
    }

    fn fetch_by_right(&self, rgt: i64) -> Result<Option<Node>, TreeError> {
        self.reader().fetch_by_right(rgt)
    }

    fn fetch_by_content(&self, field: &str, value: &FieldValue) -> Result<Vec<Node>, TreeError> {
        self.reader().fetch_by_content(field, value)
    }

    fn fetch_all(&self) -> Result<Vec<Node>, TreeError> {
        self.reader().fetch_all()
    }

    fn count_rows(&self) -> Result<usize, TreeError> {
        self.reader().count_rows()
    }
}

impl IntervalOps for SqliteTx<'_> {
    type Reads = Self;

    fn reads(&self) -> &Self::Reads {
        self
    }

    fn shift_left_boundaries_after(
        &mut self,
        threshold: i64,
        delta: i64,
    ) -> Result<usize, TreeError> {
        let statement = format!("UPDATE {} SET lft = lft + ?", self.layout.table());
        Ok(self.execute_scoped(
            &statement,
            "lft > ?",
            vec![Value::Integer(delta), Value::Integer(threshold)],
        )?)
    }

    fn shift_right_boundaries_after(
        &mut self,
        threshold: i64,
        delta: i64,
    ) -> Result<usize, TreeError> {
        let statement = format!("UPDATE {} SET rgt = rgt + ?", self.layout.table());
        Ok(self.execute_scoped(
            &statement,
            "rgt > ?",
            vec![Value::Integer(delta), Value::Integer(threshold)],
        )?)
    }

    fn shift_interval(&mut self, interval: Interval, offset: i64) -> Result<usize, TreeError> {
        let statement = format!(
            "UPDATE {} SET lft = lft + ?, rgt = rgt + ?",
            self.layout.table()
        );
        Ok(self.execute_scoped(
            &statement,
            "lft >= ? AND rgt <= ?",
            vec![
                Value::Integer(offset),
                Value::Integer(offset),
                Value::Integer(interval.lft),
                Value::Integer(interval.rgt),
            ],
        )?)
    }

    fn insert_row(&mut self, row: NewRow) -> Result<NodeId, TreeError> {
        let layout = self.layout;
        let mut columns = vec!["parent_id", "lft", "rgt"];
        let mut params = vec![
            row.parent_id
                .map(|id| Value::Integer(id.get()))
                .unwrap_or(Value::Null),
            Value::Integer(row.interval.lft),
            Value::Integer(row.interval.rgt),
        ];
        for (name, _) in layout.schema().fields() {
            columns.push(name);
            params.push(
                row.content
                    .get(name)
                    .map(sql_value)
                    .unwrap_or(Value::Null),
            );
        }
        if let Some(scope) = layout.scope() {
            columns.push(scope.column.as_str());
            params.push(sql_value(&scope.value));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            layout.table(),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        self.tx
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute(params_from_iter(params)))
            .map_err(StoreError::from)?;
        Ok(NodeId::new(self.tx.last_insert_rowid()))
    }

    fn set_parent(&mut self, id: NodeId, parent_id: Option<NodeId>) -> Result<bool, TreeError> {
        let statement = format!("UPDATE {} SET parent_id = ?", self.layout.table());
        let parent = parent_id
            .map(|id| Value::Integer(id.get()))
            .unwrap_or(Value::Null);
        let changed =
            self.execute_scoped(&statement, "id = ?", vec![parent, Value::Integer(id.get())])?;
        Ok(changed > 0)
    }

    fn update_content(&mut self, id: NodeId, content: &Content) -> Result<bool, TreeError> {
        if content.is_empty() {
            return Ok(self.fetch_by_id(id)?.is_some());
        }
        let schema = self.layout.schema();
        let mut assignments = Vec::with_capacity(content.len());
        let mut params = Vec::with_capacity(content.len() + 1);
        for (name, value) in content {
            schema.require_field(name)?;
            assignments.push(format!("{name} = ?"));
            params.push(sql_value(value));
        }
        params.push(Value::Integer(id.get()));

        let statement = format!(
            "UPDATE {} SET {}",
            self.layout.table(),
            assignments.join(", ")
        );
        let changed = self.execute_scoped(&statement, "id = ?", params)?;
        Ok(changed > 0)
    }

    fn delete_rows_in_interval(&mut self, interval: Interval) -> Result<usize, TreeError> {
        let statement = format!("DELETE FROM {}", self.layout.table());
        Ok(self.execute_scoped(
            &statement,
            "lft >= ? AND rgt <= ?",
            vec![Value::Integer(interval.lft), Value::Integer(interval.rgt)],
        )?)
    }
}
