#![forbid(unsafe_code)]

mod config;
mod error;
mod layout;
mod rows;

pub use config::{DEFAULT_BUSY_TIMEOUT_MS, FieldConfig, ScopeConfig, TreeConfig};
pub use error::StoreError;
pub use layout::{Scope, TableLayout};
pub use rows::{SqliteReader, SqliteTx};

use layout::{scope_sql_type, sql_type};
use orgtree_core::{ContentSchema, IntervalStore, TreeError};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    layout: TableLayout,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>, config: &TreeConfig) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(dir) = db_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(&db_path)?;
        Self::attach(conn, config, Some(db_path))
    }

    pub fn open_in_memory(config: &TreeConfig) -> Result<Self, StoreError> {
        Self::attach(Connection::open_in_memory()?, config, None)
    }

    fn attach(
        conn: Connection,
        config: &TreeConfig,
        db_path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let layout = config.layout()?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        preflight_gate(&conn, &layout)?;
        install_schema(&conn, &layout)?;
        debug!(
            table = layout.table(),
            scoped = layout.scope().is_some(),
            "tree table ready"
        );

        Ok(Self {
            conn,
            layout,
            db_path,
        })
    }

    /// `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }
}

impl IntervalStore for SqliteStore {
    type Reader<'s> = SqliteReader<'s>;
    type Tx<'s> = SqliteTx<'s>;

    fn schema(&self) -> &ContentSchema {
        self.layout.schema()
    }

    fn reader(&self) -> Self::Reader<'_> {
        SqliteReader::new(&self.conn, &self.layout)
    }

    fn with_transaction<'s, T, F>(&'s mut self, body: F) -> Result<T, TreeError>
    where
        F: FnOnce(&mut Self::Tx<'s>) -> Result<T, TreeError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let mut handle = SqliteTx {
            tx,
            layout: &self.layout,
        };

        match body(&mut handle) {
            Ok(value) => {
                handle.tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                warn!(table = self.layout.table(), error = %err, "transaction rolled back");
                if let Err(rollback) = handle.tx.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// An existing table must carry every column the layout names; extra columns are fine.
fn preflight_gate(conn: &Connection, layout: &TableLayout) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", layout.table()))?;
    let mut rows = stmt.query([])?;
    let mut columns = BTreeSet::new();
    while let Some(row) = rows.next()? {
        columns.insert(row.get::<_, String>(1)?.to_ascii_lowercase());
    }

    if columns.is_empty() {
        return Ok(());
    }

    for column in layout.required_columns() {
        if !columns.contains(&column.to_ascii_lowercase()) {
            return Err(StoreError::MissingColumn {
                table: layout.table().to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn install_schema(conn: &Connection, layout: &TableLayout) -> Result<(), StoreError> {
    let table = layout.table();
    let mut columns = vec![
        "id INTEGER PRIMARY KEY".to_string(),
        "parent_id INTEGER".to_string(),
        "lft INTEGER NOT NULL".to_string(),
        "rgt INTEGER NOT NULL".to_string(),
    ];
    for (name, field_type) in layout.schema().fields() {
        columns.push(format!("{name} {}", sql_type(field_type)));
    }
    let index_prefix = match layout.scope() {
        Some(scope) => {
            columns.push(format!(
                "{} {} NOT NULL",
                scope.column,
                scope_sql_type(&scope.value)
            ));
            format!("{}, ", scope.column)
        }
        None => String::new(),
    };
    columns.push("CHECK(lft < rgt)".to_string());

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
          {columns}
        );

        CREATE INDEX IF NOT EXISTS idx_{table}_lft ON {table}({index_prefix}lft);
        CREATE INDEX IF NOT EXISTS idx_{table}_rgt ON {table}({index_prefix}rgt);
        CREATE INDEX IF NOT EXISTS idx_{table}_parent ON {table}({index_prefix}parent_id);
        "#,
        columns = columns.join(",\n          ")
    ))?;
    Ok(())
}
