#![forbid(unsafe_code)]

//! SQLite persistence for nested-set trees.
//!
//! [`SqliteStore`] implements [`orgtree_core::IntervalStore`] over one table described by a
//! [`TreeConfig`]. Every engine mutation runs inside a `BEGIN IMMEDIATE` transaction.

mod store;

pub use store::{
    DEFAULT_BUSY_TIMEOUT_MS, FieldConfig, Scope, ScopeConfig, SqliteReader, SqliteStore, SqliteTx,
    StoreError, TableLayout, TreeConfig,
};
