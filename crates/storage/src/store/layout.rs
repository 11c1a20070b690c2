#![forbid(unsafe_code)]

use super::StoreError;
use orgtree_core::ids::NodeId;
use orgtree_core::{
    Content, ContentSchema, FieldType, FieldValue, Interval, Node, RESERVED_COLUMNS,
    validate_identifier,
};
use rusqlite::Row;
use rusqlite::types::Value;

/// `id, parent_id, lft, rgt` precede the content columns in every select list.
const TREE_COLUMNS: usize = 4;

/// Extra equality filter that lets several trees share one table.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope {
    pub column: String,
    pub value: FieldValue,
}

/// Table name, content columns and optional scope of one tree.
#[derive(Clone, Debug)]
pub struct TableLayout {
    table: String,
    schema: ContentSchema,
    scope: Option<Scope>,
    select_list: String,
}

impl TableLayout {
    pub fn new(
        table: impl Into<String>,
        schema: ContentSchema,
        scope: Option<Scope>,
    ) -> Result<Self, StoreError> {
        let table = table.into();
        validate_identifier(&table).map_err(|err| {
            StoreError::InvalidInput(format!("table `{table}`: {}", err.message()))
        })?;

        if let Some(scope) = scope.as_ref() {
            validate_identifier(&scope.column).map_err(|err| {
                StoreError::InvalidInput(format!("scope column `{}`: {}", scope.column, err.message()))
            })?;
            let clashes_with_tree = RESERVED_COLUMNS
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(&scope.column));
            let clashes_with_content = schema
                .fields()
                .any(|(name, _)| name.eq_ignore_ascii_case(&scope.column));
            if clashes_with_tree || clashes_with_content {
                return Err(StoreError::InvalidInput(format!(
                    "scope column `{}` collides with another column",
                    scope.column
                )));
            }
            if scope.value.is_null() {
                return Err(StoreError::InvalidInput(
                    "scope value must not be null".to_string(),
                ));
            }
        }

        let mut columns = RESERVED_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        columns.extend(schema.fields().map(|(name, _)| name.to_string()));
        let select_list = columns.join(", ");

        Ok(Self {
            table,
            schema,
            scope,
            select_list,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &ContentSchema {
        &self.schema
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Every column the table must carry.
    pub(crate) fn required_columns(&self) -> Vec<&str> {
        let mut columns = RESERVED_COLUMNS.to_vec();
        columns.extend(self.schema.fields().map(|(name, _)| name));
        if let Some(scope) = self.scope.as_ref() {
            columns.push(scope.column.as_str());
        }
        columns
    }

    /// `SELECT` of full rows matching `predicate` within the scope, ordered by `lft`.
    pub(crate) fn select(&self, predicate: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {predicate}{} ORDER BY lft",
            self.select_list,
            self.table,
            self.scope_clause()
        )
    }

    /// ` AND <column> = ?` when scoped, empty otherwise. Its parameter comes from [`Self::bind`].
    pub(crate) fn scope_clause(&self) -> String {
        match self.scope.as_ref() {
            Some(scope) => format!(" AND {} = ?", scope.column),
            None => String::new(),
        }
    }

    /// Appends the scope parameter, matching [`Self::scope_clause`].
    pub(crate) fn bind(&self, mut params: Vec<Value>) -> Vec<Value> {
        if let Some(scope) = self.scope.as_ref() {
            params.push(sql_value(&scope.value));
        }
        params
    }

    pub(crate) fn decode(&self, row: &Row<'_>) -> rusqlite::Result<Node> {
        let mut content = Content::new();
        for (offset, (name, field_type)) in self.schema.fields().enumerate() {
            let index = TREE_COLUMNS + offset;
            let value = match field_type {
                FieldType::Text => row.get::<_, Option<String>>(index)?.map(FieldValue::Text),
                FieldType::Integer => row.get::<_, Option<i64>>(index)?.map(FieldValue::Integer),
                FieldType::Real => row.get::<_, Option<f64>>(index)?.map(FieldValue::Real),
                FieldType::Bool => row.get::<_, Option<bool>>(index)?.map(FieldValue::Bool),
            };
            if let Some(value) = value {
                content.insert(name.to_string(), value);
            }
        }

        Ok(Node {
            id: NodeId::new(row.get(0)?),
            parent_id: row.get::<_, Option<i64>>(1)?.map(NodeId::new),
            interval: Interval::new(row.get(2)?, row.get(3)?),
            content,
        })
    }
}

pub(crate) fn sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Real(number) => Value::Real(*number),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
    }
}

pub(crate) fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "TEXT",
        FieldType::Integer | FieldType::Bool => "INTEGER",
        FieldType::Real => "REAL",
    }
}

/// Type of the scope column, derived from its value.
pub(crate) fn scope_sql_type(value: &FieldValue) -> &'static str {
    value.field_type().map(sql_type).unwrap_or("TEXT")
}
