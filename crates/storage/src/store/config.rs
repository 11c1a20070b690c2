#![forbid(unsafe_code)]

use super::{Scope, StoreError, TableLayout};
use orgtree_core::{ContentSchema, FieldType, FieldValue};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// On-disk description of one tree table.
///
/// ```json
/// { "table": "org", "fields": [{ "name": "name", "type": "text" }],
///   "scope": { "column": "tree_id", "value": 1 } }
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub scope: Option<ScopeConfig>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub column: String,
    pub value: serde_json::Value,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl TreeConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            scope: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldConfig {
            name: name.into(),
            field_type: field_type.as_str().to_string(),
        });
        self
    }

    pub fn with_scope(
        mut self,
        column: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.scope = Some(ScopeConfig {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn layout(&self) -> Result<TableLayout, StoreError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let field_type = FieldType::parse(&field.field_type).ok_or_else(|| {
                StoreError::InvalidInput(format!(
                    "field `{}`: unknown type `{}`",
                    field.name, field.field_type
                ))
            })?;
            fields.push((field.name.clone(), field_type));
        }
        let schema = ContentSchema::try_new(fields)?;

        let scope = match self.scope.as_ref() {
            Some(scope) => Some(Scope {
                column: scope.column.clone(),
                value: scope_value(&scope.value)?,
            }),
            None => None,
        };

        TableLayout::new(self.table.clone(), schema, scope)
    }
}

fn scope_value(value: &serde_json::Value) -> Result<FieldValue, StoreError> {
    match value {
        serde_json::Value::String(text) => Ok(FieldValue::Text(text.clone())),
        serde_json::Value::Bool(flag) => Ok(FieldValue::Bool(*flag)),
        serde_json::Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => Ok(FieldValue::Integer(integer)),
            (None, Some(real)) => Ok(FieldValue::Real(real)),
            (None, None) => Err(StoreError::InvalidInput(
                "scope value is out of range".to_string(),
            )),
        },
        _ => Err(StoreError::InvalidInput(
            "scope value must be a string, number or boolean".to_string(),
        )),
    }
}
