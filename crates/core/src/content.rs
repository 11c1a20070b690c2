#![forbid(unsafe_code)]

use crate::error::TreeError;
use std::collections::{BTreeMap, BTreeSet};

/// Columns owned by the tree encoding. Content fields may never use these names.
pub const RESERVED_COLUMNS: &[&str] = &["id", "parent_id", "lft", "rgt"];

const MAX_IDENTIFIER_LEN: usize = 64;

/// Caller-defined fields carried by a node. Absent keys mean "not set".
pub type Content = BTreeMap<String, FieldValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Real,
    Bool,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "bool",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "integer" | "int" => Some(Self::Integer),
            "real" | "float" => Some(Self::Real),
            "bool" | "boolean" => Some(Self::Bool),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(FieldType::Text),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::Real(_) => Some(FieldType::Real),
            Self::Bool(_) => Some(FieldType::Bool),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentifierError {
    Empty,
    TooLong,
    InvalidFirstChar,
    InvalidChar { ch: char, index: usize },
}

impl IdentifierError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "identifier must not be empty",
            Self::TooLong => "identifier is too long",
            Self::InvalidFirstChar => "identifier must start with a letter or '_'",
            Self::InvalidChar { .. } => "identifier may only contain [A-Za-z0-9_]",
        }
    }
}

/// Table and column names end up inside SQL text, so they are restricted to plain identifiers.
pub fn validate_identifier(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong);
    }
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(IdentifierError::Empty);
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(IdentifierError::InvalidFirstChar);
    }
    for (index, ch) in value.chars().enumerate().skip(1) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            continue;
        }
        return Err(IdentifierError::InvalidChar { ch, index });
    }
    Ok(())
}

/// Declared content columns of one tree table, in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentSchema {
    fields: Vec<(String, FieldType)>,
}

impl ContentSchema {
    pub fn try_new<I, N>(fields: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (N, FieldType)>,
        N: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for (name, field_type) in fields {
            let name = name.into();
            validate_identifier(&name).map_err(|err| {
                TreeError::InvalidInput(format!("field `{name}`: {}", err.message()))
            })?;
            if is_reserved(&name) {
                return Err(TreeError::InvalidInput(format!(
                    "field `{name}` collides with a tree column"
                )));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(TreeError::InvalidInput(format!(
                    "field `{name}` is declared twice"
                )));
            }
            out.push((name, field_type));
        }
        Ok(Self { fields: out })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> + '_ {
        self.fields
            .iter()
            .map(|(name, field_type)| (name.as_str(), *field_type))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, field_type)| *field_type)
    }

    pub fn require_field(&self, name: &str) -> Result<FieldType, TreeError> {
        self.field_type(name)
            .ok_or_else(|| TreeError::InvalidInput(format!("unknown content field `{name}`")))
    }

    /// Every key must be declared and every non-null value must carry the declared type.
    pub fn validate(&self, content: &Content) -> Result<(), TreeError> {
        for (name, value) in content {
            let expected = self.require_field(name)?;
            match value.field_type() {
                None => {}
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err(TreeError::InvalidInput(format!(
                        "field `{name}` expects {}, got {}",
                        expected.as_str(),
                        actual.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}
