#![forbid(unsafe_code)]

use orgtree_core::{BranchEntry, Content, ContentSchema, FieldType, FieldValue, Node, TreeError};
use serde_json::{Map, Number, Value, json};

pub(crate) fn node_json(node: &Node) -> Value {
    json!({
        "id": node.id.get(),
        "parent_id": node.parent_id.map(|id| id.get()),
        "lft": node.interval.lft,
        "rgt": node.interval.rgt,
        "content": content_json(&node.content),
    })
}

pub(crate) fn nodes_json(nodes: &[Node]) -> Value {
    Value::Array(nodes.iter().map(node_json).collect())
}

pub(crate) fn branch_json(entries: &[BranchEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|entry| {
                let mut value = node_json(&entry.node);
                if let Value::Object(object) = &mut value {
                    object.insert("depth".to_string(), json!(entry.depth));
                }
                value
            })
            .collect(),
    )
}

fn content_json(content: &Content) -> Value {
    let mut object = Map::new();
    for (name, value) in content {
        object.insert(name.clone(), field_json(value));
    }
    Value::Object(object)
}

fn field_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Integer(number) => json!(number),
        FieldValue::Bool(flag) => Value::Bool(*flag),
        FieldValue::Real(number) => Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// Parses a JSON object into node content, reading numbers as the declared field type.
pub(crate) fn parse_content(text: &str, schema: &ContentSchema) -> Result<Content, TreeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| TreeError::invalid(format!("content is not valid JSON: {err}")))?;
    let Value::Object(object) = value else {
        return Err(TreeError::invalid("content must be a JSON object"));
    };

    let mut content = Content::new();
    for (name, value) in object {
        let field_type = schema.require_field(&name)?;
        let field = match (value, field_type) {
            (Value::Null, _) => FieldValue::Null,
            (Value::String(text), FieldType::Text) => FieldValue::Text(text),
            (Value::Bool(flag), FieldType::Bool) => FieldValue::Bool(flag),
            (Value::Number(number), FieldType::Integer) => number
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| TreeError::invalid(format!("field `{name}` expects integer")))?,
            (Value::Number(number), FieldType::Real) => number
                .as_f64()
                .map(FieldValue::Real)
                .ok_or_else(|| TreeError::invalid(format!("field `{name}` expects real")))?,
            (_, expected) => {
                return Err(TreeError::invalid(format!(
                    "field `{name}` expects {}",
                    expected.as_str()
                )));
            }
        };
        content.insert(name, field);
    }
    Ok(content)
}
