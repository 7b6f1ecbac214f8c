//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object: `{"a":1}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested objects are addressed with dot paths in schema field names (e.g. `user.name`). Arrays are
//! never descended into: an array-valued field lands in a single [`DataType::Object`] cell.
//!
//! Documents are sparse: a field missing from a document becomes [`Value::Null`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{TableError, TableResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Ingest JSON from a file into an in-memory [`DataSet`].
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> TableResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, schema)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> TableResult<DataSet> {
    let documents = parse_json_documents(input)?;
    ingest_json_values(&documents, schema)
}

/// Infer a schema from the documents, then ingest them.
pub fn ingest_json_inferred(input: &str) -> TableResult<DataSet> {
    let documents = parse_json_documents(input)?;
    let schema = infer_schema(&documents)?;
    ingest_json_values(&documents, &schema)
}

/// Infer a [`Schema`] from JSON documents.
///
/// Columns are the dot paths of every non-object leaf, in first-seen order. A column whose non-null
/// values all share one primitive kind gets that type (integers mixed with floats widen to
/// `Float64`); anything else, including arrays and all-null columns, is `Object`. A path that holds
/// an object in some documents and a non-null value in others is `Object` too.
pub fn infer_schema_from_json_str(input: &str) -> TableResult<Schema> {
    let documents = parse_json_documents(input)?;
    infer_schema(&documents)
}

fn parse_json_documents(input: &str) -> TableResult<Vec<serde_json::Value>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TableError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return match v {
            serde_json::Value::Array(items) => Ok(items),
            serde_json::Value::Object(_) => Ok(vec![v]),
            _ => Err(TableError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        };
    }

    // Fall back to NDJSON.
    let mut values = Vec::new();
    for (i, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
            TableError::SchemaMismatch {
                message: format!("invalid ndjson at line {}: {}", i + 1, e),
            }
        })?;
        values.push(v);
    }
    Ok(values)
}

fn document_object(
    row_num: usize,
    v: &serde_json::Value,
) -> TableResult<&serde_json::Map<String, serde_json::Value>> {
    v.as_object().ok_or_else(|| TableError::SchemaMismatch {
        message: format!("row {row_num} is not a json object"),
    })
}

fn ingest_json_values(values: &[serde_json::Value], schema: &Schema) -> TableResult<DataSet> {
    let mut columns: Vec<Vec<Value>> = schema
        .fields
        .iter()
        .map(|_| Vec::with_capacity(values.len()))
        .collect();

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = document_object(row_num, v)?;

        for (field, column) in schema.fields.iter().zip(columns.iter_mut()) {
            let value = match get_by_dot_path(obj, &field.name) {
                Some(jv) => convert_json_value(row_num, &field.name, &field.data_type, jv)?,
                None => Value::Null,
            };
            column.push(value);
        }
    }

    DataSet::from_columns(schema.clone(), columns)
}

fn get_by_dot_path<'a>(
    root: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    // Literal keys win over nested lookup.
    if let Some(v) = root.get(path) {
        return Some(v);
    }

    let mut segments = path.split('.');
    let mut current: &serde_json::Value = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    v: &serde_json::Value,
) -> TableResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    let parse_error = |message: &str| TableError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Object => Ok(Value::from_json(v)),
        DataType::Utf8 => v
            .as_str()
            .map(|s| Value::Utf8(s.to_string()))
            .ok_or_else(|| parse_error("expected string")),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| parse_error("expected bool")),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if v.as_u64().is_some() {
                Err(parse_error("u64 out of range for i64"))
            } else {
                Err(parse_error("expected integer number"))
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| parse_error("expected number")),
    }
}

/// Observed kind of a column during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unset,
    Int,
    Float,
    Bool,
    Str,
    Mixed,
}

impl Kind {
    fn of(v: &serde_json::Value) -> Option<Kind> {
        match v {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(_) => Some(Kind::Bool),
            serde_json::Value::Number(n) if n.is_i64() => Some(Kind::Int),
            serde_json::Value::Number(_) => Some(Kind::Float),
            serde_json::Value::String(_) => Some(Kind::Str),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Some(Kind::Mixed),
        }
    }

    fn merge(self, other: Kind) -> Kind {
        match (self, other) {
            (Kind::Unset, k) => k,
            (a, b) if a == b => a,
            (Kind::Int, Kind::Float) | (Kind::Float, Kind::Int) => Kind::Float,
            _ => Kind::Mixed,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Kind::Int => DataType::Int64,
            Kind::Float => DataType::Float64,
            Kind::Bool => DataType::Bool,
            Kind::Str => DataType::Utf8,
            Kind::Unset | Kind::Mixed => DataType::Object,
        }
    }
}

/// Inference state for one dot path.
struct PathSlot {
    name: String,
    kind: Kind,
    /// Some document held an object at this path.
    branch: bool,
}

impl PathSlot {
    /// Paths that only ever hold objects (or null) are covered by their children. A path that is an
    /// object in one document and a value in another keeps both: the whole cell as `Object`, plus
    /// the nested columns.
    fn field(&self) -> Option<Field> {
        match (self.branch, self.kind) {
            (true, Kind::Unset) => None,
            (true, _) => Some(Field::new(self.name.clone(), DataType::Object)),
            (false, kind) => Some(Field::new(self.name.clone(), kind.data_type())),
        }
    }
}

enum Node<'a> {
    Leaf(String, &'a serde_json::Value),
    Branch(String),
}

fn infer_schema(documents: &[serde_json::Value]) -> TableResult<Schema> {
    let mut slots: Vec<PathSlot> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (idx0, v) in documents.iter().enumerate() {
        let obj = document_object(idx0 + 1, v)?;
        let mut nodes = Vec::new();
        flatten_paths("", obj, &mut nodes);

        for node in nodes {
            let path = match &node {
                Node::Leaf(path, _) | Node::Branch(path) => path,
            };
            let slot = match index.get(path) {
                Some(&slot) => slot,
                None => {
                    slots.push(PathSlot {
                        name: path.clone(),
                        kind: Kind::Unset,
                        branch: false,
                    });
                    index.insert(path.clone(), slots.len() - 1);
                    slots.len() - 1
                }
            };
            match node {
                Node::Branch(_) => slots[slot].branch = true,
                Node::Leaf(_, leaf) => {
                    if let Some(kind) = Kind::of(leaf) {
                        slots[slot].kind = slots[slot].kind.merge(kind);
                    }
                }
            }
        }
    }

    Ok(Schema::new(slots.iter().filter_map(PathSlot::field).collect()))
}

fn flatten_paths<'a>(
    prefix: &str,
    obj: &'a serde_json::Map<String, serde_json::Value>,
    out: &mut Vec<Node<'a>>,
) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            serde_json::Value::Object(nested) if !nested.is_empty() => {
                out.push(Node::Branch(path.clone()));
                flatten_paths(&path, nested, out);
            }
            _ => out.push(Node::Leaf(path, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{get_by_dot_path, infer_schema_from_json_str};
    use crate::types::DataType;

    #[test]
    fn dot_path_prefers_literal_keys() {
        let v: serde_json::Value =
            serde_json::from_str(r#"{"a.b":1,"a":{"b":2}}"#).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(get_by_dot_path(obj, "a.b"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn inference_widens_ints_to_floats_and_mixes_to_object() {
        let schema = infer_schema_from_json_str(
            r#"[{"n":1,"m":1,"s":"x"},{"n":2.5,"m":"y","s":null}]"#,
        )
        .unwrap();
        let type_of = |name: &str| {
            let idx = schema.index_of(name).unwrap();
            schema.fields[idx].data_type.clone()
        };
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(type_of("n"), DataType::Float64);
        assert_eq!(type_of("m"), DataType::Object);
        assert_eq!(type_of("s"), DataType::Utf8);
    }
}
