//! Core data model types.
//!
//! A [`DataSet`] is a column-major table described by a [`Schema`] (a list of typed [`Field`]s).
//! Cells are [`Value`]s, a tagged variant that can hold scalars, lists, numeric arrays and
//! dictionaries, so that JSON-shaped records can be represented without loss before they are
//! normalized for a columnar writer.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{TableError, TableResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Arbitrary/mixed values (lists, dictionaries, or scalars of different kinds).
    ///
    /// Only `Object` columns are scanned by [`crate::normalize`]; every other type is treated as
    /// "declared as a single scalar type" and left alone.
    Object,
}

impl DataType {
    /// Returns `true` for the single-scalar types (everything except [`DataType::Object`]).
    pub fn is_primitive(&self) -> bool {
        !matches!(self, DataType::Object)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single cell value in a [`DataSet`].
///
/// Container payloads are reference counted. Cloning a `Value::List` or `Value::Dict` shares the
/// payload, and [`Arc::ptr_eq`] can tell whether a normalization pass reallocated a container.
///
/// Equality treats two `NaN` floats as equal so whole tables can be compared.
///
/// Dictionaries keep their keys sorted, not in document order. Writers that derive struct field
/// order from the first entry therefore see the same order for every row.
#[derive(Debug, Clone)]
pub enum Value {
    /// Structural absence (`null`).
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float. `NaN` is the default missing-value sentinel.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string. Never list-like.
    Utf8(String),
    /// Ordered list of values.
    List(Arc<Vec<Value>>),
    /// Dense numeric array (list-like only when extended list kinds are enabled).
    Float64Array(Arc<Vec<f64>>),
    /// String-keyed dictionary. Never list-like.
    Dict(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Build a `Value::List` from owned elements.
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(values.into_iter().collect()))
    }

    /// Build a `Value::Dict` from `(key, value)` pairs.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a `Value::Float64Array`.
    pub fn float_array(values: impl IntoIterator<Item = f64>) -> Self {
        Value::Float64Array(Arc::new(values.into_iter().collect()))
    }

    /// The `NaN` missing sentinel.
    pub fn nan() -> Self {
        Value::Float64(f64::NAN)
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for lists, numeric arrays and dictionaries.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Float64Array(_) | Value::Dict(_))
    }

    /// Borrow the list payload, if this is a `Value::List`.
    pub fn as_list(&self) -> Option<&Arc<Vec<Value>>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the dictionary payload, if this is a `Value::Dict`.
    pub fn as_dict(&self) -> Option<&Arc<BTreeMap<String, Value>>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Convert a parsed JSON value into a cell value.
    ///
    /// Integers that fit in `i64` become [`Value::Int64`]; every other number becomes
    /// [`Value::Float64`], so unsigned integers above `i64::MAX` lose precision. Object keys come
    /// out sorted.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Utf8(s.clone()),
            serde_json::Value::Array(items) => Value::list(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::dict(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }

    /// Convert into a JSON value. Non-finite floats become JSON `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(i) => serde_json::Value::from(*i),
            Value::Float64(f) => float_to_json(*f),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Utf8(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Float64Array(items) => {
                serde_json::Value::Array(items.iter().copied().map(float_to_json).collect())
            }
            Value::Dict(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn float_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => float_eq(*a, *b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Float64Array(a), Value::Float64Array(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| float_eq(*x, *y)))
            }
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(Arc::new(v))
    }
}

/// In-memory tabular dataset.
///
/// Values are stored column-major, one `Vec<Value>` per [`Schema`] field, all of the same length.
/// Columns are only ever swapped out whole (see [`DataSet::replace_column`]), so a column is
/// either fully replaced or left exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing the columns.
    pub schema: Schema,
    columns: Vec<Vec<Value>>,
    row_count: usize,
}

impl DataSet {
    /// Create a dataset from a schema and one value vector per field.
    pub fn from_columns(schema: Schema, columns: Vec<Vec<Value>>) -> TableResult<Self> {
        check_unique_names(&schema)?;
        if columns.len() != schema.fields.len() {
            return Err(TableError::SchemaMismatch {
                message: format!(
                    "expected {} columns, got {}",
                    schema.fields.len(),
                    columns.len()
                ),
            });
        }

        let row_count = columns.first().map(Vec::len).unwrap_or(0);
        for (field, values) in schema.fields.iter().zip(columns.iter()) {
            if values.len() != row_count {
                return Err(TableError::LengthMismatch {
                    column: field.name.clone(),
                    expected: row_count,
                    actual: values.len(),
                });
            }
        }

        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    /// Create a dataset from row-major values in schema field order.
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> TableResult<Self> {
        check_unique_names(&schema)?;
        let width = schema.fields.len();
        let row_count = rows.len();
        let mut columns: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(row_count)).collect();

        for (idx0, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::SchemaMismatch {
                    message: format!(
                        "row {} has {} values, schema has {} fields",
                        idx0 + 1,
                        row.len(),
                        width
                    ),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        let idx = self.schema.index_of(name)?;
        self.column_at(idx)
    }

    /// Values of a column by position.
    pub fn column_at(&self, idx: usize) -> Option<&[Value]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    /// Iterate `(field, values)` pairs in schema order.
    pub fn columns(&self) -> impl Iterator<Item = (&Field, &[Value])> {
        self.schema
            .fields
            .iter()
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Materialize one row in schema order.
    pub fn row(&self, idx: usize) -> Option<Vec<Value>> {
        if idx >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| c[idx].clone()).collect())
    }

    /// Replace a column's values, returning the previous values.
    ///
    /// The replacement must have exactly [`DataSet::row_count`] values; otherwise the dataset is
    /// left untouched and an error is returned.
    pub fn replace_column(&mut self, name: &str, values: Vec<Value>) -> TableResult<Vec<Value>> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| TableError::ColumnNotFound {
                name: name.to_string(),
            })?;
        self.replace_column_at(idx, values)
    }

    /// Positional variant of [`DataSet::replace_column`].
    pub fn replace_column_at(&mut self, idx: usize, values: Vec<Value>) -> TableResult<Vec<Value>> {
        let name = match self.schema.fields.get(idx) {
            Some(field) => field.name.clone(),
            None => {
                return Err(TableError::ColumnNotFound {
                    name: format!("#{idx}"),
                });
            }
        };
        if values.len() != self.row_count {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.row_count,
                actual: values.len(),
            });
        }
        Ok(std::mem::replace(&mut self.columns[idx], values))
    }
}

fn check_unique_names(schema: &Schema) -> TableResult<()> {
    let mut seen = HashSet::new();
    for name in schema.field_names() {
        if !seen.insert(name) {
            return Err(TableError::SchemaMismatch {
                message: format!("duplicate column name '{name}'"),
            });
        }
    }
    Ok(())
}
