//! Value coercion: rewrite every cell of a column to a list or `Null`.

use super::shape::ShapeRules;
use crate::types::Value;

/// Coerce one value to list-or-null.
///
/// - `Null` and missing sentinels become `Null`.
/// - A `List` is kept (its payload is shared, lists are immutable).
/// - A list-like numeric array becomes a `List` of `Float64`.
/// - Any other value, dictionaries included, is wrapped in a one-element list.
pub fn coerce_value(value: &Value, rules: &ShapeRules) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::List(_) => value.clone(),
        Value::Float64Array(items) if rules.is_list(value) => {
            Value::list(items.iter().copied().map(Value::Float64))
        }
        _ if rules.is_nan(value) => Value::Null,
        _ => Value::list(vec![value.clone()]),
    }
}

/// Coerce every value of a column. The result holds only `Null` and `List` values.
pub fn coerce_column(values: &[Value], rules: &ShapeRules) -> Vec<Value> {
    values.iter().map(|v| coerce_value(v, rules)).collect()
}
