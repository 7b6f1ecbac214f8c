//! Key profiles for list-of-dictionary columns.

use std::collections::BTreeMap;

use serde::Serialize;

use super::shape::ShapeRules;
use crate::types::Value;

/// How one dictionary key was observed across every entry of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyProfile {
    /// The key's value was list-like at least once.
    pub has_list: bool,
    /// The key's value was a non-null, non-list value at least once.
    pub has_non_list: bool,
    /// The key's value was a missing sentinel (not `Null`) at least once.
    pub has_nan: bool,
}

/// Per-key profiles for one column, keyed by dictionary key.
pub type KeyProfiles = BTreeMap<String, KeyProfile>;

/// Collect the list payloads of a list-of-dictionary column.
///
/// Returns `None` (leave the column as list-of-scalar) when:
/// - a non-null value is not list-like,
/// - there are no non-null values,
/// - any list element is neither `Null` nor a dictionary.
///
/// Empty lists and empty numeric arrays contribute nothing and are accepted.
pub fn dict_list_rows<'a>(values: &'a [Value], rules: &ShapeRules) -> Option<Vec<&'a [Value]>> {
    let mut rows = Vec::new();
    let mut saw_list = false;
    for value in values {
        if rules.is_null(value) {
            continue;
        }
        match value {
            Value::List(items) => {
                saw_list = true;
                if !items.iter().all(|e| matches!(e, Value::Null | Value::Dict(_))) {
                    return None;
                }
                rows.push(items.as_slice());
            }
            Value::Float64Array(items) if rules.is_list(value) => {
                saw_list = true;
                if !items.is_empty() {
                    return None;
                }
            }
            _ => return None,
        }
    }
    saw_list.then_some(rows)
}

/// Profile every `(key, value)` pair of every dictionary entry.
pub fn collect_key_profiles(rows: &[&[Value]], rules: &ShapeRules) -> KeyProfiles {
    let mut profiles = KeyProfiles::new();
    for entry in rows.iter().flat_map(|row| row.iter()) {
        let Value::Dict(map) = entry else {
            continue;
        };
        for (key, nested) in map.iter() {
            let profile = profiles.entry(key.clone()).or_default();
            if rules.is_null(nested) {
                if rules.is_nan(nested) {
                    profile.has_nan = true;
                }
                continue;
            }
            if rules.is_list(nested) {
                profile.has_list = true;
            } else {
                profile.has_non_list = true;
            }
        }
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::{collect_key_profiles, dict_list_rows, KeyProfile};
    use crate::normalize::shape::ShapeRules;
    use crate::types::Value;

    fn entry(pairs: Vec<(&str, Value)>) -> Value {
        Value::dict(pairs)
    }

    #[test]
    fn rows_with_scalar_entries_are_not_dict_lists() {
        let rules = ShapeRules::default();
        let values = vec![
            Value::list(vec![entry(vec![("a", Value::Int64(1))])]),
            Value::list(vec![Value::Int64(2)]),
        ];
        assert!(dict_list_rows(&values, &rules).is_none());
    }

    #[test]
    fn null_entries_and_null_rows_are_tolerated() {
        let rules = ShapeRules::default();
        let values = vec![
            Value::Null,
            Value::list(vec![Value::Null, entry(vec![("a", Value::Int64(1))])]),
            Value::list(vec![]),
        ];
        let rows = dict_list_rows(&values, &rules).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn all_null_column_has_no_rows() {
        let rules = ShapeRules::default();
        assert!(dict_list_rows(&[Value::Null, Value::nan()], &rules).is_none());
    }

    #[test]
    fn bare_scalar_rows_disqualify_the_column() {
        let rules = ShapeRules::default();
        let values = vec![Value::list(vec![]), Value::Int64(1)];
        assert!(dict_list_rows(&values, &rules).is_none());
    }

    #[test]
    fn profiles_track_list_scalar_and_nan_separately() {
        let rules = ShapeRules::default();
        let values = vec![
            Value::list(vec![entry(vec![
                ("a", Value::Int64(1)),
                ("b", Value::list(vec![Value::Int64(1)])),
                ("c", Value::Null),
            ])]),
            Value::list(vec![entry(vec![
                ("a", Value::list(vec![Value::Int64(2), Value::Int64(3)])),
                ("b", Value::nan()),
            ])]),
        ];
        let rows = dict_list_rows(&values, &rules).unwrap();
        let profiles = collect_key_profiles(&rows, &rules);

        assert_eq!(
            profiles["a"],
            KeyProfile {
                has_list: true,
                has_non_list: true,
                has_nan: false,
            }
        );
        assert_eq!(
            profiles["b"],
            KeyProfile {
                has_list: true,
                has_non_list: false,
                has_nan: true,
            }
        );
        assert_eq!(profiles["c"], KeyProfile::default());
    }

    #[test]
    fn nested_dicts_and_strings_are_non_list() {
        let rules = ShapeRules::default();
        let values = vec![Value::list(vec![entry(vec![
            ("s", Value::from("x")),
            ("d", entry(vec![("z", Value::Int64(1))])),
        ])])];
        let rows = dict_list_rows(&values, &rules).unwrap();
        let profiles = collect_key_profiles(&rows, &rules);
        assert!(profiles["s"].has_non_list && !profiles["s"].has_list);
        assert!(profiles["d"].has_non_list && !profiles["d"].has_list);
    }
}
