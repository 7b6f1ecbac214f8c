//! Entry normalization for list-of-dictionary columns.
//!
//! Every rewrite is copy-on-write: a dictionary is cloned only when one of its keys changes, and a
//! row's list only when one of its entries changed. Untouched containers are returned as the same
//! `Arc`, so callers can check [`std::sync::Arc::ptr_eq`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::profile::KeyProfiles;
use super::shape::ShapeRules;
use crate::types::Value;

/// Keys that must be rewritten in a column, derived from its [`KeyProfiles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPlan {
    /// Keys seen both as lists and as scalars: scalar occurrences get wrapped.
    pub keys_to_wrap: BTreeSet<String>,
    /// Keys seen both as lists and as missing sentinels: sentinels become `Null`.
    pub keys_with_nan: BTreeSet<String>,
}

impl EntryPlan {
    /// Build the plan. Keys never seen as a list are left out.
    pub fn from_profiles(profiles: &KeyProfiles) -> Self {
        let mut plan = Self::default();
        for (key, profile) in profiles.iter().filter(|(_, p)| p.has_list) {
            if profile.has_non_list {
                plan.keys_to_wrap.insert(key.clone());
            }
            if profile.has_nan {
                plan.keys_with_nan.insert(key.clone());
            }
        }
        plan
    }

    /// Nothing to rewrite.
    pub fn is_empty(&self) -> bool {
        self.keys_to_wrap.is_empty() && self.keys_with_nan.is_empty()
    }
}

/// Rewrite one dictionary entry. Returns `None` when the entry is unchanged.
///
/// Keys absent from the entry stay absent.
pub fn normalize_entry(entry: &Value, plan: &EntryPlan, rules: &ShapeRules) -> Option<Value> {
    let Value::Dict(map) = entry else {
        return None;
    };

    let mut updated: Option<BTreeMap<String, Value>> = None;
    for (key, value) in map.iter() {
        if value.is_null() {
            continue;
        }
        let replacement = if plan.keys_with_nan.contains(key) && rules.is_nan(value) {
            Value::Null
        } else if plan.keys_to_wrap.contains(key) && !rules.is_list(value) && !rules.is_nan(value) {
            Value::list(vec![value.clone()])
        } else {
            continue;
        };
        updated
            .get_or_insert_with(|| map.as_ref().clone())
            .insert(key.clone(), replacement);
    }
    updated.map(|m| Value::Dict(Arc::new(m)))
}

/// Rewrite the entries of one row. Returns `None` when no entry changed.
pub fn normalize_row(value: &Value, plan: &EntryPlan, rules: &ShapeRules) -> Option<Value> {
    let Value::List(items) = value else {
        return None;
    };

    let mut updated: Option<Vec<Value>> = None;
    for (idx, entry) in items.iter().enumerate() {
        if let Some(new_entry) = normalize_entry(entry, plan, rules) {
            updated.get_or_insert_with(|| items.as_ref().clone())[idx] = new_entry;
        }
    }
    updated.map(|v| Value::List(Arc::new(v)))
}

/// Rewrite a whole column.
///
/// Returns the new column and the number of rewritten rows, or `None` when the plan is empty or no
/// row changed.
pub fn normalize_entries(
    values: &[Value],
    plan: &EntryPlan,
    rules: &ShapeRules,
) -> Option<(Vec<Value>, usize)> {
    if plan.is_empty() {
        return None;
    }

    let mut rewritten = 0usize;
    let out: Vec<Value> = values
        .iter()
        .map(|v| match normalize_row(v, plan, rules) {
            Some(new_row) => {
                rewritten += 1;
                new_row
            }
            None => v.clone(),
        })
        .collect();

    (rewritten > 0).then_some((out, rewritten))
}
