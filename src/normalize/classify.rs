//! Column classification: does a column mix list and non-list values?

use serde::Serialize;

use super::shape::ShapeRules;
use crate::types::Value;

/// What a single scan of a column observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnShape {
    /// At least one value was list-like.
    pub has_list: bool,
    /// At least one non-null value was not list-like.
    pub has_non_list: bool,
    /// At least one value was a missing sentinel (not structural `Null`).
    pub has_nan: bool,
}

impl ColumnShape {
    /// Lists are present alongside scalars or missing sentinels.
    pub fn needs_coercion(&self) -> bool {
        self.has_list && (self.has_non_list || self.has_nan)
    }
}

/// Scan a column once and report its shape.
///
/// Stops once a list, a non-list value and a missing sentinel have all been seen. Until then the
/// scan continues so every flag reflects the whole column.
pub fn classify_column(values: &[Value], rules: &ShapeRules) -> ColumnShape {
    let mut shape = ColumnShape::default();
    for value in values {
        if rules.is_null(value) {
            if rules.is_nan(value) {
                shape.has_nan = true;
            }
            continue;
        }
        if rules.is_list(value) {
            shape.has_list = true;
        } else {
            shape.has_non_list = true;
        }
        if shape.has_list && shape.has_non_list && shape.has_nan {
            break;
        }
    }
    shape
}
