//! List-column normalization ahead of a columnar export.
//!
//! A strict columnar writer needs one element type per column. Tables built from JSON documents
//! often break that: a field is a scalar in one row and a list in the next, or a list of
//! dictionaries where one entry holds a key as a scalar and another as a list. This module
//! rewrites such columns so that:
//!
//! - a column that holds any list holds only lists and `Null` (scalars are wrapped, `NaN`
//!   sentinels become `Null`);
//! - in a list-of-dictionary column, a key that is a list anywhere is a list (or `Null`)
//!   everywhere it appears. Absent keys stay absent.
//!
//! Each `Object` column goes through the same stages:
//!
//! ```text
//! SCAN -> { SKIP | COERCE_SCALARS -> ANALYZE_ENTRIES -> { SKIP | NORMALIZE_ENTRIES } }
//! ```
//!
//! Columns declared with a primitive [`crate::types::DataType`] are never scanned. The pass never
//! fails: heterogeneity that cannot be resolved safely (for example a list mixing dictionaries
//! and scalars) leaves the column's entries untouched.
//!
//! ## Example
//!
//! ```rust
//! use columnar_normalize::normalize::{normalize_for_columnar, NormalizeOptions};
//! use columnar_normalize::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![Field::new("tags", DataType::Object)]);
//! let mut ds = DataSet::from_columns(
//!     schema,
//!     vec![vec![
//!         Value::Int64(1),
//!         Value::list(vec![Value::Int64(2), Value::Int64(3)]),
//!         Value::Null,
//!     ]],
//! )
//! .unwrap();
//!
//! normalize_for_columnar(&mut ds, &NormalizeOptions::default());
//!
//! assert_eq!(
//!     ds.column("tags").unwrap(),
//!     &[
//!         Value::list(vec![Value::Int64(1)]),
//!         Value::list(vec![Value::Int64(2), Value::Int64(3)]),
//!         Value::Null,
//!     ]
//! );
//! ```

pub mod classify;
pub mod coerce;
pub mod entries;
pub mod observer;
pub mod profile;
pub mod shape;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::types::{DataSet, Field, Value};

pub use classify::{classify_column, ColumnShape};
pub use coerce::{coerce_column, coerce_value};
pub use entries::{normalize_entries, normalize_entry, normalize_row, EntryPlan};
pub use observer::{CompositeObserver, JsonLinesObserver, NormalizeObserver, StdErrObserver, TracingObserver};
pub use profile::{collect_key_profiles, dict_list_rows, KeyProfile, KeyProfiles};
pub use shape::{ListKinds, MissingPredicate, NanIsMissing, ShapeRules};

/// Options controlling a normalization pass.
///
/// Use [`Default`] for common cases: detected list kinds, `NaN` as the only missing sentinel, no
/// observer.
#[derive(Clone)]
pub struct NormalizeOptions {
    /// Shapes treated as list-like.
    pub list_kinds: ListKinds,
    /// Missing-value predicate for scalars.
    pub missing: Arc<dyn MissingPredicate>,
    /// Optional observer for per-column reports.
    pub observer: Option<Arc<dyn NormalizeObserver>>,
}

impl NormalizeOptions {
    /// The shape rules these options describe.
    pub fn rules(&self) -> ShapeRules {
        ShapeRules::new(self.list_kinds, Arc::clone(&self.missing))
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            list_kinds: ListKinds::detected(),
            missing: Arc::new(NanIsMissing),
            observer: None,
        }
    }
}

impl fmt::Debug for NormalizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizeOptions")
            .field("list_kinds", &self.list_kinds)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// What happened to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ColumnAction {
    /// Declared with a primitive type; never scanned.
    SkippedTyped,
    /// Scanned; no list-valued cell.
    NoLists { shape: ColumnShape },
    /// Lists whose entries are not all dictionaries (or no non-null rows).
    ListOfScalars { shape: ColumnShape, coerced: bool },
    /// Lists of dictionaries; entries analyzed and possibly rewritten.
    ListOfDicts {
        shape: ColumnShape,
        coerced: bool,
        wrapped_keys: Vec<String>,
        nulled_keys: Vec<String>,
        rewritten_rows: usize,
    },
}

impl ColumnAction {
    /// Whether scalar-to-list coercion ran.
    pub fn coerced(&self) -> bool {
        match self {
            ColumnAction::ListOfScalars { coerced, .. } | ColumnAction::ListOfDicts { coerced, .. } => {
                *coerced
            }
            _ => false,
        }
    }
}

impl fmt::Display for ColumnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnAction::SkippedTyped => write!(f, "skipped (typed)"),
            ColumnAction::NoLists { .. } => write!(f, "no lists"),
            ColumnAction::ListOfScalars { coerced, .. } => {
                write!(f, "list of scalars coerced={coerced}")
            }
            ColumnAction::ListOfDicts {
                coerced,
                wrapped_keys,
                nulled_keys,
                rewritten_rows,
                ..
            } => write!(
                f,
                "list of dicts coerced={coerced} wrapped={wrapped_keys:?} nulled={nulled_keys:?} rows={rewritten_rows}"
            ),
        }
    }
}

/// Result of normalizing one column's values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOutcome {
    /// What was decided.
    pub action: ColumnAction,
    /// Replacement values, or `None` when the column is unchanged.
    pub values: Option<Vec<Value>>,
}

impl ColumnOutcome {
    fn unchanged(action: ColumnAction) -> Self {
        Self {
            action,
            values: None,
        }
    }
}

/// Per-column report passed to observers and returned by
/// [`normalize_for_columnar_with_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReport {
    /// Column name.
    pub column: String,
    /// What was decided for the column.
    #[serde(flatten)]
    pub action: ColumnAction,
    /// The column's values were replaced.
    pub changed: bool,
}

/// Totals over a whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeSummary {
    /// Columns in the table.
    pub columns: usize,
    /// `Object` columns that were scanned.
    pub scanned: usize,
    /// Columns where scalar-to-list coercion ran.
    pub coerced: usize,
    /// Columns whose values were replaced.
    pub rewritten: usize,
}

impl NormalizeSummary {
    /// Summarize a list of column reports.
    pub fn from_reports(reports: &[ColumnReport]) -> Self {
        let mut summary = Self {
            columns: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.action != ColumnAction::SkippedTyped {
                summary.scanned += 1;
            }
            if report.action.coerced() {
                summary.coerced += 1;
            }
            if report.changed {
                summary.rewritten += 1;
            }
        }
        summary
    }
}

impl fmt::Display for NormalizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "columns={} scanned={} coerced={} rewritten={}",
            self.columns, self.scanned, self.coerced, self.rewritten
        )
    }
}

/// Normalize one column's values.
///
/// The input is never modified; the outcome carries replacement values only when something
/// changed.
pub fn normalize_column(values: &[Value], rules: &ShapeRules) -> ColumnOutcome {
    let shape = classify_column(values, rules);
    if !shape.has_list {
        return ColumnOutcome::unchanged(ColumnAction::NoLists { shape });
    }

    let coerced = shape.needs_coercion().then(|| coerce_column(values, rules));
    let was_coerced = coerced.is_some();
    let current: &[Value] = coerced.as_deref().unwrap_or(values);

    let Some(rows) = dict_list_rows(current, rules) else {
        return ColumnOutcome {
            action: ColumnAction::ListOfScalars {
                shape,
                coerced: was_coerced,
            },
            values: coerced,
        };
    };

    // The profile must cover every row before any entry is rewritten.
    let profiles = collect_key_profiles(&rows, rules);
    let plan = EntryPlan::from_profiles(&profiles);
    let rewritten = normalize_entries(current, &plan, rules);

    let (values, rewritten_rows) = match rewritten {
        Some((out, n)) => (Some(out), n),
        None => (coerced, 0),
    };

    ColumnOutcome {
        action: ColumnAction::ListOfDicts {
            shape,
            coerced: was_coerced,
            wrapped_keys: plan.keys_to_wrap.into_iter().collect(),
            nulled_keys: plan.keys_with_nan.into_iter().collect(),
            rewritten_rows,
        },
        values,
    }
}

/// Normalize a column according to its declared field type.
///
/// Primitive-typed columns are skipped without looking at their values.
pub fn normalize_field(field: &Field, values: &[Value], rules: &ShapeRules) -> ColumnOutcome {
    if field.data_type.is_primitive() {
        return ColumnOutcome::unchanged(ColumnAction::SkippedTyped);
    }
    normalize_column(values, rules)
}

/// Normalize every column of `dataset` in place and return it for chaining.
pub fn normalize_for_columnar<'a>(dataset: &'a mut DataSet, options: &NormalizeOptions) -> &'a mut DataSet {
    normalize_for_columnar_with_report(dataset, options);
    dataset
}

/// Like [`normalize_for_columnar`], returning one [`ColumnReport`] per column in schema order.
pub fn normalize_for_columnar_with_report(
    dataset: &mut DataSet,
    options: &NormalizeOptions,
) -> Vec<ColumnReport> {
    let rules = options.rules();
    let observer = options.observer.as_deref();

    let mut reports = Vec::with_capacity(dataset.column_count());
    for idx in 0..dataset.column_count() {
        let outcome = match (dataset.schema.fields.get(idx), dataset.column_at(idx)) {
            (Some(field), Some(values)) => normalize_field(field, values, &rules),
            _ => continue,
        };
        reports.push(apply_outcome(dataset, idx, outcome, observer));
    }

    finish(&reports, observer);
    reports
}

/// Swap a column's values for the outcome's replacement (if any) and report it.
pub(crate) fn apply_outcome(
    dataset: &mut DataSet,
    idx: usize,
    outcome: ColumnOutcome,
    observer: Option<&dyn NormalizeObserver>,
) -> ColumnReport {
    let column = dataset
        .schema
        .fields
        .get(idx)
        .map(|f| f.name.clone())
        .unwrap_or_default();

    let mut changed = false;
    if let Some(values) = outcome.values {
        match dataset.replace_column_at(idx, values) {
            Ok(_) => changed = true,
            Err(err) => {
                tracing::error!(column = %column, error = %err, "normalized column rejected, left unchanged");
            }
        }
    }

    if changed {
        tracing::debug!(column = %column, action = %outcome.action, "normalized column");
    } else {
        tracing::trace!(column = %column, action = %outcome.action, "column unchanged");
    }

    let report = ColumnReport {
        column,
        action: outcome.action,
        changed,
    };
    if let Some(obs) = observer {
        obs.on_column(&report);
    }
    report
}

pub(crate) fn finish(reports: &[ColumnReport], observer: Option<&dyn NormalizeObserver>) -> NormalizeSummary {
    let summary = NormalizeSummary::from_reports(reports);
    if let Some(obs) = observer {
        obs.on_finished(&summary);
    }
    summary
}
