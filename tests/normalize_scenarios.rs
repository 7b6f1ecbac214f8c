use std::sync::{Arc, Mutex};

use columnar_normalize::normalize::{
    normalize_for_columnar, normalize_for_columnar_with_report, ColumnAction, ColumnReport, ListKinds,
    NanIsMissing, NormalizeObserver, NormalizeOptions, NormalizeSummary,
};
use columnar_normalize::types::{DataSet, DataType, Field, Schema, Value};

fn object_table(values: Vec<Value>) -> DataSet {
    let schema = Schema::new(vec![Field::new("col", DataType::Object)]);
    DataSet::from_columns(schema, vec![values]).unwrap()
}

fn normalized(values: Vec<Value>) -> Vec<Value> {
    let mut ds = object_table(values);
    normalize_for_columnar(&mut ds, &NormalizeOptions::default());
    ds.column("col").unwrap().to_vec()
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().copied().map(Value::Int64))
}

#[test]
fn scalar_next_to_list_is_wrapped() {
    let out = normalized(vec![Value::Int64(1), ints(&[2, 3]), Value::Null]);
    assert_eq!(out, vec![ints(&[1]), ints(&[2, 3]), Value::Null]);
}

#[test]
fn nan_next_to_list_becomes_null() {
    let out = normalized(vec![Value::nan(), ints(&[1])]);
    assert_eq!(out, vec![Value::Null, ints(&[1])]);
}

#[test]
fn dict_key_seen_as_scalar_and_list_is_wrapped() {
    let out = normalized(vec![
        Value::list(vec![Value::dict(vec![("a", Value::Int64(1))])]),
        Value::list(vec![Value::dict(vec![("a", ints(&[2, 3]))])]),
    ]);
    assert_eq!(
        out,
        vec![
            Value::list(vec![Value::dict(vec![("a", ints(&[1]))])]),
            Value::list(vec![Value::dict(vec![("a", ints(&[2, 3]))])]),
        ]
    );
}

#[test]
fn dict_key_seen_as_list_and_nan_becomes_null() {
    let out = normalized(vec![
        Value::list(vec![Value::dict(vec![("a", ints(&[1]))])]),
        Value::list(vec![Value::dict(vec![("a", Value::nan())])]),
    ]);
    assert_eq!(
        out[1],
        Value::list(vec![Value::dict(vec![("a", Value::Null)])])
    );
}

#[test]
fn plain_dictionary_column_is_unchanged() {
    let values = vec![
        Value::dict(vec![("a", Value::Int64(1))]),
        Value::dict(vec![("a", ints(&[1, 2]))]),
        Value::Null,
    ];
    let mut ds = object_table(values.clone());
    let reports = normalize_for_columnar_with_report(&mut ds, &NormalizeOptions::default());

    assert_eq!(ds.column("col").unwrap(), values.as_slice());
    assert!(matches!(reports[0].action, ColumnAction::NoLists { .. }));
    assert!(!reports[0].changed);
}

#[test]
fn primitive_typed_columns_are_skipped() {
    let schema = Schema::new(vec![
        Field::new("score", DataType::Float64),
        Field::new("odd", DataType::Int64),
    ]);
    // Declared types win even if a caller stored a list in a typed column.
    let columns = vec![
        vec![Value::Float64(1.0), Value::nan(), Value::Null],
        vec![Value::Int64(1), ints(&[2]), Value::Null],
    ];
    let mut ds = DataSet::from_columns(schema, columns).unwrap();
    let before = ds.clone();

    let reports = normalize_for_columnar_with_report(&mut ds, &NormalizeOptions::default());

    assert_eq!(ds, before);
    assert!(reports.iter().all(|r| r.action == ColumnAction::SkippedTyped));
}

#[test]
fn absent_keys_are_not_materialized() {
    let out = normalized(vec![
        Value::list(vec![Value::dict(vec![("a", Value::Int64(1))])]),
        Value::list(vec![Value::dict(vec![("b", Value::Int64(2))])]),
        Value::list(vec![Value::dict(vec![("a", ints(&[3]))])]),
    ]);
    assert_eq!(
        out[1],
        Value::list(vec![Value::dict(vec![("b", Value::Int64(2))])])
    );
    assert!(!out[1].as_list().unwrap()[0].as_dict().unwrap().contains_key("a"));
}

#[test]
fn mixed_list_entries_leave_entries_untouched() {
    let values = vec![
        Value::list(vec![Value::dict(vec![("a", Value::Int64(1))]), Value::Int64(5)]),
        Value::list(vec![Value::dict(vec![("a", ints(&[2]))])]),
    ];
    let mut ds = object_table(values.clone());
    let reports = normalize_for_columnar_with_report(&mut ds, &NormalizeOptions::default());

    assert_eq!(ds.column("col").unwrap(), values.as_slice());
    assert_eq!(
        reports[0].action,
        ColumnAction::ListOfScalars {
            shape: columnar_normalize::normalize::ColumnShape {
                has_list: true,
                has_non_list: false,
                has_nan: false,
            },
            coerced: false,
        }
    );
}

#[test]
fn untouched_rows_and_entries_keep_identity() {
    let keep_row = Value::list(vec![Value::dict(vec![("a", ints(&[1]))])]);
    let keep_entry = Value::dict(vec![("a", ints(&[2]))]);
    let mixed_row = Value::list(vec![keep_entry.clone(), Value::dict(vec![("a", Value::Int64(3))])]);

    let out = normalized(vec![keep_row.clone(), mixed_row.clone(), Value::Null]);

    assert!(Arc::ptr_eq(keep_row.as_list().unwrap(), out[0].as_list().unwrap()));
    assert!(!Arc::ptr_eq(mixed_row.as_list().unwrap(), out[1].as_list().unwrap()));
    let entries = out[1].as_list().unwrap();
    assert!(Arc::ptr_eq(keep_entry.as_dict().unwrap(), entries[0].as_dict().unwrap()));
    assert_eq!(entries[1], Value::dict(vec![("a", ints(&[3]))]));
}

#[test]
fn coercion_and_entry_normalization_compose() {
    let out = normalized(vec![
        Value::dict(vec![("a", Value::from("x"))]),
        Value::list(vec![Value::Null, Value::dict(vec![("a", Value::list(vec![Value::from("y")]))])]),
        Value::nan(),
    ]);
    assert_eq!(
        out,
        vec![
            Value::list(vec![Value::dict(vec![("a", Value::list(vec![Value::from("x")]))])]),
            Value::list(vec![Value::Null, Value::dict(vec![("a", Value::list(vec![Value::from("y")]))])]),
            Value::Null,
        ]
    );
}

#[test]
fn numeric_arrays_follow_configured_list_kinds() {
    let values = vec![Value::float_array(vec![1.0, 2.0]), Value::Float64(3.0)];

    let mut extended = object_table(values.clone());
    normalize_for_columnar(
        &mut extended,
        &NormalizeOptions {
            list_kinds: ListKinds::extended(),
            ..NormalizeOptions::default()
        },
    );
    assert_eq!(
        extended.column("col").unwrap(),
        &[
            Value::list(vec![Value::Float64(1.0), Value::Float64(2.0)]),
            Value::list(vec![Value::Float64(3.0)]),
        ]
    );

    let mut base = object_table(values.clone());
    normalize_for_columnar(
        &mut base,
        &NormalizeOptions {
            list_kinds: ListKinds::base(),
            ..NormalizeOptions::default()
        },
    );
    assert_eq!(base.column("col").unwrap(), values.as_slice());
}

#[test]
fn custom_missing_predicate_treats_sentinel_strings_as_nan() {
    let mut ds = object_table(vec![Value::from("N/A"), ints(&[1])]);
    let options = NormalizeOptions {
        missing: Arc::new(|v: &Value| matches!(v, Value::Utf8(s) if s == "N/A")),
        ..NormalizeOptions::default()
    };
    normalize_for_columnar(&mut ds, &options);
    assert_eq!(ds.column("col").unwrap(), &[Value::Null, ints(&[1])]);

    let mut default_ds = object_table(vec![Value::from("N/A"), ints(&[1])]);
    normalize_for_columnar(
        &mut default_ds,
        &NormalizeOptions {
            missing: Arc::new(NanIsMissing),
            ..NormalizeOptions::default()
        },
    );
    assert_eq!(
        default_ds.column("col").unwrap(),
        &[Value::list(vec![Value::from("N/A")]), ints(&[1])]
    );
}

#[derive(Default)]
struct RecordingObserver {
    columns: Mutex<Vec<ColumnReport>>,
    summaries: Mutex<Vec<NormalizeSummary>>,
}

impl NormalizeObserver for RecordingObserver {
    fn on_column(&self, report: &ColumnReport) {
        self.columns.lock().unwrap().push(report.clone());
    }

    fn on_finished(&self, summary: &NormalizeSummary) {
        self.summaries.lock().unwrap().push(*summary);
    }
}

#[test]
fn observer_receives_reports_in_schema_order() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("tags", DataType::Object),
        Field::new("notes", DataType::Object),
    ]);
    let mut ds = DataSet::from_rows(
        schema,
        vec![
            vec![Value::Int64(1), Value::from("a"), Value::from("n")],
            vec![Value::Int64(2), ints(&[1]), Value::Null],
        ],
    )
    .unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let options = NormalizeOptions {
        observer: Some(obs.clone()),
        ..NormalizeOptions::default()
    };
    normalize_for_columnar(&mut ds, &options);

    let columns = obs.columns.lock().unwrap().clone();
    let names: Vec<&str> = columns.iter().map(|r| r.column.as_str()).collect();
    assert_eq!(names, vec!["id", "tags", "notes"]);
    assert!(columns[1].changed);
    assert!(columns[1].action.coerced());

    let summaries = obs.summaries.lock().unwrap().clone();
    assert_eq!(
        summaries,
        vec![NormalizeSummary {
            columns: 3,
            scanned: 2,
            coerced: 1,
            rewritten: 1,
        }]
    );
}

#[test]
fn reports_serialize_as_flat_json() {
    let mut ds = object_table(vec![Value::Int64(1), ints(&[2])]);
    let reports = normalize_for_columnar_with_report(&mut ds, &NormalizeOptions::default());
    let json = serde_json::to_value(&reports[0]).unwrap();
    assert_eq!(json["column"], "col");
    assert_eq!(json["action"], "list_of_scalars");
    assert_eq!(json["coerced"], true);
    assert_eq!(json["changed"], true);
    assert_eq!(json["shape"]["has_list"], true);
}
