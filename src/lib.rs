//! `columnar-normalize` prepares JSON-shaped tables for strict columnar writers.
//!
//! Columnar formats need one element type per column. Tables built from JSON documents break that
//! rule in two ways: a field may be a scalar in some rows and a list in others, and inside a
//! list-of-dictionary column the same key may be a scalar in one entry and a list in another.
//! Missing values also show up both as `null` and as `NaN`.
//!
//! The primary entrypoint is [`normalize::normalize_for_columnar`], which rewrites a
//! [`types::DataSet`] in place so that:
//!
//! - every column holding a list holds only lists and `Null`;
//! - every dictionary key that is list-valued anywhere in a column is a list (or `Null`)
//!   everywhere it appears in that column;
//! - absent keys stay absent, and untouched lists/dictionaries keep their allocation.
//!
//! ## Quick example
//!
//! ```rust
//! use columnar_normalize::ingestion::ingest_json_inferred;
//! use columnar_normalize::normalize::{normalize_for_columnar, NormalizeOptions};
//! use columnar_normalize::types::Value;
//!
//! # fn main() -> Result<(), columnar_normalize::TableError> {
//! let mut ds = ingest_json_inferred(
//!     r#"
//! {"id":1,"tags":"x","hits":[{"_id":"a"}]}
//! {"id":2,"tags":["y","z"],"hits":[{"_id":["b","c"]}]}
//! "#,
//! )?;
//!
//! normalize_for_columnar(&mut ds, &NormalizeOptions::default());
//!
//! let tags = ds.column("tags").unwrap();
//! assert_eq!(tags[0], Value::list(vec![Value::from("x")]));
//!
//! let hits = ds.column("hits").unwrap();
//! assert_eq!(
//!     hits[0],
//!     Value::list(vec![Value::dict(vec![(
//!         "_id",
//!         Value::list(vec![Value::from("a")]),
//!     )])])
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: schema + in-memory dataset types
//! - [`normalize`]: the list-column normalization pass and its observers
//! - [`execution`]: parallel-across-columns execution with metrics
//! - [`ingestion`]: JSON ingestion with schema inference
//! - [`error`]: error types used by fallible table operations

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod normalize;
pub mod types;

pub use error::{TableError, TableResult};
