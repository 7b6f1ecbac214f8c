//! Ingestion entrypoints.
//!
//! Tables that need normalization usually come from JSON documents, so JSON is the supported
//! source format. See [`json`] for details.

pub mod json;

pub use json::{ingest_json_from_path, ingest_json_from_str, ingest_json_inferred, infer_schema_from_json_str};
