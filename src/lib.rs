//! `jsonpath-extract` is a small library implementing one stage of a row-processing
//! pipeline: it extracts multiple independently-addressed values out of a single
//! JSON-encoded text column, coerces each value into a statically declared output
//! type, and produces a new row merging the extracted values with a caller-chosen
//! subset of the original columns.
//!
//! The primary entrypoint is [`extraction::RowExtractor`], built once per stage
//! from the input [`types::Schema`] and an [`extraction::ExtractionConfig`], then
//! applied to rows one at a time. Path queries are delegated to the
//! [`serde_json_path`] crate and value (de)serialization to [`serde_json`]; this
//! crate owns the per-row policy and schema plumbing around them.
//!
//! ## Guarantees
//!
//! - **Field-level fault isolation**: a failure in one extracted field (unmatched
//!   path, shape mismatch) never corrupts or blocks the other fields.
//! - **Row cardinality**: one input row produces exactly one output row. The only
//!   exception is a fatal row error with the skip-failed policy disabled, which
//!   produces no row and surfaces as an [`ExtractionError`].
//! - **Fail-fast configuration**: every configuration problem (unknown columns,
//!   count mismatches, unrecognized types, invalid paths, name collisions) is an
//!   [`ExtractionError::Configuration`] at stage setup, before any row is touched.
//!
//! ## Quick example
//!
//! ```rust
//! use jsonpath_extract::extraction::{ExtractionConfig, RowExtractor};
//! use jsonpath_extract::types::{DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), jsonpath_extract::ExtractionError> {
//! let input_schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("payload", DataType::Utf8),
//! ]);
//!
//! let config = ExtractionConfig {
//!     source_column: "payload".to_string(),
//!     json_paths: vec!["$.user.name".to_string(), "$.user.age".to_string()],
//!     output_columns: vec!["name".to_string(), "age".to_string()],
//!     output_types: Some(vec!["string".to_string(), "long".to_string()]),
//!     skip_failed: false,
//!     reserved_columns: vec!["id".to_string()],
//! };
//!
//! let extractor = RowExtractor::new(&input_schema, &config)?;
//!
//! // The output schema is available before any row is processed.
//! assert_eq!(
//!     extractor.output_schema().field_names().collect::<Vec<_>>(),
//!     vec!["id", "name", "age"],
//! );
//!
//! let row = vec![
//!     Value::Int64(7),
//!     Value::Utf8(r#"{"user":{"name":"Ada","age":36}}"#.to_string()),
//! ];
//! let out = extractor.extract(&row)?;
//! assert_eq!(
//!     out,
//!     vec![Value::Int64(7), Value::Utf8("Ada".to_string()), Value::Int64(36)],
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Skip-failed policy
//!
//! With `skip_failed: true`, individual failures degrade to null cells and every
//! row yields exactly one output row:
//!
//! ```rust
//! use jsonpath_extract::extraction::{ExtractionConfig, RowExtractor};
//! use jsonpath_extract::types::{DataType, Field, Schema, Value};
//!
//! # fn main() -> Result<(), jsonpath_extract::ExtractionError> {
//! let input_schema = Schema::new(vec![Field::new("payload", DataType::Utf8)]);
//! let config = ExtractionConfig {
//!     source_column: "payload".to_string(),
//!     json_paths: vec!["$.a".to_string(), "$.missing".to_string()],
//!     output_columns: vec!["a".to_string(), "missing".to_string()],
//!     skip_failed: true,
//!     ..Default::default()
//! };
//! let extractor = RowExtractor::new(&input_schema, &config)?;
//!
//! let row = vec![Value::Utf8(r#"{"a":1}"#.to_string())];
//! let out = extractor.extract(&row)?;
//! assert_eq!(out, vec![Value::Utf8("1".to_string()), Value::Null]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`extraction`]: the per-row extraction-and-merge engine
//! - [`execution`]: chunked, rayon-backed batch driver with metrics and observers
//! - [`types`]: schema + cell value types
//! - [`error`]: error types used across the crate

pub mod error;
pub mod execution;
pub mod extraction;
pub mod types;

pub use error::{ExtractionError, ExtractionResult};
