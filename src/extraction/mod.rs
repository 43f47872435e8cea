//! The per-row extraction-and-merge engine.
//!
//! An extraction stage is configured once ([`ExtractionConfig`] →
//! [`ExtractionSpec`]), computes its output schema once ([`SchemaMerger`]), and is
//! then applied to rows one at a time ([`RowExtractor::extract`]). Per row:
//!
//! - the JSON text cell is read from the configured source column
//! - every configured path is evaluated against the document, independently
//! - each resolved value is coerced into its declared output type
//! - failures degrade to null cells or abort the row, per the skip-failed policy
//! - extracted cells are merged with the reserved input columns into one output row
//!
//! One input row produces exactly one output row, except for a fatal row error
//! (blank document or unrecovered field failure with the skip policy disabled),
//! which produces no row and surfaces as an [`crate::ExtractionError`].

pub mod config;
pub mod extractor;
pub mod merge;
pub mod observability;

pub use config::{ExtractionConfig, ExtractionSpec};
pub use extractor::RowExtractor;
pub use merge::SchemaMerger;
pub use observability::{
    CompositeObserver, ExtractionObserver, FileObserver, RowStats, StdErrObserver,
};
