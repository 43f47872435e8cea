use thiserror::Error;

/// Convenience result type for extraction operations.
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Error type returned by extraction stage construction and row processing.
///
/// [`ExtractionError::Configuration`] is raised only while building a stage and is
/// always fatal to stage setup. The other variants are the two row-fatal conditions:
/// they abort the whole row with no output, and only occur when the skip-failed
/// policy is disabled.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Invalid stage configuration (unresolvable column, count mismatch,
    /// unrecognized type name, invalid path expression, name collision).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The source cell held no document (null or whitespace-only text).
    #[error("empty json document in source column '{column}'")]
    EmptyDocument { column: String },

    /// A path failed to evaluate, or its result could not be coerced into the
    /// declared output type.
    #[error("failed to evaluate json path '{path}': {message}")]
    PathEvaluation { path: String, message: String },
}
