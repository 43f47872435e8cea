//! Extraction stage configuration and its validated form.
//!
//! [`ExtractionConfig`] is the raw configuration supplied by the enclosing pipeline
//! (serde-derived, so it can be loaded straight from job configuration).
//! [`ExtractionSpec::from_config`] validates it against the input schema once at
//! stage setup and produces the immutable spec reused for every row.

use serde::{Deserialize, Serialize};
use serde_json_path::JsonPath;

use crate::error::{ExtractionError, ExtractionResult};
use crate::types::{DataType, Field, Schema};

/// Configuration for a JSON path extraction stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Name of the input column holding the JSON document text.
    pub source_column: String,
    /// JSON path expressions, one per output field.
    pub json_paths: Vec<String>,
    /// Output column names, positionally matching `json_paths`.
    pub output_columns: Vec<String>,
    /// Optional output type names (case-insensitive, see [`DataType::parse`]),
    /// positionally matching `json_paths`. Every field defaults to text when omitted.
    #[serde(default)]
    pub output_types: Option<Vec<String>>,
    /// Error policy: `true` degrades individual failures to null cells, `false`
    /// aborts the whole row on the first failure.
    #[serde(default)]
    pub skip_failed: bool,
    /// Input columns copied unchanged into the output row.
    #[serde(default)]
    pub reserved_columns: Vec<String>,
}

/// One validated output field: a compiled path plus its target column.
#[derive(Debug, Clone)]
pub(crate) struct ExtractedField {
    pub(crate) path: JsonPath,
    pub(crate) path_text: String,
    pub(crate) column: Field,
}

/// Immutable, validated description of what an extraction stage extracts and how.
///
/// Built once from an [`ExtractionConfig`] at stage setup; never mutated afterward.
/// Safe to share across concurrently running stage replicas.
#[derive(Debug, Clone)]
pub struct ExtractionSpec {
    source_index: usize,
    source_column: String,
    fields: Vec<ExtractedField>,
    skip_failed: bool,
}

impl ExtractionSpec {
    /// Validate `config` against `input_schema` and build the spec.
    ///
    /// Fails with [`ExtractionError::Configuration`] if:
    ///
    /// - the source column is missing from the input schema, or is not declared
    ///   [`DataType::Utf8`]
    /// - the path and output column counts differ (or the output type count, when
    ///   types are configured)
    /// - an output type name is not recognized by [`DataType::parse`]
    /// - a path expression does not parse as a JSONPath query
    ///
    /// Output column names are trimmed of surrounding whitespace.
    pub fn from_config(input_schema: &Schema, config: &ExtractionConfig) -> ExtractionResult<Self> {
        let source_index = input_schema.index_of(&config.source_column).ok_or_else(|| {
            ExtractionError::Configuration {
                message: format!(
                    "source column '{}' not found in input schema",
                    config.source_column
                ),
            }
        })?;

        if input_schema.fields[source_index].data_type != DataType::Utf8 {
            return Err(ExtractionError::Configuration {
                message: format!("source column '{}' must be a text column", config.source_column),
            });
        }

        if config.json_paths.len() != config.output_columns.len() {
            return Err(ExtractionError::Configuration {
                message: format!(
                    "json path and output column count mismatch: {} vs {}",
                    config.json_paths.len(),
                    config.output_columns.len()
                ),
            });
        }

        let data_types = match &config.output_types {
            Some(names) => {
                if names.len() != config.json_paths.len() {
                    return Err(ExtractionError::Configuration {
                        message: format!(
                            "output type and json path count mismatch: {} vs {}",
                            names.len(),
                            config.json_paths.len()
                        ),
                    });
                }
                let mut types = Vec::with_capacity(names.len());
                for name in names {
                    types.push(DataType::parse(name).ok_or_else(|| {
                        ExtractionError::Configuration {
                            message: format!("unrecognized output type '{}'", name.trim()),
                        }
                    })?);
                }
                types
            }
            None => vec![DataType::Utf8; config.json_paths.len()],
        };

        let mut fields = Vec::with_capacity(config.json_paths.len());
        for ((path_text, column), data_type) in config
            .json_paths
            .iter()
            .zip(&config.output_columns)
            .zip(data_types)
        {
            let path = JsonPath::parse(path_text).map_err(|e| ExtractionError::Configuration {
                message: format!("invalid json path '{path_text}': {e}"),
            })?;
            fields.push(ExtractedField {
                path,
                path_text: path_text.clone(),
                column: Field::new(column.trim(), data_type),
            });
        }

        Ok(Self {
            source_index,
            source_column: config.source_column.clone(),
            fields,
            skip_failed: config.skip_failed,
        })
    }

    /// Position of the JSON text field within the input row.
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// Name of the source column (used in error messages).
    pub fn source_column(&self) -> &str {
        &self.source_column
    }

    /// Number of configured output fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether individual failures degrade to null cells instead of aborting the row.
    pub fn skip_failed(&self) -> bool {
        self.skip_failed
    }

    /// The output fields (trimmed name + declared type), in path order.
    pub fn output_fields(&self) -> Vec<Field> {
        self.fields.iter().map(|f| f.column.clone()).collect()
    }

    pub(crate) fn fields(&self) -> &[ExtractedField] {
        &self.fields
    }
}
