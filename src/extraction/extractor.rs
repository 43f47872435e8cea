//! Per-row JSON path extraction.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{ExtractionError, ExtractionResult};
use crate::extraction::config::{ExtractedField, ExtractionConfig, ExtractionSpec};
use crate::extraction::merge::SchemaMerger;
use crate::extraction::observability::{ExtractionObserver, RowStats};
use crate::types::{DataType, Schema, Value};

/// The per-row extraction operation.
///
/// Built once per stage from the input schema and an [`ExtractionConfig`]; immutable
/// and shareable across concurrently running stage replicas. For each input row it
/// reads the JSON text cell, evaluates every configured path, coerces each result
/// into its declared type under the skip-or-fail policy, and merges the extracted
/// cells with the reserved input columns into exactly one output row.
pub struct RowExtractor {
    spec: ExtractionSpec,
    merger: SchemaMerger,
    observer: Option<Arc<dyn ExtractionObserver>>,
}

impl fmt::Debug for RowExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowExtractor")
            .field("spec", &self.spec)
            .field("output_fields", &self.merger.output_schema().fields.len())
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl RowExtractor {
    /// Validate the configuration and build the extractor.
    ///
    /// This resolves the source column, compiles every path expression, and computes
    /// the output schema. All [`ExtractionError::Configuration`] conditions surface
    /// here, before any row is processed.
    pub fn new(input_schema: &Schema, config: &ExtractionConfig) -> ExtractionResult<Self> {
        let spec = ExtractionSpec::from_config(input_schema, config)?;
        let merger = SchemaMerger::new(input_schema, &config.reserved_columns, &spec.output_fields())?;
        Ok(Self {
            spec,
            merger,
            observer: None,
        })
    }

    /// Attach an observer for extraction outcomes (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The validated extraction description.
    pub fn spec(&self) -> &ExtractionSpec {
        &self.spec
    }

    /// The output schema, queryable before any row is processed.
    pub fn output_schema(&self) -> &Schema {
        self.merger.output_schema()
    }

    /// Transform exactly one input row into exactly one output row.
    ///
    /// With the skip-failed policy enabled this never returns an error: every
    /// failure (blank document, unmatched path, coercion mismatch) degrades to a
    /// null cell in its positional slot. With the policy disabled, a blank document
    /// yields [`ExtractionError::EmptyDocument`] and the first field failure yields
    /// [`ExtractionError::PathEvaluation`]; in both cases no output row is produced
    /// and remaining fields are not evaluated.
    ///
    /// # Panics
    ///
    /// Panics if the source cell is neither text nor null, i.e. the row does not
    /// conform to the input schema the extractor was built against.
    pub fn extract(&self, row: &[Value]) -> ExtractionResult<Vec<Value>> {
        match self.extract_partial(row) {
            Ok((partial, skipped)) => {
                let out = self.merger.merge(row, partial);
                if let Some(obs) = &self.observer {
                    obs.on_row_extracted(RowStats {
                        fields: self.spec.field_count(),
                        fields_skipped: skipped,
                    });
                }
                Ok(out)
            }
            Err(error) => {
                if let Some(obs) = &self.observer {
                    obs.on_row_failed(&error);
                }
                Err(error)
            }
        }
    }

    /// Produce the partial row: one cell per configured field, plus the count of
    /// fields degraded to null.
    fn extract_partial(&self, row: &[Value]) -> ExtractionResult<(Vec<Value>, usize)> {
        let n = self.spec.field_count();

        let text = match row.get(self.spec.source_index()) {
            Some(Value::Utf8(s)) => Some(s.as_str()),
            Some(Value::Null) | None => None,
            Some(other) => panic!(
                "source column '{}' cell is not text: {other:?}",
                self.spec.source_column()
            ),
        };

        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                if self.spec.skip_failed() {
                    return Ok((vec![Value::Null; n], n));
                }
                return Err(ExtractionError::EmptyDocument {
                    column: self.spec.source_column().to_string(),
                });
            }
        };

        if self.spec.fields().is_empty() {
            return Ok((Vec::new(), 0));
        }

        let document: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            // The document failed to parse; every field fails with the same cause.
            Err(e) => return self.fail_all(format!("malformed json document: {e}")),
        };

        let mut partial = Vec::with_capacity(n);
        let mut skipped = 0usize;
        for field in self.spec.fields() {
            match evaluate_field(&document, field) {
                Ok(value) => partial.push(value),
                Err(message) => {
                    if !self.spec.skip_failed() {
                        return Err(ExtractionError::PathEvaluation {
                            path: field.path_text.clone(),
                            message,
                        });
                    }
                    if let Some(obs) = &self.observer {
                        obs.on_field_skipped(&field.path_text, &message);
                    }
                    partial.push(Value::Null);
                    skipped += 1;
                }
            }
        }

        Ok((partial, skipped))
    }

    fn fail_all(&self, message: String) -> ExtractionResult<(Vec<Value>, usize)> {
        let n = self.spec.field_count();
        if !self.spec.skip_failed() {
            let path = self
                .spec
                .fields()
                .first()
                .map(|f| f.path_text.clone())
                .unwrap_or_default();
            return Err(ExtractionError::PathEvaluation { path, message });
        }
        if let Some(obs) = &self.observer {
            for field in self.spec.fields() {
                obs.on_field_skipped(&field.path_text, &message);
            }
        }
        Ok((vec![Value::Null; n], n))
    }
}

/// Evaluate one field's path against the parsed document and coerce the result.
///
/// A query matching no nodes is a failure. A query matching one node resolves to
/// that node; a query matching several nodes resolves to a JSON array of the
/// matched nodes.
fn evaluate_field(document: &serde_json::Value, field: &ExtractedField) -> Result<Value, String> {
    let nodes = field.path.query(document).all();
    match nodes.len() {
        0 => Err("path matched no value".to_string()),
        1 => coerce(nodes[0], &field.column.data_type),
        _ => {
            let array = serde_json::Value::Array(nodes.into_iter().cloned().collect());
            coerce(&array, &field.column.data_type)
        }
    }
}

/// Coerce a resolved node into the declared output type.
///
/// Text cells keep JSON strings as-is and serialize any other shape to its
/// canonical JSON text, so structured results survive as `[1,2,3]` rather than a
/// host-language rendering. Typed cells go through the canonical serde data model,
/// the one bridge between the open-ended dynamic source shape and the closed set
/// of static target types; a resolved JSON null becomes [`Value::Null`].
fn coerce(node: &serde_json::Value, data_type: &DataType) -> Result<Value, String> {
    match data_type {
        DataType::Utf8 => match node {
            serde_json::Value::String(s) => Ok(Value::Utf8(s.clone())),
            other => serde_json::to_string(other)
                .map(Value::Utf8)
                .map_err(|e| format!("cannot serialize value to json text: {e}")),
        },
        DataType::Int64 => {
            coerce_typed::<i64>(node).map(|v| v.map(Value::Int64).unwrap_or(Value::Null))
        }
        DataType::Float64 => {
            coerce_typed::<f64>(node).map(|v| v.map(Value::Float64).unwrap_or(Value::Null))
        }
        DataType::Bool => {
            coerce_typed::<bool>(node).map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
        }
    }
}

fn coerce_typed<T: DeserializeOwned>(node: &serde_json::Value) -> Result<Option<T>, String> {
    serde_json::from_value(node.clone())
        .map_err(|e| format!("cannot coerce value to declared type: {e}"))
}
