//! Output schema computation and per-row merge.

use crate::error::{ExtractionError, ExtractionResult};
use crate::types::{Field, Schema, Value};

/// Combines reserved input columns with newly extracted columns.
///
/// The output schema is computed once at construction: the reserved columns in
/// their configured order (types copied from the input schema), followed by the
/// extracted columns in path order. Per row, [`SchemaMerger::merge`] copies each
/// reserved cell unchanged from the input row and appends the extracted cells.
#[derive(Debug, Clone)]
pub struct SchemaMerger {
    reserved_indices: Vec<usize>,
    extracted_len: usize,
    output_schema: Schema,
}

impl SchemaMerger {
    /// Compute the output schema.
    ///
    /// Fails with [`ExtractionError::Configuration`] if a reserved column does not
    /// exist in the input schema, if a column name is reserved twice, if an
    /// extracted column name collides with a reserved column, or if two extracted
    /// columns share a name. All name checks happen here, never at row time.
    pub fn new(
        input_schema: &Schema,
        reserved_columns: &[String],
        extracted: &[Field],
    ) -> ExtractionResult<Self> {
        let mut reserved_indices = Vec::with_capacity(reserved_columns.len());
        let mut fields = Vec::with_capacity(reserved_columns.len() + extracted.len());

        for (i, name) in reserved_columns.iter().enumerate() {
            if reserved_columns[..i].contains(name) {
                return Err(ExtractionError::Configuration {
                    message: format!("duplicate reserved column '{name}'"),
                });
            }
            let idx = input_schema.index_of(name).ok_or_else(|| {
                ExtractionError::Configuration {
                    message: format!("reserved column '{name}' not found in input schema"),
                }
            })?;
            reserved_indices.push(idx);
            fields.push(input_schema.fields[idx].clone());
        }

        for (i, field) in extracted.iter().enumerate() {
            if reserved_columns.iter().any(|r| r == &field.name) {
                return Err(ExtractionError::Configuration {
                    message: format!(
                        "output column '{}' collides with reserved column",
                        field.name
                    ),
                });
            }
            if extracted[..i].iter().any(|f| f.name == field.name) {
                return Err(ExtractionError::Configuration {
                    message: format!("duplicate output column '{}'", field.name),
                });
            }
            fields.push(field.clone());
        }

        Ok(Self {
            reserved_indices,
            extracted_len: extracted.len(),
            output_schema: Schema::new(fields),
        })
    }

    /// The computed output schema.
    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    /// Merge one input row with its completed partial row into one output row.
    ///
    /// # Panics
    ///
    /// Panics if `extracted` does not hold exactly one cell per extracted column.
    pub fn merge(&self, input_row: &[Value], extracted: Vec<Value>) -> Vec<Value> {
        assert!(
            extracted.len() == self.extracted_len,
            "partial row length {} does not match extracted column count {}",
            extracted.len(),
            self.extracted_len
        );

        let mut out = Vec::with_capacity(self.reserved_indices.len() + extracted.len());
        for &idx in &self.reserved_indices {
            out.push(input_row.get(idx).cloned().unwrap_or(Value::Null));
        }
        out.extend(extracted);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::SchemaMerger;
    use crate::types::{DataType, Field, Schema, Value};

    fn input_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("payload", DataType::Utf8),
            Field::new("ts", DataType::Int64),
        ])
    }

    fn extracted_fields() -> Vec<Field> {
        vec![
            Field::new("name", DataType::Utf8),
            Field::new("age", DataType::Int64),
        ]
    }

    #[test]
    fn output_schema_is_reserved_then_extracted() {
        let merger = SchemaMerger::new(
            &input_schema(),
            &["ts".to_string(), "id".to_string()],
            &extracted_fields(),
        )
        .unwrap();

        assert_eq!(
            merger.output_schema().field_names().collect::<Vec<_>>(),
            vec!["ts", "id", "name", "age"],
        );
        assert_eq!(merger.output_schema().fields[0].data_type, DataType::Int64);
    }

    #[test]
    fn merge_copies_reserved_cells_unchanged() {
        let merger = SchemaMerger::new(
            &input_schema(),
            &["ts".to_string(), "id".to_string()],
            &extracted_fields(),
        )
        .unwrap();

        let row = vec![
            Value::Int64(7),
            Value::Utf8("{}".to_string()),
            Value::Int64(1700000000),
        ];
        let out = merger.merge(&row, vec![Value::Utf8("Ada".to_string()), Value::Null]);

        assert_eq!(
            out,
            vec![
                Value::Int64(1700000000),
                Value::Int64(7),
                Value::Utf8("Ada".to_string()),
                Value::Null,
            ]
        );
    }

    #[test]
    fn rejects_unknown_reserved_column() {
        let err = SchemaMerger::new(&input_schema(), &["missing".to_string()], &extracted_fields())
            .unwrap_err();
        assert!(err.to_string().contains("reserved column 'missing' not found"));
    }

    #[test]
    fn rejects_duplicate_reserved_column() {
        let err = SchemaMerger::new(
            &input_schema(),
            &["id".to_string(), "id".to_string()],
            &extracted_fields(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate reserved column 'id'"));
    }

    #[test]
    fn rejects_output_collision_with_reserved() {
        let err = SchemaMerger::new(
            &input_schema(),
            &["id".to_string()],
            &[Field::new("id", DataType::Utf8)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("collides with reserved column"));
    }

    #[test]
    fn rejects_duplicate_output_column() {
        let err = SchemaMerger::new(
            &input_schema(),
            &[],
            &[
                Field::new("name", DataType::Utf8),
                Field::new("name", DataType::Int64),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate output column 'name'"));
    }

    #[test]
    #[should_panic(expected = "partial row length")]
    fn merge_panics_on_wrong_partial_arity() {
        let merger = SchemaMerger::new(&input_schema(), &[], &extracted_fields()).unwrap();
        let row = vec![Value::Int64(1), Value::Utf8("{}".to_string()), Value::Null];
        let _ = merger.merge(&row, vec![Value::Null]);
    }
}
