// ============================================================
// SCHEMA NORMALIZER USE CASE
// ============================================================
// Rename headers to canonical fields, validate, drop unusable rows

use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::csv::{CanonicalTable, NormalizationReport, RawTable};
use crate::domain::error::{AppError, Result};
use crate::domain::feature_row::{parse_number, FeatureRow, TrainingExample};
use crate::domain::schema::PriceSchema;

pub struct SchemaNormalizer<'a> {
    schema: &'a PriceSchema,
}

impl<'a> SchemaNormalizer<'a> {
    pub fn new(schema: &'a PriceSchema) -> Self {
        Self { schema }
    }

    /// Canonical column names for each raw header, in file order.
    pub fn canonical_columns(&self, raw: &RawTable) -> Vec<String> {
        raw.headers
            .iter()
            .map(|h| self.schema.canonical_header(h))
            .collect()
    }

    pub fn normalize(&self, raw: &RawTable) -> Result<(CanonicalTable, NormalizationReport)> {
        let columns = self.canonical_columns(raw);

        // First occurrence wins when two headers map to the same field.
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, name) in columns.iter().enumerate() {
            if positions.contains_key(name.as_str()) {
                warn!(column = %name, index, "Duplicate canonical column ignored");
                continue;
            }
            positions.insert(name.as_str(), index);
        }

        let required = self.schema.required_columns();
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !positions.contains_key(c.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Schema {
                missing,
                expected: required,
            });
        }

        let column_of = |name: &str| positions[name];
        let mut report = NormalizationReport {
            rows_read: raw.len(),
            ..Default::default()
        };
        let mut examples = Vec::with_capacity(raw.len());

        'rows: for row in 0..raw.len() {
            if required.iter().any(|c| raw.cell(row, column_of(c.as_str())).is_none()) {
                report.dropped_missing += 1;
                continue;
            }

            let mut features = FeatureRow::new();
            for field in &self.schema.categorical {
                if let Some(value) = raw.cell(row, column_of(field.as_str())) {
                    features.categorical.insert(field.clone(), value.to_string());
                }
            }
            for field in &self.schema.numeric {
                match raw.cell(row, column_of(field.as_str())).and_then(parse_number) {
                    Some(value) => {
                        features.numeric.insert(field.clone(), value);
                    }
                    None => {
                        report.dropped_non_numeric += 1;
                        continue 'rows;
                    }
                }
            }
            let Some(target) = raw
                .cell(row, column_of(self.schema.target.as_str()))
                .and_then(parse_number)
            else {
                report.dropped_non_numeric += 1;
                continue;
            };

            examples.push(TrainingExample { features, target });
        }

        info!(
            rows_read = report.rows_read,
            rows_kept = report.rows_kept(),
            dropped_missing = report.dropped_missing,
            dropped_non_numeric = report.dropped_non_numeric,
            "Normalized CSV"
        );

        Ok((CanonicalTable { columns, examples }, report))
    }
}
