// ============================================================
// PRICE MODEL
// ============================================================
// One-hot categorical block + numeric pass-through -> OLS with intercept

mod encoder;
pub mod ols;

pub use encoder::{OneHotEncoder, Vocabulary};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::feature_row::FeatureRow;
use crate::domain::schema::PriceSchema;

/// Fitted pipeline state: vocabularies, numeric field order, coefficients, intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModel {
    encoder: OneHotEncoder,
    numeric_fields: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Result of a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub price: f64,
    /// Categorical fields whose value was missing or not seen during training.
    pub unmatched_fields: Vec<String>,
}

impl PriceModel {
    /// Fits the pipeline on parallel feature rows and targets. Pure, no I/O.
    pub fn fit(schema: &PriceSchema, rows: &[FeatureRow], targets: &[f64]) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(AppError::Internal(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if rows.is_empty() {
            return Err(AppError::training_msg("no valid rows to train on"));
        }

        let encoder = OneHotEncoder::fit(&schema.categorical, rows);
        let width = encoder.width() + schema.numeric.len();

        let mut design = Array2::<f64>::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            let mut design_row = design.row_mut(i);
            let Some(slice) = design_row.as_slice_mut() else {
                return Err(AppError::Internal("design matrix is not contiguous".into()));
            };
            encoder.encode_into(row, &mut slice[..encoder.width()]);
            for (j, field) in schema.numeric.iter().enumerate() {
                slice[encoder.width() + j] = row.numeric(field).ok_or_else(|| {
                    AppError::training_msg(format!("row {} has no value for '{}'", i, field))
                })?;
            }
        }

        let fit = ols::fit(&design, &Array1::from_vec(targets.to_vec()))?;
        tracing::debug!(
            rows = rows.len(),
            columns = width,
            rank = fit.rank,
            intercept = fit.intercept,
            "Fitted price model"
        );

        Ok(Self {
            encoder,
            numeric_fields: schema.numeric.clone(),
            coefficients: fit.coefficients.to_vec(),
            intercept: fit.intercept,
        })
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<f64> {
        self.predict_detailed(row).map(|p| p.price)
    }

    pub fn predict_detailed(&self, row: &FeatureRow) -> Result<Prediction> {
        let (design_row, unmatched_fields) = self.design_row(row)?;
        let price = self.intercept
            + self
                .coefficients
                .iter()
                .zip(design_row.iter())
                .map(|(c, x)| c * x)
                .sum::<f64>();
        Ok(Prediction {
            price,
            unmatched_fields,
        })
    }

    /// Encodes a row exactly as at fit time. Missing numeric fields are an error.
    pub fn design_row(&self, row: &FeatureRow) -> Result<(Vec<f64>, Vec<String>)> {
        let mut values = vec![0.0; self.coefficients.len()];
        let unmatched = self
            .encoder
            .encode_into(row, &mut values[..self.encoder.width()]);

        for (j, field) in self.numeric_fields.iter().enumerate() {
            let value = row
                .numeric(field)
                .ok_or_else(|| AppError::Feature(format!("missing numeric field '{}'", field)))?;
            if !value.is_finite() {
                return Err(AppError::Feature(format!(
                    "numeric field '{}' must be finite",
                    field
                )));
            }
            values[self.encoder.width() + j] = value;
        }
        Ok((values, unmatched))
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn categorical_fields(&self) -> Vec<String> {
        self.encoder.fields().map(str::to_string).collect()
    }

    pub fn numeric_fields(&self) -> &[String] {
        &self.numeric_fields
    }

    /// Column labels in design-matrix order, aligned with `coefficients()`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.encoder.column_names();
        names.extend(self.numeric_fields.iter().cloned());
        names
    }
}

/// Field-name manifest stored alongside the fitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub categorical_fields: Vec<String>,
    pub numeric_fields: Vec<String>,
    pub target: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
}

impl ModelManifest {
    pub fn for_schema(schema: &PriceSchema, training_rows: usize) -> Self {
        Self {
            categorical_fields: schema.categorical.clone(),
            numeric_fields: schema.numeric.clone(),
            target: schema.target.clone(),
            trained_at: Utc::now(),
            training_rows,
        }
    }

    /// All field names, in required-column order, for comparison against a schema.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categorical_fields
            .iter()
            .chain(self.numeric_fields.iter())
            .cloned()
            .collect();
        names.push(self.target.clone());
        names
    }

    pub fn matches(&self, schema: &PriceSchema) -> bool {
        self.categorical_fields == schema.categorical
            && self.numeric_fields == schema.numeric
            && self.target == schema.target
    }
}

/// What gets persisted: the manifest plus the fitted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub manifest: ModelManifest,
    pub model: PriceModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(company: &str, product_model: &str, feature: &str) -> FeatureRow {
        FeatureRow::new()
            .with_category("company", company)
            .with_category("product_model", product_model)
            .with_category("feature", feature)
    }

    fn scenario() -> (Vec<FeatureRow>, Vec<f64>) {
        (
            vec![
                row("A", "M1", "base"),
                row("A", "M2", "pro"),
                row("B", "M1", "base"),
                row("B", "M3", "max"),
            ],
            vec![100.0, 130.0, 110.0, 160.0],
        )
    }

    #[test]
    fn test_scenario_recovers_training_targets() {
        let (rows, targets) = scenario();
        let model = PriceModel::fit(&PriceSchema::catalog(), &rows, &targets).unwrap();

        for (row, target) in rows.iter().zip(targets.iter()) {
            let predicted = model.predict(row).unwrap();
            assert!((predicted - target).abs() < 1e-6, "{predicted} vs {target}");
        }
    }

    #[test]
    fn test_all_unseen_returns_intercept() {
        let (rows, targets) = scenario();
        let model = PriceModel::fit(&PriceSchema::catalog(), &rows, &targets).unwrap();

        let prediction = model.predict_detailed(&row("Z", "M9", "ultra")).unwrap();
        assert!(prediction.price.is_finite());
        assert_eq!(prediction.price, model.intercept());
        assert_eq!(
            prediction.unmatched_fields,
            vec!["company", "product_model", "feature"]
        );
    }

    #[test]
    fn test_missing_categorical_is_tolerated() {
        let (rows, targets) = scenario();
        let model = PriceModel::fit(&PriceSchema::catalog(), &rows, &targets).unwrap();

        let partial = FeatureRow::new().with_category("company", "A");
        assert!(model.predict(&partial).unwrap().is_finite());
    }

    #[test]
    fn test_row_order_does_not_change_predictions() {
        let (rows, targets) = scenario();
        let schema = PriceSchema::catalog();
        let forward = PriceModel::fit(&schema, &rows, &targets).unwrap();

        let mut paired: Vec<_> = rows.into_iter().zip(targets).collect();
        paired.reverse();
        paired.swap(0, 2);
        let (rows_shuffled, targets_shuffled): (Vec<_>, Vec<_>) = paired.into_iter().unzip();
        let shuffled = PriceModel::fit(&schema, &rows_shuffled, &targets_shuffled).unwrap();

        assert_eq!(forward.column_names(), shuffled.column_names());
        for query in [row("A", "M3", "pro"), row("B", "M2", "max"), row("Q", "M1", "x")] {
            let a = forward.predict(&query).unwrap();
            let b = shuffled.predict(&query).unwrap();
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn test_empty_input_is_training_error() {
        let err = PriceModel::fit(&PriceSchema::catalog(), &[], &[]).unwrap_err();
        assert!(matches!(err, AppError::Training { .. }));
    }

    #[test]
    fn test_single_row_degenerate_fit() {
        let model =
            PriceModel::fit(&PriceSchema::catalog(), &[row("A", "M1", "base")], &[42.0]).unwrap();
        assert!((model.predict(&row("A", "M1", "base")).unwrap() - 42.0).abs() < 1e-9);
        assert!((model.intercept() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_unique_models_per_row_fit_quickly() {
        let companies = ["Acme", "Globex", "Initech"];
        let rows: Vec<FeatureRow> = (0..300)
            .map(|i| row(companies[i % 3], &format!("M{i}"), &format!("F{i}")))
            .collect();
        let targets: Vec<f64> = (0..300).map(|i| 100.0 + (i % 17) as f64 * 7.5).collect();

        let started = std::time::Instant::now();
        let model = PriceModel::fit(&PriceSchema::catalog(), &rows, &targets).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(model.coefficients().len(), 3 + 300 + 300);
        for (row, target) in rows.iter().zip(targets.iter()).step_by(29) {
            let predicted = model.predict(row).unwrap();
            assert!((predicted - target).abs() < 1e-6, "{predicted} vs {target}");
        }
        assert!(elapsed.as_secs() < 30, "fit took {elapsed:?}");
    }

    #[test]
    fn test_numeric_fields_pass_through() {
        let schema = PriceSchema::retail();
        let rows: Vec<FeatureRow> = [
            ("alpha", "shoes", 40.0, 20.0),
            ("alpha", "bag", 1.0, 35.0),
            ("beta", "shoes", 42.0, 25.0),
            ("beta", "bag", 1.0, 30.0),
            ("gamma", "shoes", 38.0, 22.0),
            ("gamma", "bag", 2.0, 40.0),
            ("alpha", "shoes", 44.0, 21.0),
        ]
        .iter()
        .map(|(b, c, s, cost)| {
            FeatureRow::new()
                .with_category("brand", *b)
                .with_category("category", *c)
                .with_numeric("size", *s)
                .with_numeric("base_cost", *cost)
        })
        .collect();
        // price = 2 * base_cost + 0.5 * size + 10
        let targets: Vec<f64> = rows
            .iter()
            .map(|r| 2.0 * r.numeric("base_cost").unwrap() + 0.5 * r.numeric("size").unwrap() + 10.0)
            .collect();

        let model = PriceModel::fit(&schema, &rows, &targets).unwrap();
        assert_eq!(model.numeric_fields(), &["size", "base_cost"]);

        let query = FeatureRow::new()
            .with_category("brand", "beta")
            .with_category("category", "shoes")
            .with_numeric("size", 41.0)
            .with_numeric("base_cost", 24.0);
        let expected = 2.0 * 24.0 + 0.5 * 41.0 + 10.0;
        assert!((model.predict(&query).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_missing_numeric_is_feature_error() {
        let schema = PriceSchema::retail();
        let rows = vec![
            FeatureRow::new()
                .with_category("brand", "alpha")
                .with_category("category", "bag")
                .with_numeric("size", 1.0)
                .with_numeric("base_cost", 10.0),
            FeatureRow::new()
                .with_category("brand", "beta")
                .with_category("category", "bag")
                .with_numeric("size", 2.0)
                .with_numeric("base_cost", 12.0),
        ];
        let model = PriceModel::fit(&schema, &rows, &[25.0, 30.0]).unwrap();

        let query = FeatureRow::new()
            .with_category("brand", "alpha")
            .with_numeric("size", 1.0);
        let err = model.predict(&query).unwrap_err();
        assert!(matches!(err, AppError::Feature(ref msg) if msg.contains("base_cost")));
    }

    #[test]
    fn test_manifest_matches_schema() {
        let manifest = ModelManifest::for_schema(&PriceSchema::catalog(), 4);
        assert!(manifest.matches(&PriceSchema::catalog()));
        assert!(!manifest.matches(&PriceSchema::retail()));
        assert_eq!(
            manifest.field_names(),
            vec!["company", "product_model", "feature", "price"]
        );
    }
}
