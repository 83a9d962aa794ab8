// ============================================================
// PREDICTION USE CASE
// ============================================================
// Request fields -> feature row (training field names) -> price

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::use_cases::model_handle::ModelHandle;
use crate::domain::error::{AppError, Result};
use crate::domain::feature_row::{FieldValue, FeatureRow};
use crate::domain::price_model::{Prediction, TrainedModel};
use crate::domain::schema::PriceSchema;
use crate::infrastructure::artifact_store::ModelArtifactStore;

/// Raw request input: field name -> value, `None` for an explicit null.
pub type PredictionInput = BTreeMap<String, Option<FieldValue>>;

pub struct PredictionUseCase {
    schema: Arc<PriceSchema>,
    store: Arc<ModelArtifactStore>,
    models: Arc<ModelHandle>,
}

impl PredictionUseCase {
    pub fn new(
        schema: Arc<PriceSchema>,
        store: Arc<ModelArtifactStore>,
        models: Arc<ModelHandle>,
    ) -> Self {
        Self {
            schema,
            store,
            models,
        }
    }

    pub fn schema(&self) -> &PriceSchema {
        &self.schema
    }

    /// The live model, loaded from disk on first use.
    pub fn model(&self) -> Result<Arc<TrainedModel>> {
        self.models.get_or_load(&self.store, &self.schema)
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<Prediction> {
        let trained = self.model()?;
        let row = build_feature_row(&self.schema, &trained, input)?;
        let prediction = trained.model.predict_detailed(&row)?;
        tracing::debug!(
            price = prediction.price,
            unmatched = ?prediction.unmatched_fields,
            "Predicted price"
        );
        Ok(prediction)
    }
}

/// Maps request keys onto the model's field names. Keys go through the same header
/// synonyms as CSV ingestion, so `{"Prezzo": ..}`-style aliases are accepted.
/// Unknown keys are ignored.
pub fn build_feature_row(
    schema: &PriceSchema,
    trained: &TrainedModel,
    input: &PredictionInput,
) -> Result<FeatureRow> {
    let mut values: BTreeMap<String, &FieldValue> = BTreeMap::new();
    for (key, value) in input {
        if let Some(value) = value {
            values.entry(schema.canonical_header(key)).or_insert(value);
        }
    }

    let mut row = FeatureRow::new();
    for field in &trained.manifest.categorical_fields {
        if let Some(category) = values.get(field).and_then(|v| v.as_category()) {
            row.categorical.insert(field.clone(), category);
        }
    }
    for field in &trained.manifest.numeric_fields {
        let value = values
            .get(field)
            .ok_or_else(|| AppError::Feature(format!("missing numeric field '{}'", field)))?;
        let number = value.as_number().ok_or_else(|| {
            AppError::Feature(format!("field '{}' is not a number: {:?}", field, value))
        })?;
        row.numeric.insert(field.clone(), number);
    }
    Ok(row)
}
