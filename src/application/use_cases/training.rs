// ============================================================
// TRAINING USE CASE
// ============================================================
// CSV -> normalized frame -> fitted model -> artifact on disk -> live handle

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::application::use_cases::model_handle::ModelHandle;
use crate::application::use_cases::schema_normalizer::SchemaNormalizer;
use crate::domain::csv::{NormalizationReport, RawTable};
use crate::domain::error::{AppError, Result};
use crate::domain::price_model::{ModelManifest, PriceModel, TrainedModel};
use crate::domain::schema::PriceSchema;
use crate::infrastructure::artifact_store::ModelArtifactStore;
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::storage::StorageLayout;

/// Outcome of one successful train-and-persist run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub dropped_missing: usize,
    pub dropped_non_numeric: usize,
    /// Distinct values learned per categorical field
    pub vocabulary_sizes: BTreeMap<String, usize>,
    pub intercept: f64,
    pub artifact_path: PathBuf,
    pub trained_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_path: Option<PathBuf>,
}

impl TrainingReport {
    fn new(trained: &TrainedModel, rows: NormalizationReport, artifact_path: &Path) -> Self {
        Self {
            rows_read: rows.rows_read,
            rows_used: rows.rows_kept(),
            rows_dropped: rows.rows_dropped(),
            dropped_missing: rows.dropped_missing,
            dropped_non_numeric: rows.dropped_non_numeric,
            vocabulary_sizes: trained
                .model
                .encoder()
                .vocabularies()
                .iter()
                .map(|v| (v.field.clone(), v.len()))
                .collect(),
            intercept: trained.model.intercept(),
            artifact_path: artifact_path.to_path_buf(),
            trained_at: trained.manifest.trained_at,
            upload_path: None,
        }
    }

    /// One-line summary for flash messages and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Model trained on {} rows ({} dropped)",
            self.rows_used, self.rows_dropped
        )
    }
}

/// Fits a model from a parsed table. Pure: no disk or shared state is touched.
///
/// Every failure, including a missing column, comes back as a training error
/// carrying the underlying cause.
pub fn train_model(
    schema: &PriceSchema,
    raw: &RawTable,
) -> Result<(TrainedModel, NormalizationReport)> {
    let (table, report) = SchemaNormalizer::new(schema)
        .normalize(raw)
        .map_err(AppError::training)?;

    if table.is_empty() {
        return Err(AppError::training_msg(format!(
            "no valid rows to train on ({} read, {} dropped)",
            report.rows_read,
            report.rows_dropped()
        )));
    }

    let (rows, targets) = table.into_training_frame();
    let model = PriceModel::fit(schema, &rows, &targets).map_err(AppError::training)?;
    let trained = TrainedModel {
        manifest: ModelManifest::for_schema(schema, rows.len()),
        model,
    };
    Ok((trained, report))
}

pub struct TrainingUseCase {
    schema: Arc<PriceSchema>,
    store: Arc<ModelArtifactStore>,
    models: Arc<ModelHandle>,
    layout: Option<StorageLayout>,
}

impl TrainingUseCase {
    pub fn new(
        schema: Arc<PriceSchema>,
        store: Arc<ModelArtifactStore>,
        models: Arc<ModelHandle>,
    ) -> Self {
        Self {
            schema,
            store,
            models,
            layout: None,
        }
    }

    /// Enables audit copies of uploaded files under `data/uploads/`.
    pub fn with_upload_archive(mut self, layout: StorageLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn schema(&self) -> &PriceSchema {
        &self.schema
    }

    pub fn train_from_path(&self, path: &Path) -> Result<TrainingReport> {
        info!(path = %path.display(), "Training from CSV file");
        let raw = CsvParser::new()
            .parse_file(path)
            .map_err(AppError::training)?;
        self.train_table(&raw)
    }

    pub fn train_from_bytes(&self, bytes: &[u8]) -> Result<TrainingReport> {
        let raw = CsvParser::new()
            .parse_bytes(bytes)
            .map_err(AppError::training)?;
        self.train_table(&raw)
    }

    /// Archives the upload (when enabled), then retrains on its content.
    pub fn train_upload(&self, file_name: Option<&str>, bytes: &[u8]) -> Result<TrainingReport> {
        let upload_path = match &self.layout {
            Some(layout) => {
                let path = layout.archive_upload(file_name, bytes)?;
                info!(path = %path.display(), bytes = bytes.len(), "Archived upload");
                Some(path)
            }
            None => None,
        };

        let mut report = self.train_from_bytes(bytes)?;
        report.upload_path = upload_path;
        Ok(report)
    }

    /// Fits, persists, then swaps the live model. The swap only happens after the
    /// artifact is safely on disk, so any failure leaves the previous model serving.
    /// Concurrent retrains are serialized by the handle's writer lock.
    pub fn train_table(&self, raw: &RawTable) -> Result<TrainingReport> {
        let started = Instant::now();
        let (trained, rows) = train_model(&self.schema, raw).map_err(|e| {
            warn!(error = %e, "Training rejected");
            e
        })?;

        let report = TrainingReport::new(&trained, rows, self.store.path());
        self.models.publish(&self.store, trained)?;

        info!(
            rows_used = report.rows_used,
            rows_dropped = report.rows_dropped,
            intercept = report.intercept,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model retrained"
        );
        Ok(report)
    }
}
