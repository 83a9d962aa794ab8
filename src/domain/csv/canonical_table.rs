// ============================================================
// CANONICAL TABLE
// ============================================================
// Normalized headers plus cleaned, typed training examples

use serde::Serialize;

use crate::domain::feature_row::{FeatureRow, TrainingExample};

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    /// Column names after synonym rewriting, in file order
    pub columns: Vec<String>,

    /// Rows that survived null removal and numeric coercion
    pub examples: Vec<TrainingExample>,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Splits into the parallel feature/target sequences the model is fitted on.
    pub fn into_training_frame(self) -> (Vec<FeatureRow>, Vec<f64>) {
        self.examples
            .into_iter()
            .map(|example| (example.features, example.target))
            .unzip()
    }
}

/// Row accounting for one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub rows_read: usize,
    pub dropped_missing: usize,
    pub dropped_non_numeric: usize,
}

impl NormalizationReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.dropped_missing - self.dropped_non_numeric
    }

    pub fn rows_dropped(&self) -> usize {
        self.dropped_missing + self.dropped_non_numeric
    }
}
