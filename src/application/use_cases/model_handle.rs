//! Shared reference to the model currently used for predictions.
//!
//! Readers clone the inner `Arc` and drop the lock immediately, so a retrain never
//! blocks on in-flight predictions and a prediction never sees a half-built model.
//! Writers go through `publish`, which holds a single writer lock across the artifact
//! write and the swap, so the file on disk and the live model always agree.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::error::Result;
use crate::domain::price_model::TrainedModel;
use crate::domain::schema::PriceSchema;
use crate::infrastructure::artifact_store::ModelArtifactStore;

#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<TrainedModel>>>,
    writer: Mutex<()>,
}

impl ModelHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(trained: TrainedModel) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(trained))),
            writer: Mutex::new(()),
        }
    }

    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, trained: TrainedModel) -> Arc<TrainedModel> {
        let trained = Arc::new(trained);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(trained.clone());
        trained
    }

    /// Persists `trained` to `store`, then makes it the live model. Concurrent
    /// publishers are serialized; a failed write leaves the live model untouched.
    pub fn publish(
        &self,
        store: &ModelArtifactStore,
        trained: TrainedModel,
    ) -> Result<Arc<TrainedModel>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        store.save(&trained)?;
        Ok(self.replace(trained))
    }

    /// Returns the in-memory model, loading it from `store` on first use.
    pub fn get_or_load(
        &self,
        store: &ModelArtifactStore,
        schema: &PriceSchema,
    ) -> Result<Arc<TrainedModel>> {
        if let Some(trained) = self.current() {
            return Ok(trained);
        }

        let loaded = store.load_for(schema)?;
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have trained or loaded while we were reading the file.
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.clone());
        }
        let loaded = Arc::new(loaded);
        *slot = Some(loaded.clone());
        Ok(loaded)
    }
}
