use std::sync::{Arc, Mutex};

use tracing::error;

use crate::application::{ModelHandle, PredictionUseCase, TrainingUseCase};
use crate::domain::error::{AppError, Result};
use crate::domain::schema::PriceSchema;
use crate::infrastructure::artifact_store::ModelArtifactStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::storage::StorageLayout;
use crate::interfaces::http::{add_log, LogEntry};

/// Everything the server and CLI commands share, wired once at startup.
pub struct AppContext {
    pub config: AppConfig,
    pub schema: Arc<PriceSchema>,
    pub layout: StorageLayout,
    pub store: Arc<ModelArtifactStore>,
    pub models: Arc<ModelHandle>,
    pub training: Arc<TrainingUseCase>,
    pub prediction: Arc<PredictionUseCase>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

pub fn setup(config: AppConfig) -> Result<AppContext> {
    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let layout = StorageLayout::new(&config.storage.data_dir);
    layout.ensure().map_err(|err| {
        error!(
            error = %err,
            data_dir = %layout.data_dir().display(),
            "Failed to create storage dirs"
        );
        AppError::ArtifactIo(format!(
            "Failed to prepare data dir {}: {err}",
            layout.data_dir().display()
        ))
    })?;

    let schema = Arc::new(config.price_schema());
    let store = Arc::new(ModelArtifactStore::new(layout.model_path()));
    let models = Arc::new(ModelHandle::empty());

    add_log(
        &logs,
        "INFO",
        "Bootstrap",
        &format!(
            "Schema preset {:?}: fields {:?}",
            schema.preset,
            schema.required_columns()
        ),
    );
    warm_model(&models, &store, &schema, &logs);

    let training = Arc::new(
        TrainingUseCase::new(schema.clone(), store.clone(), models.clone())
            .with_upload_archive(layout.clone()),
    );
    let prediction = Arc::new(PredictionUseCase::new(
        schema.clone(),
        store.clone(),
        models.clone(),
    ));

    Ok(AppContext {
        config,
        schema,
        layout,
        store,
        models,
        training,
        prediction,
        logs,
    })
}

/// Loads an existing artifact so the first prediction does not pay for it.
/// A missing or unreadable artifact is not fatal: the app starts untrained.
fn warm_model(
    models: &ModelHandle,
    store: &ModelArtifactStore,
    schema: &PriceSchema,
    logs: &Mutex<Vec<LogEntry>>,
) {
    match models.get_or_load(store, schema) {
        Ok(trained) => add_log(
            logs,
            "INFO",
            "Model",
            &format!(
                "Loaded model from {} ({} training rows, trained {})",
                store.path().display(),
                trained.manifest.training_rows,
                trained.manifest.trained_at.format("%Y-%m-%d %H:%M:%S")
            ),
        ),
        Err(AppError::ModelNotFound { path }) => add_log(
            logs,
            "INFO",
            "Model",
            &format!("No model at {} yet; upload a CSV to train", path.display()),
        ),
        Err(err) => add_log(
            logs,
            "WARN",
            "Model",
            &format!("Ignoring model artifact at {}: {err}", store.path().display()),
        ),
    }
}
