use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Required canonical columns are absent after header normalization.
    #[error("CSV missing required columns: {missing:?}. Expected {expected:?}")]
    Schema {
        missing: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Training failed: {message}")]
    Training {
        message: String,
        #[source]
        source: Option<Box<AppError>>,
    },

    #[error("Model not found at {}. Upload a CSV or run `price-app train` first", .path.display())]
    ModelNotFound { path: PathBuf },

    #[error("Invalid feature input: {0}")]
    Feature(String),

    #[error("Model artifact error: {0}")]
    ArtifactIo(String),

    /// The persisted model was trained with a different field set than the active schema.
    #[error("Model schema mismatch: artifact has {found:?}, expected {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps an ingestion or fitting failure so callers see a single training error kind.
    pub fn training(cause: AppError) -> Self {
        if matches!(cause, AppError::Training { .. }) {
            return cause;
        }
        AppError::Training {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn training_msg(message: impl Into<String>) -> Self {
        AppError::Training {
            message: message.into(),
            source: None,
        }
    }

    /// Stable machine-readable name used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Schema { .. } => "schema_error",
            AppError::Training { .. } => "training_error",
            AppError::ModelNotFound { .. } => "model_not_found",
            AppError::Feature(_) => "feature_error",
            AppError::ArtifactIo(_) => "artifact_io_error",
            AppError::SchemaMismatch { .. } => "schema_mismatch",
            AppError::Parse(_) => "parse_error",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Innermost cause of a training error, or the error itself.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::Training {
                source: Some(inner),
                ..
            } => inner.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ArtifactIo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
