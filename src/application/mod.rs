pub mod use_cases;

pub use use_cases::model_handle::ModelHandle;
pub use use_cases::prediction::{PredictionInput, PredictionUseCase};
pub use use_cases::schema_normalizer::SchemaNormalizer;
pub use use_cases::training::{train_model, TrainingReport, TrainingUseCase};
