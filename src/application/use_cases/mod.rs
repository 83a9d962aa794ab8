pub mod model_handle;
pub mod prediction;
pub mod sample_dataset;
pub mod schema_normalizer;
pub mod training;
