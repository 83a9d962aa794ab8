pub mod csv;
pub mod error;
pub mod feature_row;
pub mod price_model;
pub mod schema;
