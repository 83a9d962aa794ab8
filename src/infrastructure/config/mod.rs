use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::schema::{PriceSchema, SchemaPreset};

pub const DEFAULT_CONFIG_FILE: &str = "price_app.toml";
pub const CONFIG_PATH_ENV: &str = "PRICE_APP_CONFIG";
pub const ENV_PREFIX: &str = "PRICE_APP_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub schema: SchemaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Upper bound for one uploaded CSV, in bytes
    #[validate(range(min = 1024))]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for `models/` and `data/uploads/`
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub preset: SchemaPreset,
    /// Additional header synonyms, header -> canonical field
    #[serde(default)]
    pub extra_synonyms: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `price_app.toml` (or `$PRICE_APP_CONFIG`), then `PRICE_APP_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`], with an explicit file taking priority over `$PRICE_APP_CONFIG`.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Self::extract(Self::figment(path))
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }

    /// The active schema: preset fields plus configured synonyms.
    pub fn price_schema(&self) -> PriceSchema {
        PriceSchema::from_preset(self.schema.preset).with_synonyms(&self.schema.extra_synonyms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.price_schema(), PriceSchema::catalog());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string(
                r#"
                [server]
                port = 9100

                [schema]
                preset = "retail"

                [schema.extra_synonyms]
                "Dimensione" = "size"
                "#,
            ),
        );
        let config = AppConfig::extract(figment).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        let schema = config.price_schema();
        assert_eq!(schema.preset, SchemaPreset::Retail);
        assert_eq!(schema.canonical_header("dimensione"), "size");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("[server]\nport = 0\nhost = \"\"\n"));
        let err = AppConfig::extract(figment).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("[schema]\npreset = \"wholesale\"\n"));
        assert!(matches!(
            AppConfig::extract(figment),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!(
            "price_app_missing_{}.toml",
            uuid::Uuid::new_v4()
        ));
        let config = AppConfig::extract(
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file(&path)),
        )
        .unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
