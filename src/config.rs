use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::NormError;

pub const DEFAULT_CONFIG_FILENAME: &str = "rrna-norm.json";
pub const DEFAULT_TAXONOMY_COLUMN: &str = "Taxonomy";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub input_path: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub taxonomy_column: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub db_path: Option<Utf8PathBuf>,
    pub input_path: Option<Utf8PathBuf>,
    pub output_path: Option<Utf8PathBuf>,
    pub taxonomy_column: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, NormError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILENAME),
        };

        if path.is_none() && !config_path.exists() {
            return Err(NormError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| NormError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| NormError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            db_path: config.db_path.map(Utf8PathBuf::from),
            input_path: config.input_path.map(Utf8PathBuf::from),
            output_path: config.output_path.map(Utf8PathBuf::from),
            taxonomy_column: config
                .taxonomy_column
                .unwrap_or_else(|| DEFAULT_TAXONOMY_COLUMN.to_string()),
        }
    }
}
