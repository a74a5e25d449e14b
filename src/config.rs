use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::Location;
use crate::error::KiraError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-cs.json";
pub const DEFAULT_FILE_PREFIX: &str = "BIOGRID-ORCS-SCREEN";
pub const DEFAULT_VERSION: &str = "1.1.17";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_CONDITION_THRESHOLD: f64 = 70.0;
pub const DEFAULT_TOP_HITS: usize = 10;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub screens: Option<String>,
    #[serde(default)]
    pub file_prefix: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub columns: ColumnNames,
    #[serde(default)]
    pub hit_value: Option<String>,
    #[serde(default)]
    pub condition_threshold: Option<f64>,
    #[serde(default)]
    pub top_hits: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnNames {
    pub screen_id: String,
    pub official_symbol: String,
    pub hit: String,
    pub condition: String,
    pub cell_line: String,
    pub organism: String,
    pub score_filter: String,
    pub top_hits_score: String,
    pub significance_indicator: String,
    pub significance_criteria: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            screen_id: "SCREEN_ID".to_string(),
            official_symbol: "OFFICIAL_SYMBOL".to_string(),
            hit: "HIT".to_string(),
            condition: "CONDITION_NAME".to_string(),
            cell_line: "CELL_LINE".to_string(),
            organism: "ORGANISM_OFFICIAL".to_string(),
            score_filter: "SCORE.2".to_string(),
            top_hits_score: "SCORE.1".to_string(),
            significance_indicator: "SIGNIFICANCE_INDICATOR".to_string(),
            significance_criteria: "SIGNIFICANCE_CRITERIA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub index: Option<String>,
    pub screens: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub index: Location,
    pub screens: Location,
    pub file_prefix: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub layout: DatasetLayout,
    pub columns: ColumnNames,
    pub hit_value: String,
    pub condition_threshold: f64,
    pub top_hits: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: &ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let mut config = if path.is_none() && !config_path.exists() {
            if overrides.index.is_none() {
                return Err(KiraError::MissingConfig);
            }
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))?
        };

        if let Some(index) = &overrides.index {
            config.index = Some(index.clone());
        }
        if let Some(screens) = &overrides.screens {
            config.screens = Some(screens.clone());
        }

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let region = config
            .s3_region
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let index = config
            .index
            .as_deref()
            .ok_or_else(|| KiraError::ConfigParse("`index` location is required".to_string()))
            .and_then(|value| Location::parse(value, &region))?;
        let screens = match config.screens.as_deref() {
            Some(value) => Location::parse(value, &region)?,
            None => index.parent(),
        };

        let condition_threshold = config
            .condition_threshold
            .unwrap_or(DEFAULT_CONDITION_THRESHOLD);
        validate_threshold(condition_threshold)?;

        Ok(ResolvedConfig {
            schema_version,
            layout: DatasetLayout {
                index,
                screens,
                file_prefix: config
                    .file_prefix
                    .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string()),
                version: config.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            },
            columns: config.columns,
            hit_value: config.hit_value.unwrap_or_else(|| "YES".to_string()),
            condition_threshold,
            top_hits: config.top_hits.unwrap_or(DEFAULT_TOP_HITS),
        })
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), KiraError> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(KiraError::MalformedInput(format!(
            "similarity threshold must be within 0..=100, got {threshold}"
        )));
    }
    Ok(())
}
