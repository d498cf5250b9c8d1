use chrono::{DateTime, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use lci_models::DqSystemRef;

use crate::bom::KeyScope;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub reference: ReferenceConfig,
    pub process: ProcessConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Folder that relative source paths are resolved against
    pub data_folder: String,
    pub sources: Vec<BomSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomSourceConfig {
    pub path: String,
    /// Defaults to the file stem
    pub source_id: Option<String>,
    /// Read at most this many sheets of a workbook
    pub max_sheets: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub unit_table_path: String,
    pub metadata_template_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub default_location: String,
    pub category: String,
    pub product_flow_category: String,
    pub default_unit: String,
    pub key_scope: KeyScope,
    pub dq_system: Option<DqSystemRef>,
    pub exchange_dq_system: Option<DqSystemRef>,
    /// Fixed documentation creation date; the run time is used when absent
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub archive_path: String,
    pub summary_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with LCI prefix
            .add_source(Environment::with_prefix("LCI").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl InputConfig {
    /// Resolves a source path against the data folder unless it is absolute
    pub fn resolve(&self, source: &BomSourceConfig) -> PathBuf {
        let path = Path::new(&source.path);
        if path.is_absolute() || self.data_folder.is_empty() {
            path.to_path_buf()
        } else {
            Path::new(&self.data_folder).join(path)
        }
    }
}

impl BomSourceConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_id: None,
            max_sheets: None,
        }
    }

    /// Configured source identifier, or the file stem of the path
    pub fn source_id(&self) -> String {
        self.source_id.clone().unwrap_or_else(|| {
            Path::new(&self.path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.clone())
        })
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_folder: "data-foreground".to_string(),
            sources: vec![BomSourceConfig::new("BOM_1.xlsx")],
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            unit_table_path: "config/units.csv".to_string(),
            metadata_template_path: None,
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_location: "US".to_string(),
            category: "31-33: Manufacturing/3364: Aerospace Product and Parts Manufacturing"
                .to_string(),
            product_flow_category: String::new(),
            default_unit: "Item(s)".to_string(),
            key_scope: KeyScope::PerSource,
            dq_system: Some(DqSystemRef::process_pedigree()),
            exchange_dq_system: Some(DqSystemRef::flow_pedigree()),
            creation_date: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_path: "output/assemblyPSM.zip".to_string(),
            summary_path: "output/assembly_process_summary.csv".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}
