use std::path::Path;

use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CRM__` and optional TOML config files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsConfig {
    /// Page size used when a caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Reject filter sets containing unknown operators instead of letting
    /// those predicates pass.
    #[serde(default)]
    pub strict_operators: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

// Default functions
fn default_page_size() -> usize {
    50
}
fn default_log_filter() -> String {
    "crm_segments=info,crm_segmentation=info".to_string()
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            strict_operators: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder(None)?.try_deserialize()
    }

    /// Load configuration from a TOML file, with environment variables
    /// taking precedence over values in the file.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::builder(Some(path))?.try_deserialize()
    }

    fn builder(path: Option<&Path>) -> Result<config::Config, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }
        builder
            .add_source(
                config::Environment::with_prefix("CRM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
    }
}
