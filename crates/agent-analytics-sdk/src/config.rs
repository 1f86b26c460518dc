//! SDK configuration
//!
//! Values come from defaults, `AGENT_ANALYTICS_*` environment variables, a
//! JSON / TOML / YAML file, or the builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SdkError};

/// Where finished spans and log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// JSON lines in a log file
    #[default]
    Log,
    /// JSON lines on stdout
    Console,
    /// Spans kept in memory only, nothing written
    Memory,
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExporterKind::Log => "log",
            ExporterKind::Console => "console",
            ExporterKind::Memory => "memory",
        };
        f.write_str(label)
    }
}

impl FromStr for ExporterKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" | "file" => Ok(ExporterKind::Log),
            "console" | "stdout" => Ok(ExporterKind::Console),
            "memory" => Ok(ExporterKind::Memory),
            _ => Err(SdkError::InvalidValue {
                key: "exporter",
                value: s.to_string(),
            }),
        }
    }
}

/// SDK configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Application name; defaults to `<user>_<program>`
    pub app_name: Option<String>,

    /// Span and log destination
    pub exporter: ExporterKind,

    /// Directory for log files; defaults to `./log`
    pub logs_dir: Option<PathBuf>,

    /// Log file name without extension; defaults to `<program>_otel`
    pub log_filename: Option<String>,

    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,

    /// Resource attributes copied onto every span
    pub resource_attributes: BTreeMap<String, String>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            exporter: ExporterKind::Log,
            logs_dir: None,
            log_filename: None,
            log_level: "info".to_string(),
            resource_attributes: BTreeMap::new(),
        }
    }
}

impl SdkConfig {
    /// Create a new config builder
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            app_name: std::env::var("AGENT_ANALYTICS_APP_NAME").ok(),
            exporter: std::env::var("AGENT_ANALYTICS_EXPORTER")
                .map(|v| v.parse().unwrap_or_default())
                .unwrap_or_default(),
            logs_dir: std::env::var("AGENT_ANALYTICS_LOGS_DIR").ok().map(PathBuf::from),
            log_filename: std::env::var("AGENT_ANALYTICS_LOG_FILENAME").ok(),
            log_level: std::env::var("AGENT_ANALYTICS_LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string()),
            resource_attributes: std::env::var("AGENT_ANALYTICS_RESOURCE_ATTRIBUTES")
                .map(|v| parse_resource_attributes(&v))
                .unwrap_or_default(),
        }
    }

    /// Load config from a JSON, TOML or YAML file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| SdkError::parse("JSON", e)),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| SdkError::parse("YAML", e)),
            "toml" => toml::from_str(&content).map_err(|e| SdkError::parse("TOML", e)),
            _ => Err(SdkError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Configured application name, or `<user>_<program>`
    pub fn resolved_app_name(&self) -> String {
        if let Some(name) = self.app_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.clone();
        }
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}_{}", user, program_name())
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        let dir = self
            .logs_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("log"));
        let file = match &self.log_filename {
            Some(name) => format!("{}.log", name),
            None => format!("{}_otel.log", program_name()),
        };
        dir.join(file)
    }
}

/// Parse `key=value,key=value` pairs; malformed entries are skipped
pub fn parse_resource_attributes(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn program_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "agent_analytics".to_string())
}

/// Builder for SdkConfig
pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: SdkConfig::default(),
        }
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = Some(name.into());
        self
    }

    pub fn exporter(mut self, exporter: ExporterKind) -> Self {
        self.config.exporter = exporter;
        self
    }

    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logs_dir = Some(dir.into());
        self
    }

    pub fn log_filename(mut self, name: impl Into<String>) -> Self {
        self.config.log_filename = Some(name.into());
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Add one resource attribute
    pub fn resource_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.resource_attributes.insert(key.into(), value.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> SdkConfig {
        self.config
    }
}

impl Default for SdkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.exporter, ExporterKind::Log);
        assert_eq!(config.log_level, "info");
        assert!(config.resource_attributes.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = SdkConfig::builder()
            .app_name("calculator")
            .exporter(ExporterKind::Console)
            .log_filename("calc")
            .logs_dir("/tmp/logs")
            .resource_attribute("service.version", "1.0")
            .build();

        assert_eq!(config.resolved_app_name(), "calculator");
        assert_eq!(config.log_path(), PathBuf::from("/tmp/logs/calc.log"));
        assert_eq!(config.resource_attributes["service.version"], "1.0");
    }

    #[test]
    fn test_default_log_path_uses_program_name() {
        let path = SdkConfig::default().log_path();
        assert!(path.starts_with("log"));
        assert!(path.to_string_lossy().ends_with("_otel.log"));
    }

    #[test]
    fn test_exporter_kind_parse() {
        assert_eq!("Console".parse::<ExporterKind>().unwrap(), ExporterKind::Console);
        assert_eq!("file".parse::<ExporterKind>().unwrap(), ExporterKind::Log);
        assert!("otlp".parse::<ExporterKind>().is_err());
    }

    #[test]
    fn test_parse_resource_attributes() {
        let attrs = parse_resource_attributes("service.name=calc, env = dev,broken,=x");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["service.name"], "calc");
        assert_eq!(attrs["env"], "dev");
    }

    #[test]
    fn test_from_file_formats() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("sdk.toml");
        std::fs::File::create(&toml_path)
            .unwrap()
            .write_all(b"app_name = \"calc\"\nexporter = \"console\"\n")
            .unwrap();
        let config = SdkConfig::from_file(&toml_path).unwrap();
        assert_eq!(config.app_name.as_deref(), Some("calc"));
        assert_eq!(config.exporter, ExporterKind::Console);

        let yaml_path = dir.path().join("sdk.yml");
        std::fs::write(&yaml_path, "log_level: debug\n").unwrap();
        assert_eq!(SdkConfig::from_file(&yaml_path).unwrap().log_level, "debug");

        let json_path = dir.path().join("sdk.json");
        std::fs::write(&json_path, r#"{"log_filename": "run"}"#).unwrap();
        assert_eq!(
            SdkConfig::from_file(&json_path).unwrap().log_filename.as_deref(),
            Some("run")
        );

        let ini_path = dir.path().join("sdk.ini");
        std::fs::write(&ini_path, "").unwrap();
        assert!(matches!(
            SdkConfig::from_file(&ini_path),
            Err(SdkError::UnsupportedFormat(_))
        ));
    }
}
