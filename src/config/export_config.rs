use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_env_vars;
use crate::constants::{
    DEFAULT_COLLECTOR_TIMEOUT_SECS, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_SDK_LEVEL, DEFAULT_UPLOAD_TIMEOUT_SECS,
    PLACEHOLDER_ENDPOINT, SCRATCH_DIR_NAME,
};
use crate::permissions::{GrantedPermissions, Permission};

/// Permissions the user has granted for this export.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConsentConfig {
    #[serde(default)]
    pub granted: Vec<Permission>,
    #[serde(default = "default_sdk_level")]
    pub sdk_level: u32,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            granted: Vec::new(),
            sdk_level: DEFAULT_SDK_LEVEL,
        }
    }
}

impl ConsentConfig {
    pub fn to_permissions(&self) -> GrantedPermissions {
        GrantedPermissions::new(self.granted.iter().copied(), self.sdk_level)
    }
}

/// Where provider data is read from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SourceConfig {
    /// Device dump directory (`providers/` tables plus a `storage/` tree)
    #[serde(default)]
    pub dump_dir: Option<String>,
}

/// Device metadata overrides; unset fields are probed from the host.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeliveryConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Root for per-run scratch directories; defaults to the system temp dir
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LimitsConfig {
    #[serde(default = "default_collector_timeout")]
    pub collector_timeout_secs: u64,
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            collector_timeout_secs: DEFAULT_COLLECTOR_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
        }
    }
}

impl LimitsConfig {
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportConfig {
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub consent: ConsentConfig,
    /// Substitute sample records for empty contacts, messages and calls
    #[serde(default)]
    pub sample_mode: bool,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Directory for the local snapshot copy and run summary
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            description: "Device export configuration. Grant permissions under consent.granted to enable categories."
                .to_string(),
            consent: ConsentConfig::default(),
            sample_mode: false,
            source: SourceConfig::default(),
            device: DeviceConfig::default(),
            delivery: DeliveryConfig::default(),
            limits: LimitsConfig::default(),
            output_dir: None,
        }
    }
}

impl ExportConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: ExportConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Write the default configuration to `path`
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        ExportConfig::default().save_to_yaml_file(path)
    }

    /// Expand `$VAR`, `${VAR}` and `%VAR%` in every path-like field.
    pub fn process_environment_variables(&mut self) {
        for field in [
            &mut self.source.dump_dir,
            &mut self.delivery.scratch_dir,
            &mut self.output_dir,
        ] {
            if let Some(value) = field.as_mut() {
                *value = expand_env_vars(value);
            }
        }
        self.delivery.endpoint = expand_env_vars(&self.delivery.endpoint);
    }

    /// Root directory under which run scratch directories are created
    pub fn scratch_root(&self) -> PathBuf {
        match &self.delivery.scratch_dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::temp_dir().join(SCRATCH_DIR_NAME),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        }
    }
}

fn default_sdk_level() -> u32 {
    DEFAULT_SDK_LEVEL
}

fn default_endpoint() -> String {
    PLACEHOLDER_ENDPOINT.to_string()
}

fn default_collector_timeout() -> u64 {
    DEFAULT_COLLECTOR_TIMEOUT_SECS
}

fn default_upload_timeout() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_SECS
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

/// Load a configuration file or fall back to defaults.
///
/// * `Some(path)` that exists is loaded and parsed.
/// * `Some(path)` that does not exist gets a default file written to it.
/// * `None` uses the built-in defaults without touching the filesystem.
///
/// Environment variables in path fields are expanded in every case.
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<ExportConfig> {
    let mut config = match config_path {
        Some(path) if path.exists() => ExportConfig::from_yaml_file(path)?,
        Some(path) => {
            info!("Config file {} not found, creating default", path.display());
            let config = ExportConfig::default();
            config.save_to_yaml_file(path)?;
            config
        }
        None => {
            debug!("No config file given, using defaults");
            ExportConfig::default()
        }
    };

    config.process_environment_variables();
    Ok(config)
}
