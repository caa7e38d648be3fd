// src/config/mod.rs
//! Service configuration: `config/utm.toml` (or `$UTM_CONFIG_PATH`) plus a
//! few env overrides. A missing default file means built-in defaults.

pub mod reporting;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub use reporting::ReportingConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/utm.toml";
pub const ENV_CONFIG_PATH: &str = "UTM_CONFIG_PATH";
pub const ENV_DEFAULT_COUNTRY: &str = "UTM_DEFAULT_COUNTRY";
pub const ENV_EXPECTED_DOMAIN: &str = "UTM_EXPECTED_DOMAIN";

fn default_country() -> String {
    "it".to_string()
}

fn default_client_channels() -> Vec<String> {
    [
        "Paid Search",
        "Paid Social",
        "Display",
        "Email",
        "Organic Social",
        "Affiliate",
        "Video",
        "Altro",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Defaults applied to every build for the configured property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyConfig {
    #[serde(default = "default_country")]
    pub default_country: String,
    /// Destination links are expected to mention this domain; empty disables the hint.
    #[serde(default)]
    pub expected_domain: String,
    /// GA4 property used for observed sources, e.g. `properties/123456`.
    #[serde(default)]
    pub property_id: Option<String>,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            default_country: default_country(),
            expected_domain: String::new(),
            property_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel groupings available to the client, in display order.
    #[serde(default = "default_client_channels")]
    pub client: Vec<String>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            client: default_client_channels(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub property: PropertyConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl AppConfig {
    /// Resolve the config path and load it:
    /// 1) $UTM_CONFIG_PATH (must exist)
    /// 2) config/utm.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied in every case.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::load_from_file(&default_path)?
            } else {
                info!("no config file found, using defaults");
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(
            path = %path.display(),
            channels = cfg.channels.client.len(),
            reporting = cfg.reporting.enabled,
            "config loaded"
        );
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.channels.client = std::mem::take(&mut self.channels.client)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && seen.insert(c.to_lowercase()))
            .collect();
        self.property.default_country = self.property.default_country.trim().to_string();
        self.property.expected_domain = self.property.expected_domain.trim().to_string();
        self.property.property_id = self
            .property
            .property_id
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.reporting.sanitize();
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(ENV_DEFAULT_COUNTRY) {
            self.property.default_country = v.trim().to_string();
        }
        if let Ok(v) = std::env::var(ENV_EXPECTED_DOMAIN) {
            self.property.expected_domain = v.trim().to_string();
        }
    }
}
