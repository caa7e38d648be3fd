// src/config/reporting.rs
use serde::{Deserialize, Serialize};
use std::env;

use crate::reporting::ga4::{ADMIN_API_BASE, DATA_API_BASE};
use crate::reporting::{Credential, SourceWindow};

pub const ENV_ACCESS_TOKEN: &str = "GA4_ACCESS_TOKEN";

fn default_access_token() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_top_sources_limit() -> u32 {
    50
}
fn default_lookback_start() -> String {
    "30daysAgo".to_string()
}
fn default_admin_api_base() -> String {
    ADMIN_API_BASE.to_string()
}
fn default_data_api_base() -> String {
    DATA_API_BASE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "ENV" means: read from GA4_ACCESS_TOKEN
    #[serde(default = "default_access_token")]
    pub access_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How many observed sources to pull per property.
    #[serde(default = "default_top_sources_limit")]
    pub top_sources_limit: u32,
    /// GA4 relative or absolute start date (e.g. `30daysAgo`, `2025-01-01`).
    #[serde(default = "default_lookback_start")]
    pub lookback_start: String,
    /// GA4 Admin API root; override for proxies or local fakes.
    #[serde(default = "default_admin_api_base")]
    pub admin_api_base: String,
    #[serde(default = "default_data_api_base")]
    pub data_api_base: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token: default_access_token(),
            timeout_secs: default_timeout_secs(),
            top_sources_limit: default_top_sources_limit(),
            lookback_start: default_lookback_start(),
            admin_api_base: default_admin_api_base(),
            data_api_base: default_data_api_base(),
        }
    }
}

impl ReportingConfig {
    /// Clamp out-of-range values back to defaults.
    pub fn sanitize(&mut self) {
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.top_sources_limit == 0 || self.top_sources_limit > 10_000 {
            self.top_sources_limit = default_top_sources_limit();
        }
        if self.lookback_start.trim().is_empty() {
            self.lookback_start = default_lookback_start();
        }
        if self.admin_api_base.trim().is_empty() {
            self.admin_api_base = default_admin_api_base();
        }
        if self.data_api_base.trim().is_empty() {
            self.data_api_base = default_data_api_base();
        }
    }

    /// Credential for the reporting API, or `None` when reporting is off.
    pub fn resolve_credential(&self) -> anyhow::Result<Option<Credential>> {
        if !self.enabled {
            return Ok(None);
        }
        let token = if self.access_token.trim().eq_ignore_ascii_case("env") {
            env::var(ENV_ACCESS_TOKEN)
                .map_err(|_| anyhow::anyhow!("Missing {ENV_ACCESS_TOKEN} env var"))?
        } else {
            self.access_token.clone()
        };
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("reporting enabled but access token is empty");
        }
        Ok(Some(Credential::bearer(token)))
    }

    pub fn source_window(&self) -> SourceWindow {
        SourceWindow {
            start_date: self.lookback_start.clone(),
            limit: self.top_sources_limit,
        }
    }
}
