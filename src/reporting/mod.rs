//! Reporting collaborator: the analytics API the service reads accounts,
//! properties and observed traffic sources from.
//!
//! `ReportingClient` is the seam; [`ga4::Ga4Client`] talks to the Google
//! Analytics 4 Admin/Data REST APIs, [`DisabledReporting`] is used when no
//! credential is configured and [`StaticReporting`] serves canned data for
//! local runs and tests.

pub mod ga4;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Opaque bearer credential handed to the reporting API. Obtaining and
/// refreshing it happens outside this service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_len", &self.token.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_name: String,
    pub display_name: String,
    pub properties: Vec<PropertySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub name: String,
    pub display_name: String,
    pub create_time: String,
    pub update_time: String,
    pub industry_category: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleAdsLink {
    pub name: String,
    pub customer_id: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start_date: "30daysAgo".to_string(),
            end_date: "today".to_string(),
        }
    }
}

fn default_date_ranges() -> Vec<DateRange> {
    vec![DateRange::default()]
}

fn default_report_limit() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub property_id: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    #[serde(default = "default_date_ranges")]
    pub date_ranges: Vec<DateRange>,
    #[serde(default = "default_report_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeReportRequest {
    pub property_id: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    #[serde(default = "default_report_limit")]
    pub limit: u32,
}

/// One report row keyed by dimension/metric name.
pub type ReportRow = BTreeMap<String, String>;

#[async_trait::async_trait]
pub trait ReportingClient: Send + Sync {
    async fn account_summaries(&self) -> Result<Vec<AccountSummary>>;
    async fn property_details(&self, property_id: &str) -> Result<PropertyDetails>;
    async fn google_ads_links(&self, property_id: &str) -> Result<Vec<GoogleAdsLink>>;
    async fn run_report(&self, req: &ReportRequest) -> Result<Vec<ReportRow>>;
    async fn run_realtime_report(&self, req: &RealtimeReportRequest) -> Result<Vec<ReportRow>>;
    fn name(&self) -> &'static str;
}

pub type DynReporting = Arc<dyn ReportingClient>;

/// Accepts `123`, `properties/123` or ` properties/123 `; returns `properties/123`.
pub fn normalize_property_id(property_id: &str) -> String {
    let id = property_id.trim();
    if id.starts_with("properties/") {
        id.to_string()
    } else {
        format!("properties/{id}")
    }
}

/// Window and size of the "sources in use" lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWindow {
    pub start_date: String,
    pub limit: u32,
}

impl Default for SourceWindow {
    fn default() -> Self {
        Self {
            start_date: "30daysAgo".to_string(),
            limit: 50,
        }
    }
}

/// Session sources seen on a property, most sessions first.
pub async fn top_traffic_sources(
    client: &dyn ReportingClient,
    property_id: &str,
    window: &SourceWindow,
) -> Result<Vec<String>> {
    let req = ReportRequest {
        property_id: property_id.to_string(),
        dimensions: vec!["sessionSource".to_string()],
        metrics: vec!["sessions".to_string()],
        date_ranges: vec![DateRange {
            start_date: window.start_date.clone(),
            end_date: "today".to_string(),
        }],
        limit: window.limit,
    };
    let rows = client.run_report(&req).await?;
    Ok(rows
        .into_iter()
        .filter_map(|mut r| r.remove("sessionSource"))
        .collect())
}

/// Pick a reporting client from config and environment.
///
/// * `UTM_TEST_MODE=mock` → [`StaticReporting::demo`].
/// * reporting disabled or no credential → [`DisabledReporting`].
/// * otherwise → [`ga4::Ga4Client`].
pub fn build_reporting_client(cfg: &AppConfig) -> DynReporting {
    if std::env::var("UTM_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        info!("reporting: using static demo client (UTM_TEST_MODE=mock)");
        return Arc::new(StaticReporting::demo());
    }

    let credential = match cfg.reporting.resolve_credential() {
        Ok(Some(c)) => c,
        Ok(None) => return Arc::new(DisabledReporting),
        Err(e) => {
            warn!(error = %e, "reporting: credential unavailable, reporting disabled");
            return Arc::new(DisabledReporting);
        }
    };

    let timeout = Duration::from_secs(cfg.reporting.timeout_secs);
    match ga4::Ga4Client::new(credential, timeout) {
        Ok(client) => {
            info!(
                timeout_secs = cfg.reporting.timeout_secs,
                admin = %cfg.reporting.admin_api_base,
                data = %cfg.reporting.data_api_base,
                "reporting: GA4 client ready"
            );
            Arc::new(client.with_base_urls(
                cfg.reporting.admin_api_base.trim(),
                cfg.reporting.data_api_base.trim(),
            ))
        }
        Err(e) => {
            warn!(error = %e, "reporting: failed to build GA4 client, reporting disabled");
            Arc::new(DisabledReporting)
        }
    }
}

/// Every call fails with "reporting disabled".
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReporting;

#[async_trait::async_trait]
impl ReportingClient for DisabledReporting {
    async fn account_summaries(&self) -> Result<Vec<AccountSummary>> {
        bail!("reporting disabled")
    }
    async fn property_details(&self, _property_id: &str) -> Result<PropertyDetails> {
        bail!("reporting disabled")
    }
    async fn google_ads_links(&self, _property_id: &str) -> Result<Vec<GoogleAdsLink>> {
        bail!("reporting disabled")
    }
    async fn run_report(&self, _req: &ReportRequest) -> Result<Vec<ReportRow>> {
        bail!("reporting disabled")
    }
    async fn run_realtime_report(&self, _req: &RealtimeReportRequest) -> Result<Vec<ReportRow>> {
        bail!("reporting disabled")
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Canned accounts and sources. Reports return one row per source, keyed by
/// the first requested dimension, with metrics set to `"0"`.
#[derive(Debug, Clone, Default)]
pub struct StaticReporting {
    pub accounts: Vec<AccountSummary>,
    pub sources: Vec<String>,
    pub fail: bool,
}

impl StaticReporting {
    pub fn with_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A client whose every call errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn demo() -> Self {
        Self {
            accounts: vec![AccountSummary {
                account_name: "accountSummaries/1000".to_string(),
                display_name: "Demo Client".to_string(),
                properties: vec![PropertySummary {
                    property_id: "properties/123456".to_string(),
                    display_name: "Demo Site".to_string(),
                }],
            }],
            sources: vec![
                "google".to_string(),
                "(direct)".to_string(),
                "partner-newsletter".to_string(),
                "l.instagram.com".to_string(),
            ],
            fail: false,
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            bail!("static reporting: simulated failure");
        }
        Ok(())
    }

    fn rows(&self, dimensions: &[String], metrics: &[String], limit: u32) -> Vec<ReportRow> {
        let Some(dim) = dimensions.first() else {
            return Vec::new();
        };
        self.sources
            .iter()
            .take(limit as usize)
            .map(|s| {
                let mut row = ReportRow::new();
                row.insert(dim.clone(), s.clone());
                for m in metrics {
                    row.insert(m.clone(), "0".to_string());
                }
                row
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ReportingClient for StaticReporting {
    async fn account_summaries(&self) -> Result<Vec<AccountSummary>> {
        self.check()?;
        Ok(self.accounts.clone())
    }

    async fn property_details(&self, property_id: &str) -> Result<PropertyDetails> {
        self.check()?;
        let name = normalize_property_id(property_id);
        let display_name = self
            .accounts
            .iter()
            .flat_map(|a| &a.properties)
            .find(|p| p.property_id == name)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();
        Ok(PropertyDetails {
            name,
            display_name,
            create_time: String::new(),
            update_time: String::new(),
            industry_category: "INDUSTRY_CATEGORY_UNSPECIFIED".to_string(),
            time_zone: "Europe/Rome".to_string(),
        })
    }

    async fn google_ads_links(&self, _property_id: &str) -> Result<Vec<GoogleAdsLink>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn run_report(&self, req: &ReportRequest) -> Result<Vec<ReportRow>> {
        self.check()?;
        Ok(self.rows(&req.dimensions, &req.metrics, req.limit))
    }

    async fn run_realtime_report(&self, req: &RealtimeReportRequest) -> Result<Vec<ReportRow>> {
        self.check()?;
        Ok(self.rows(&req.dimensions, &req.metrics, req.limit))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_id_prefix() {
        assert_eq!(normalize_property_id("123"), "properties/123");
        assert_eq!(normalize_property_id(" properties/123 "), "properties/123");
    }

    #[test]
    fn credential_debug_hides_token() {
        let c = Credential::bearer("ya29.secret");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("token_len"));
    }

    #[tokio::test]
    async fn top_sources_come_from_session_source_rows() {
        let client = StaticReporting::with_sources(["google", "newsletter"]);
        let out = top_traffic_sources(&client, "123", &SourceWindow::default())
            .await
            .unwrap();
        assert_eq!(out, vec!["google".to_string(), "newsletter".to_string()]);
    }

    #[tokio::test]
    async fn static_limit_applies() {
        let client = StaticReporting::with_sources(["a", "b", "c"]);
        let window = SourceWindow {
            limit: 2,
            ..Default::default()
        };
        let out = top_traffic_sources(&client, "1", &window).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[serial_test::serial]
    #[tokio::test]
    async fn configured_api_roots_reach_the_ga4_client() {
        std::env::remove_var("UTM_TEST_MODE");
        let mut cfg = AppConfig::default();
        cfg.reporting.enabled = true;
        cfg.reporting.access_token = "ya29.test".into();
        cfg.reporting.timeout_secs = 2;
        cfg.reporting.admin_api_base = "http://127.0.0.1:9/admin/".into();
        cfg.reporting.data_api_base = "http://127.0.0.1:9/data".into();

        let client = build_reporting_client(&cfg);
        assert_eq!(client.name(), "ga4");

        let err = client.account_summaries().await.unwrap_err();
        assert!(
            format!("{err:#}").contains("http://127.0.0.1:9/admin/accountSummaries"),
            "{err:#}"
        );
        let err = client.property_details("7").await.unwrap_err();
        assert!(format!("{err:#}").contains("127.0.0.1:9/admin/properties/7"));
    }

    #[tokio::test]
    async fn disabled_and_failing_clients_error() {
        assert!(DisabledReporting.account_summaries().await.is_err());
        assert!(StaticReporting::failing()
            .run_report(&ReportRequest {
                property_id: "1".into(),
                dimensions: vec!["sessionSource".into()],
                metrics: vec![],
                date_ranges: default_date_ranges(),
                limit: 5,
            })
            .await
            .is_err());
    }
}
