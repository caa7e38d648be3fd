// src/session.rs
//! Per-session state: the growing source catalog, the client's channel list
//! and property defaults. Created at session start, dropped at session end;
//! every build/check reads it, only the observed-source merge writes it.

use std::collections::HashSet;

use metrics::gauge;
use tracing::{info, warn};

use crate::builder::{build_link, field_hints, BuiltLink, FieldHint, LinkRequest, MissingFields};
use crate::compat::{channel_required, compatible_channels};
use crate::config::{AppConfig, PropertyConfig};
use crate::reporting::{normalize_property_id, top_traffic_sources, ReportingClient, SourceWindow};
use crate::taxonomy::SourceCatalog;

#[derive(Debug, Clone)]
pub struct SessionContext {
    catalog: SourceCatalog,
    client_channels: Vec<String>,
    property: PropertyConfig,
    fetched_properties: HashSet<String>,
    in_flight: HashSet<String>,
}

impl SessionContext {
    pub fn new(client_channels: Vec<String>, property: PropertyConfig) -> Self {
        Self {
            catalog: SourceCatalog::from_taxonomy(),
            client_channels,
            property,
            fetched_properties: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.channels.client.clone(), cfg.property.clone())
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    pub fn client_channels(&self) -> &[String] {
        &self.client_channels
    }

    pub fn property(&self) -> &PropertyConfig {
        &self.property
    }

    pub fn source_options(&self) -> Vec<String> {
        self.catalog.options()
    }

    pub fn compatible_channels(&self, source: &str) -> Vec<String> {
        compatible_channels(source, &self.client_channels)
    }

    pub fn channel_required(&self, source: &str, chosen: Option<&str>) -> bool {
        channel_required(source, chosen, &self.client_channels)
    }

    pub fn build_link(&self, req: &LinkRequest) -> Result<BuiltLink, MissingFields> {
        build_link(req, &self.client_channels)
    }

    pub fn field_hints(&self, req: &LinkRequest) -> Vec<FieldHint> {
        field_hints(req, &self.client_channels, &self.catalog)
    }

    /// Whether observed sources were already requested for `property_id`.
    pub fn has_fetched(&self, property_id: &str) -> bool {
        self.fetched_properties
            .contains(&normalize_property_id(property_id))
    }

    /// Claim the one fetch allowed for `property_id`. False when it already
    /// ran or another caller is running it; the claim holds until
    /// [`Self::merge_observed_sources`].
    pub fn begin_fetch(&mut self, property_id: &str) -> bool {
        let id = normalize_property_id(property_id);
        if self.fetched_properties.contains(&id) {
            return false;
        }
        self.in_flight.insert(id)
    }

    /// Union observed sources into the catalog and remember the property as
    /// fetched. Returns how many sources were new.
    pub fn merge_observed_sources(&mut self, property_id: &str, observed: &[String]) -> usize {
        let id = normalize_property_id(property_id);
        self.in_flight.remove(&id);
        self.fetched_properties.insert(id);
        let added = self.catalog.merge(observed);
        gauge!("utm_catalog_sources").set(self.catalog.len() as f64);
        info!(
            property = property_id,
            observed = observed.len(),
            added,
            total = self.catalog.len(),
            "session: merged observed sources"
        );
        added
    }
}

/// One non-retried fetch of observed sources. `None` means the reporting
/// call failed; callers treat it as "no data".
pub async fn fetch_observed_sources(
    client: &dyn ReportingClient,
    property_id: &str,
    window: &SourceWindow,
) -> Option<Vec<String>> {
    match top_traffic_sources(client, property_id, window).await {
        Ok(sources) => Some(sources),
        Err(e) => {
            metrics::counter!("utm_reporting_errors_total").increment(1);
            warn!(
                client = client.name(),
                property = property_id,
                error = %e,
                "session: observed sources unavailable"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::StaticReporting;

    fn session() -> SessionContext {
        SessionContext::from_config(&AppConfig::default())
    }

    #[tokio::test]
    async fn observed_sources_extend_catalog_once() {
        let mut s = session();
        let base = s.catalog().len();
        let client = StaticReporting::with_sources(["google", "partner-site"]);

        assert!(!s.has_fetched("123"));
        let observed = fetch_observed_sources(&client, "123", &SourceWindow::default())
            .await
            .unwrap();
        assert_eq!(s.merge_observed_sources("123", &observed), 1);
        assert!(s.has_fetched("properties/123"));
        assert_eq!(s.catalog().len(), base + 1);
        assert!(s.source_options().contains(&"partner-site".to_string()));
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_empty() {
        let mut s = session();
        let base = s.catalog().len();
        let observed =
            fetch_observed_sources(&StaticReporting::failing(), "9", &SourceWindow::default()).await;
        assert!(observed.is_none());
        assert_eq!(s.merge_observed_sources("9", &[]), 0);
        assert_eq!(s.catalog().len(), base);
        assert!(s.has_fetched("9"));
    }

    #[test]
    fn fetch_is_claimed_once_per_property() {
        let mut s = session();
        assert!(s.begin_fetch("42"));
        assert!(!s.begin_fetch("properties/42"), "in flight");
        assert!(!s.has_fetched("42"));

        s.merge_observed_sources("42", &[]);
        assert!(s.has_fetched("42"));
        assert!(!s.begin_fetch("42"), "already fetched");
        assert!(s.begin_fetch("43"));
    }

    #[test]
    fn resolver_uses_session_channels() {
        let s = SessionContext::new(
            vec!["Paid Search".into(), "Affiliate".into(), "Organic Social".into()],
            PropertyConfig::default(),
        );
        assert_eq!(s.compatible_channels("google"), vec!["", "Paid Search"]);
        assert!(!s.channel_required("google", None));
    }
}
