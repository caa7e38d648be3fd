//! Google Analytics 4 over REST: Admin API v1beta for accounts/properties,
//! Data API v1beta for reports.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    normalize_property_id, AccountSummary, Credential, GoogleAdsLink, PropertyDetails,
    PropertySummary, RealtimeReportRequest, ReportRequest, ReportRow, ReportingClient,
};

pub const ADMIN_API_BASE: &str = "https://analyticsadmin.googleapis.com/v1beta";
pub const DATA_API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";

const ACCOUNT_SUMMARIES_PAGE_SIZE: u32 = 200;

pub struct Ga4Client {
    http: reqwest::Client,
    credential: Credential,
    admin_base: String,
    data_base: String,
}

impl Ga4Client {
    pub fn new(credential: Credential, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("utm-governance/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building GA4 http client")?;
        Ok(Self {
            http,
            credential,
            admin_base: ADMIN_API_BASE.to_string(),
            data_base: DATA_API_BASE.to_string(),
        })
    }

    /// Point the client at other API roots (proxies, local fakes).
    pub fn with_base_urls(mut self, admin: impl Into<String>, data: impl Into<String>) -> Self {
        self.admin_base = admin.into().trim_end_matches('/').to_string();
        self.data_base = data.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "ga4 GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.credential.token())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding response of GET {url}"))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(%url, "ga4 POST");
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.credential.token())
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding response of POST {url}"))
    }
}

/* ----------------------------
Wire types
---------------------------- */

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummariesResp {
    #[serde(default)]
    account_summaries: Vec<WireAccountSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccountSummary {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    property_summaries: Vec<WirePropertySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePropertySummary {
    #[serde(default)]
    property: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProperty {
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    create_time: String,
    #[serde(default)]
    update_time: String,
    #[serde(default)]
    industry_category: String,
    #[serde(default)]
    time_zone: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAdsLinksResp {
    #[serde(default)]
    google_ads_links: Vec<WireGoogleAdsLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGoogleAdsLink {
    #[serde(default)]
    name: String,
    #[serde(default)]
    customer_id: String,
    #[serde(default)]
    creator_email_address: String,
}

#[derive(Debug, Serialize)]
struct NameRef<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDateRange<'a> {
    start_date: &'a str,
    end_date: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportBody<'a> {
    dimensions: Vec<NameRef<'a>>,
    metrics: Vec<NameRef<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    date_ranges: Vec<WireDateRange<'a>>,
    limit: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportResp {
    #[serde(default)]
    rows: Vec<WireRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    value: String,
}

fn names(items: &[String]) -> Vec<NameRef<'_>> {
    items.iter().map(|n| NameRef { name: n }).collect()
}

/// Key each row's values by the requested dimension and metric names.
pub(crate) fn flatten_rows(
    dimensions: &[String],
    metrics: &[String],
    resp: ReportResp,
) -> Vec<ReportRow> {
    resp.rows
        .into_iter()
        .map(|row| {
            let mut item = ReportRow::new();
            for (name, v) in dimensions.iter().zip(row.dimension_values) {
                item.insert(name.clone(), v.value);
            }
            for (name, v) in metrics.iter().zip(row.metric_values) {
                item.insert(name.clone(), v.value);
            }
            item
        })
        .collect()
}

impl From<WireAccountSummary> for AccountSummary {
    fn from(w: WireAccountSummary) -> Self {
        AccountSummary {
            account_name: w.name,
            display_name: w.display_name,
            properties: w
                .property_summaries
                .into_iter()
                .map(|p| PropertySummary {
                    property_id: p.property,
                    display_name: p.display_name,
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ReportingClient for Ga4Client {
    async fn account_summaries(&self) -> Result<Vec<AccountSummary>> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/accountSummaries?pageSize={ACCOUNT_SUMMARIES_PAGE_SIZE}",
                self.admin_base
            );
            if let Some(t) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(t);
            }
            let resp: AccountSummariesResp = self.get_json(&url).await?;
            out.extend(resp.account_summaries.into_iter().map(AccountSummary::from));
            match resp.next_page_token.filter(|t| !t.is_empty()) {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        Ok(out)
    }

    async fn property_details(&self, property_id: &str) -> Result<PropertyDetails> {
        let url = format!("{}/{}", self.admin_base, normalize_property_id(property_id));
        let p: WireProperty = self.get_json(&url).await?;
        Ok(PropertyDetails {
            name: p.name,
            display_name: p.display_name,
            create_time: p.create_time,
            update_time: p.update_time,
            industry_category: p.industry_category,
            time_zone: p.time_zone,
        })
    }

    async fn google_ads_links(&self, property_id: &str) -> Result<Vec<GoogleAdsLink>> {
        let url = format!(
            "{}/{}/googleAdsLinks",
            self.admin_base,
            normalize_property_id(property_id)
        );
        let resp: GoogleAdsLinksResp = self.get_json(&url).await?;
        Ok(resp
            .google_ads_links
            .into_iter()
            .map(|l| GoogleAdsLink {
                name: l.name,
                customer_id: l.customer_id,
                email_address: l.creator_email_address,
            })
            .collect())
    }

    async fn run_report(&self, req: &ReportRequest) -> Result<Vec<ReportRow>> {
        let url = format!(
            "{}/{}:runReport",
            self.data_base,
            normalize_property_id(&req.property_id)
        );
        let body = RunReportBody {
            dimensions: names(&req.dimensions),
            metrics: names(&req.metrics),
            date_ranges: req
                .date_ranges
                .iter()
                .map(|d| WireDateRange {
                    start_date: &d.start_date,
                    end_date: &d.end_date,
                })
                .collect(),
            limit: req.limit,
        };
        let resp: ReportResp = self.post_json(&url, &body).await?;
        Ok(flatten_rows(&req.dimensions, &req.metrics, resp))
    }

    async fn run_realtime_report(&self, req: &RealtimeReportRequest) -> Result<Vec<ReportRow>> {
        let url = format!(
            "{}/{}:runRealtimeReport",
            self.data_base,
            normalize_property_id(&req.property_id)
        );
        let body = RunReportBody {
            dimensions: names(&req.dimensions),
            metrics: names(&req.metrics),
            date_ranges: Vec::new(),
            limit: req.limit,
        };
        let resp: ReportResp = self.post_json(&url, &body).await?;
        Ok(flatten_rows(&req.dimensions, &req.metrics, resp))
    }

    fn name(&self) -> &'static str {
        "ga4"
    }
}
