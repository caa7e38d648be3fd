use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::builder::{BuiltLink, FieldHint, LinkRequest, MissingFields};
use crate::campaign::CampaignFields;
use crate::checker::{check_url, CheckOutcome};
use crate::config::AppConfig;
use crate::normalize::normalize_token;
use crate::reporting::{
    build_reporting_client, normalize_property_id, AccountSummary, DynReporting, GoogleAdsLink,
    PropertyDetails, RealtimeReportRequest, ReportRequest, ReportRow, SourceWindow,
};
use crate::session::{fetch_observed_sources, SessionContext};
use crate::taxonomy::{guide_rows, GuideRow};

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<SessionContext>>,
    reporting: DynReporting,
    source_window: SourceWindow,
}

impl AppState {
    pub fn new(session: SessionContext, reporting: DynReporting, source_window: SourceWindow) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            reporting,
            source_window,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            SessionContext::from_config(cfg),
            build_reporting_client(cfg),
            cfg.reporting.source_window(),
        )
    }

    fn read_session(&self) -> RwLockReadGuard<'_, SessionContext> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, SessionContext> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/taxonomy", get(taxonomy))
        .route("/sources", get(sources))
        .route("/channels", get(channels))
        .route("/normalize", get(normalize))
        .route("/links", post(build))
        .route("/check", post(check))
        .route("/session/sources/refresh", post(refresh_sources))
        .route("/ga4/accounts", get(ga4_accounts))
        .route("/ga4/properties/{id}", get(ga4_property))
        .route("/ga4/properties/{id}/google-ads-links", get(ga4_ads_links))
        .route("/ga4/report", post(ga4_report))
        .route("/ga4/realtime-report", post(ga4_realtime_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON `{error}` with a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn upstream(err: anyhow::Error) -> Self {
        counter!("utm_reporting_errors_total").increment(1);
        warn!(error = %err, "reporting call failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{err:#}"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/* ----------------------------
Guide & vocabulary
---------------------------- */

async fn taxonomy() -> Json<Vec<GuideRow>> {
    Json(guide_rows())
}

#[derive(Serialize)]
struct SourcesResp {
    options: Vec<String>,
}

async fn sources(State(state): State<AppState>) -> Json<SourcesResp> {
    let options = state.read_session().source_options();
    Json(SourcesResp { options })
}

#[derive(Deserialize)]
struct ChannelsQuery {
    #[serde(default)]
    source: String,
}

#[derive(Serialize)]
struct ChannelsResp {
    source: String,
    channels: Vec<String>,
    channel_required: bool,
}

async fn channels(
    State(state): State<AppState>,
    Query(q): Query<ChannelsQuery>,
) -> Json<ChannelsResp> {
    let session = state.read_session();
    Json(ChannelsResp {
        channels: session.compatible_channels(&q.source),
        channel_required: session.channel_required(&q.source, None),
        source: q.source,
    })
}

#[derive(Deserialize)]
struct NormalizeQuery {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct NormalizeResp {
    input: String,
    normalized: String,
    changed: bool,
}

async fn normalize(Query(q): Query<NormalizeQuery>) -> Json<NormalizeResp> {
    let normalized = normalize_token(&q.text);
    Json(NormalizeResp {
        changed: normalized != q.text,
        input: q.text,
        normalized,
    })
}

/* ----------------------------
Builder & checker
---------------------------- */

#[derive(Deserialize)]
struct BuildReq {
    /// Absent → the property's default country.
    #[serde(default)]
    country: Option<String>,
    #[serde(default, rename = "type")]
    campaign_type: Option<String>,
    #[serde(default)]
    name: String,
    /// Absent → today.
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    cta: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    destination_url: String,
    /// Absent → the property's expected domain.
    #[serde(default)]
    expected_domain: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum BuildResp {
    Ready {
        link: BuiltLink,
        hints: Vec<FieldHint>,
    },
    Incomplete {
        missing: MissingFields,
        hints: Vec<FieldHint>,
    },
}

impl BuildReq {
    fn into_link_request(self, session: &SessionContext) -> LinkRequest {
        let property = session.property();
        let expected_domain = self.expected_domain.or_else(|| {
            (!property.expected_domain.is_empty()).then(|| property.expected_domain.clone())
        });
        LinkRequest {
            fields: CampaignFields {
                country: self
                    .country
                    .unwrap_or_else(|| property.default_country.clone()),
                campaign_type: self.campaign_type,
                name: self.name,
                date: self
                    .date
                    .unwrap_or_else(|| chrono::Local::now().date_naive()),
                cta: self.cta,
                source: self.source,
                channel: self.channel,
            },
            destination_url: self.destination_url,
            expected_domain,
        }
    }
}

async fn build(State(state): State<AppState>, Json(body): Json<BuildReq>) -> Json<BuildResp> {
    let session = state.read_session();
    let req = body.into_link_request(&session);
    let hints = session.field_hints(&req);

    match session.build_link(&req) {
        Ok(link) => {
            counter!("utm_links_built_total").increment(1);
            debug!(
                source = %link.source,
                medium = %link.medium,
                campaign = %link.campaign,
                "link built"
            );
            Json(BuildResp::Ready { link, hints })
        }
        Err(missing) => {
            counter!("utm_links_incomplete_total").increment(1);
            debug!(%missing, "link incomplete");
            Json(BuildResp::Incomplete { missing, hints })
        }
    }
}

#[derive(Deserialize)]
struct CheckReq {
    #[serde(default)]
    url: String,
}

async fn check(Json(body): Json<CheckReq>) -> Json<CheckOutcome> {
    let outcome = check_url(&body.url);
    let label = match &outcome {
        CheckOutcome::Report(r) if r.is_compliant() => "compliant",
        CheckOutcome::Report(_) => "non_compliant",
        CheckOutcome::ParseFailure { .. } => "parse_failure",
    };
    counter!("utm_checks_total", "outcome" => label).increment(1);
    Json(outcome)
}

/* ----------------------------
Session
---------------------------- */

#[derive(Deserialize, Default)]
struct RefreshReq {
    #[serde(default)]
    property_id: Option<String>,
}

#[derive(Serialize)]
struct RefreshResp {
    property_id: String,
    fetched: bool,
    added: usize,
    total: usize,
}

async fn refresh_sources(
    State(state): State<AppState>,
    Json(body): Json<RefreshReq>,
) -> ApiResult<RefreshResp> {
    let property_id = {
        let session = state.read_session();
        body.property_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .or_else(|| session.property().property_id.clone())
    }
    .ok_or_else(|| ApiError::bad_request("property_id is required"))?;
    let property_id = normalize_property_id(&property_id);

    {
        let mut session = state.write_session();
        if !session.begin_fetch(&property_id) {
            return Ok(Json(RefreshResp {
                property_id,
                fetched: false,
                added: 0,
                total: session.catalog().len(),
            }));
        }
    }

    // No lock is held across the reporting call.
    let observed =
        fetch_observed_sources(state.reporting.as_ref(), &property_id, &state.source_window).await;
    let fetched = observed.is_some();

    let mut session = state.write_session();
    let added = session.merge_observed_sources(&property_id, observed.as_deref().unwrap_or_default());
    info!(property = %property_id, added, fetched, "observed sources refreshed");
    Ok(Json(RefreshResp {
        property_id,
        fetched,
        added,
        total: session.catalog().len(),
    }))
}

/* ----------------------------
Reporting passthrough
---------------------------- */

async fn ga4_accounts(State(state): State<AppState>) -> ApiResult<Vec<AccountSummary>> {
    state
        .reporting
        .account_summaries()
        .await
        .map(Json)
        .map_err(ApiError::upstream)
}

async fn ga4_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PropertyDetails> {
    state
        .reporting
        .property_details(&id)
        .await
        .map(Json)
        .map_err(ApiError::upstream)
}

async fn ga4_ads_links(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<GoogleAdsLink>> {
    state
        .reporting
        .google_ads_links(&id)
        .await
        .map(Json)
        .map_err(ApiError::upstream)
}

async fn ga4_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> ApiResult<Vec<ReportRow>> {
    if req.dimensions.is_empty() && req.metrics.is_empty() {
        return Err(ApiError::bad_request("at least one dimension or metric is required"));
    }
    state
        .reporting
        .run_report(&req)
        .await
        .map(Json)
        .map_err(ApiError::upstream)
}

async fn ga4_realtime_report(
    State(state): State<AppState>,
    Json(req): Json<RealtimeReportRequest>,
) -> ApiResult<Vec<ReportRow>> {
    if req.dimensions.is_empty() && req.metrics.is_empty() {
        return Err(ApiError::bad_request("at least one dimension or metric is required"));
    }
    state
        .reporting
        .run_realtime_report(&req)
        .await
        .map(Json)
        .map_err(ApiError::upstream)
}
