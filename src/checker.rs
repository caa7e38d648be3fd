// src/checker.rs
//! UTM checker: parses an arbitrary URL and reports HTTPS, length and the
//! presence of each UTM parameter.

use std::collections::HashMap;

use serde::Serialize;
use url::Url;

/// URLs at or above this many characters are flagged.
pub const MAX_URL_CHARS: usize = 2048;

/// (key, label, required) in report order.
const UTM_PARAMS: [(&str, &str, bool); 5] = [
    ("utm_source", "UTM Source", true),
    ("utm_medium", "UTM Medium", true),
    ("utm_campaign", "UTM Campaign", true),
    ("utm_term", "UTM Term", false),
    ("utm_content", "UTM Content", false),
];

/// Decomposed URL; only the first non-blank value of each query key is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUtmUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

impl ParsedUtmUrl {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(raw.trim())?;
        let mut query = HashMap::new();
        for (k, v) in parsed.query_pairs() {
            if v.trim().is_empty() {
                continue;
            }
            query.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: parsed.host_str().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
            query,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStatus {
    Present,
    MissingRequired,
    MissingOptional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamCheck {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub status: ParamStatus,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlChecks {
    pub is_https: bool,
    pub length: usize,
    pub length_ok: bool,
    pub has_any_utm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtmReport {
    pub url_checks: UrlChecks,
    pub params: Vec<ParamCheck>,
}

impl UtmReport {
    /// Status of one UTM key, if it is one the checker reports on.
    pub fn status(&self, key: &str) -> Option<ParamStatus> {
        self.params.iter().find(|p| p.key == key).map(|p| p.status)
    }

    /// No required UTM parameter is missing.
    pub fn is_compliant(&self) -> bool {
        self.params
            .iter()
            .all(|p| p.status != ParamStatus::MissingRequired)
    }
}

/// Either a full report, or a single parse failure; never a partial report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Report(UtmReport),
    ParseFailure { reason: String },
}

impl CheckOutcome {
    pub fn report(&self) -> Option<&UtmReport> {
        match self {
            CheckOutcome::Report(r) => Some(r),
            CheckOutcome::ParseFailure { .. } => None,
        }
    }
}

/// Check a URL for UTM compliance.
pub fn check_url(raw: &str) -> CheckOutcome {
    if raw.trim().is_empty() {
        return CheckOutcome::ParseFailure {
            reason: "empty URL".to_string(),
        };
    }
    let parsed = match ParsedUtmUrl::parse(raw) {
        Ok(p) => p,
        Err(e) => {
            return CheckOutcome::ParseFailure {
                reason: e.to_string(),
            }
        }
    };

    let length = raw.chars().count();
    let url_checks = UrlChecks {
        is_https: parsed.scheme == "https",
        length,
        length_ok: length < MAX_URL_CHARS,
        has_any_utm: parsed.query.keys().any(|k| k.starts_with("utm_")),
    };

    let params = UTM_PARAMS
        .iter()
        .map(|&(key, label, required)| {
            let value = parsed.query.get(key).cloned();
            let status = match (&value, required) {
                (Some(_), _) => ParamStatus::Present,
                (None, true) => ParamStatus::MissingRequired,
                (None, false) => ParamStatus::MissingOptional,
            };
            ParamCheck {
                key,
                label,
                required,
                status,
                value,
            }
        })
        .collect();

    CheckOutcome::Report(UtmReport { url_checks, params })
}
