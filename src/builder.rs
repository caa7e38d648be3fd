// src/builder.rs
//! Link builder: turns campaign fields + destination into a tagged URL, or
//! reports which required fields are missing or invalid.
//!
//! Every free-text value passes through [`normalize_token`] before it is
//! concatenated; the destination itself is validated, never rewritten.
//! Advisory [`FieldHint`]s are computed separately and never block a build.

use std::fmt;

use serde::Serialize;
use strsim::normalized_levenshtein;

use crate::campaign::{compose_campaign_name, CampaignFields};
use crate::compat::{channel_required, compatible_channels, real_options};
use crate::normalize::{normalize_token, suggestion};
use crate::taxonomy::{SourceCatalog, MANUAL_SOURCE_SENTINEL};
use crate::validate::{is_valid_url, matches_expected_domain};

/// Minimum similarity for proposing a known source in place of an unknown one.
const CLOSEST_SOURCE_MIN_SIMILARITY: f64 = 0.6;

/// Everything needed for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub fields: CampaignFields,
    pub destination_url: String,
    pub expected_domain: Option<String>,
}

/// A ready-to-use tagged link and its technical parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltLink {
    pub url: String,
    pub source: String,
    pub medium: String,
    pub campaign: String,
    pub content: Option<String>,
}

/// Required inputs, labelled the way the builder form labels them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MissingField {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "Source")]
    Source,
    #[serde(rename = "Canale")]
    Channel,
    #[serde(rename = "Country")]
    Country,
    #[serde(rename = "Name")]
    Name,
}

impl MissingField {
    pub fn label(self) -> &'static str {
        match self {
            MissingField::Url => "URL",
            MissingField::Source => "Source",
            MissingField::Channel => "Canale",
            MissingField::Country => "Country",
            MissingField::Name => "Name",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-empty list of missing/invalid fields, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MissingFields(pub Vec<MissingField>);

impl MissingFields {
    pub fn contains(&self, field: MissingField) -> bool {
        self.0.contains(&field)
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.0.iter().map(|f| f.label()).collect()
    }
}

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing: {}", self.labels().join(", "))
    }
}

impl std::error::Error for MissingFields {}

/// Build the tagged link, or list what is missing.
pub fn build_link(req: &LinkRequest, client_channels: &[String]) -> Result<BuiltLink, MissingFields> {
    let f = &req.fields;
    let source = f.normalized_source();
    let country = f.normalized_country();
    let name = f.normalized_name();

    let mut missing = Vec::new();
    if !is_valid_url(&req.destination_url) {
        missing.push(MissingField::Url);
    }
    if source.is_empty() {
        missing.push(MissingField::Source);
    }
    if channel_required(&f.source, f.channel.as_deref(), client_channels) {
        missing.push(MissingField::Channel);
    }
    if country.is_empty() {
        missing.push(MissingField::Country);
    }
    if name.is_empty() {
        missing.push(MissingField::Name);
    }
    if !missing.is_empty() {
        return Err(MissingFields(missing));
    }

    let medium = f.normalized_channel();
    let campaign = compose_campaign_name(f);
    let content = f.normalized_cta();

    let sep = if req.destination_url.contains('?') { '&' } else { '?' };
    let mut url = format!(
        "{}{sep}utm_source={source}&utm_medium={medium}&utm_campaign={campaign}",
        req.destination_url
    );
    if !content.is_empty() {
        url.push_str("&utm_content=");
        url.push_str(&content);
    }

    Ok(BuiltLink {
        url,
        source,
        medium,
        campaign,
        content: (!content.is_empty()).then_some(content),
    })
}

/// Free-text fields that can carry a spelling suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintField {
    Source,
    Name,
}

/// Advisory feedback for the form. Never blocks a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldHint {
    /// The raw value is not a slug; this is what will be used.
    Suggested { field: HintField, value: String },
    /// Destination does not mention the property's expected domain.
    DomainMismatch { expected: String },
    /// Several channels fit the source; one must be picked.
    AmbiguousChannel { options: Vec<String> },
    /// Chosen channel is not among those compatible with the source.
    IncompatibleChannel { channel: String, options: Vec<String> },
    /// Source is not in the catalog.
    UnknownSource { source: String, closest: Option<String> },
}

/// Advisory hints for a build request.
pub fn field_hints(
    req: &LinkRequest,
    client_channels: &[String],
    catalog: &SourceCatalog,
) -> Vec<FieldHint> {
    let f = &req.fields;
    let mut hints = Vec::new();

    if let Some(value) = suggestion(&f.source).filter(|_| !f.is_manual_source()) {
        hints.push(FieldHint::Suggested {
            field: HintField::Source,
            value,
        });
    }
    if let Some(value) = suggestion(&f.name) {
        hints.push(FieldHint::Suggested {
            field: HintField::Name,
            value,
        });
    }

    if let Some(expected) = req.expected_domain.as_deref() {
        if is_valid_url(&req.destination_url)
            && !matches_expected_domain(&req.destination_url, expected)
        {
            hints.push(FieldHint::DomainMismatch {
                expected: expected.trim().to_string(),
            });
        }
    }

    let options = compatible_channels(&f.source, client_channels);
    let real: Vec<String> = real_options(&options)
        .into_iter()
        .map(str::to_string)
        .collect();
    let chosen = f.channel.as_deref().map(str::trim).unwrap_or_default();
    if chosen.is_empty() {
        if real.len() > 1 && !f.source.trim().is_empty() {
            hints.push(FieldHint::AmbiguousChannel { options: real });
        }
    } else if !real.iter().any(|c| c.trim().eq_ignore_ascii_case(chosen)) {
        hints.push(FieldHint::IncompatibleChannel {
            channel: chosen.to_string(),
            options: real,
        });
    }

    if let Some(hint) = unknown_source_hint(&f.source, catalog) {
        hints.push(hint);
    }

    hints
}

fn unknown_source_hint(raw: &str, catalog: &SourceCatalog) -> Option<FieldHint> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MANUAL_SOURCE_SENTINEL {
        return None;
    }
    let norm = normalize_token(raw);
    if catalog.contains(raw) || catalog.contains(&norm) {
        return None;
    }
    let closest = catalog
        .iter()
        .map(|known| (known, normalized_levenshtein(&norm, &known.to_lowercase())))
        .filter(|(_, sim)| *sim >= CLOSEST_SOURCE_MIN_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known.to_string());
    Some(FieldHint::UnknownSource {
        source: norm,
        closest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn channels() -> Vec<String> {
        ["Paid Search", "Paid Social", "Organic Social", "Email", "Affiliate"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn req() -> LinkRequest {
        LinkRequest {
            fields: CampaignFields {
                country: "it".into(),
                campaign_type: Some("promo".into()),
                name: "Saldi Estate".into(),
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                cta: Some("Banner".into()),
                source: "google".into(),
                channel: Some("Paid Search".into()),
            },
            destination_url: "https://sito.it/saldi".into(),
            expected_domain: None,
        }
    }

    #[test]
    fn builds_full_link() {
        let link = build_link(&req(), &channels()).unwrap();
        assert_eq!(
            link.url,
            "https://sito.it/saldi?utm_source=google&utm_medium=paid-search\
             &utm_campaign=it_promo_saldi-estate_20250601_banner&utm_content=banner"
        );
        assert_eq!(link.medium, "paid-search");
        assert_eq!(link.content.as_deref(), Some("banner"));
    }

    #[test]
    fn ampersand_when_destination_has_query() {
        let mut r = req();
        r.destination_url = "https://sito.it/saldi?ref=home".into();
        let link = build_link(&r, &channels()).unwrap();
        assert!(link.url.starts_with("https://sito.it/saldi?ref=home&utm_source=google"));
    }

    #[test]
    fn no_content_without_cta() {
        let mut r = req();
        r.fields.cta = None;
        let link = build_link(&r, &channels()).unwrap();
        assert!(!link.url.contains("utm_content"));
        assert_eq!(link.content, None);
    }

    #[test]
    fn all_missing_in_form_order() {
        let mut r = req();
        r.destination_url = "https://".into();
        r.fields.source = "".into();
        r.fields.channel = None;
        r.fields.country = " ".into();
        r.fields.name = "!!!".into();
        let err = build_link(&r, &channels()).unwrap_err();
        // empty source leaves all five client channels selectable
        assert_eq!(err.labels(), vec!["URL", "Source", "Canale", "Country", "Name"]);
        assert_eq!(err.to_string(), "missing: URL, Source, Canale, Country, Name");
    }

    #[test]
    fn channel_not_required_for_single_option() {
        let mut r = req();
        r.fields.source = "mailchimp".into();
        r.fields.channel = None;
        let link = build_link(&r, &channels()).unwrap();
        assert!(link.url.contains("utm_medium=&utm_campaign="));
    }

    #[test]
    fn manual_entry_sentinel_is_not_a_source() {
        let mut r = req();
        r.fields.source = format!(" {MANUAL_SOURCE_SENTINEL} ");
        r.fields.channel = Some("Email".into());
        let err = build_link(&r, &channels()).unwrap_err();
        assert_eq!(err.0, vec![MissingField::Source]);

        let hints = field_hints(&r, &channels(), &SourceCatalog::from_taxonomy());
        assert!(!hints
            .iter()
            .any(|h| matches!(h, FieldHint::Suggested { field: HintField::Source, .. })));
    }

    #[test]
    fn non_latin_name_is_romanized_not_missing() {
        let mut r = req();
        r.fields.name = "Москва".into();
        r.fields.cta = None;
        let link = build_link(&r, &channels()).unwrap();
        assert_eq!(link.campaign, "it_promo_moskva_20250601");
        assert!(link.url.is_ascii());
    }

    #[test]
    fn ambiguous_source_requires_channel() {
        let mut r = req();
        r.fields.source = "facebook".into();
        r.fields.channel = None;
        let err = build_link(&r, &channels()).unwrap_err();
        assert_eq!(err.0, vec![MissingField::Channel]);
    }

    #[test]
    fn raw_text_never_reaches_url() {
        let mut r = req();
        r.fields.source = "Google Ads!".into();
        r.fields.cta = Some("Scopri di più".into());
        let link = build_link(&r, &channels()).unwrap();
        assert!(link.url.contains("utm_source=google-ads&"));
        assert!(link.url.ends_with("utm_content=scopri-di-piu"));
        assert!(!link.url.contains(' '));
    }

    #[test]
    fn hints_cover_spelling_domain_and_source() {
        let mut r = req();
        r.fields.source = "Gogle".into();
        r.expected_domain = Some("brand.it".into());
        let hints = field_hints(&r, &channels(), &SourceCatalog::from_taxonomy());
        assert!(hints.contains(&FieldHint::Suggested {
            field: HintField::Source,
            value: "gogle".into()
        }));
        assert!(hints.contains(&FieldHint::Suggested {
            field: HintField::Name,
            value: "saldi-estate".into()
        }));
        assert!(hints.contains(&FieldHint::DomainMismatch {
            expected: "brand.it".into()
        }));
        assert!(hints.contains(&FieldHint::UnknownSource {
            source: "gogle".into(),
            closest: Some("google".into())
        }));
    }

    #[test]
    fn hints_flag_ambiguous_and_incompatible_channels() {
        let mut r = req();
        r.fields.source = "instagram".into();
        r.fields.channel = None;
        let hints = field_hints(&r, &channels(), &SourceCatalog::from_taxonomy());
        assert!(hints.contains(&FieldHint::AmbiguousChannel {
            options: vec!["Organic Social".into(), "Paid Social".into()]
        }));

        r.fields.channel = Some("Email".into());
        let hints = field_hints(&r, &channels(), &SourceCatalog::from_taxonomy());
        assert!(hints
            .iter()
            .any(|h| matches!(h, FieldHint::IncompatibleChannel { channel, .. } if channel == "Email")));
    }

    #[test]
    fn clean_request_has_no_hints() {
        let mut r = req();
        r.fields.name = "saldi-estate".into();
        let hints = field_hints(&r, &channels(), &SourceCatalog::from_taxonomy());
        assert!(hints.is_empty(), "{hints:?}");
    }
}
