// src/campaign.rs
//! Campaign naming: `Country_Type_Name_Date_CTA`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_token;
use crate::taxonomy::MANUAL_SOURCE_SENTINEL;

/// User input for one link build. Free-text fields are raw; they are
/// normalized on the way into the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFields {
    pub country: String,
    #[serde(default, rename = "type")]
    pub campaign_type: Option<String>,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub cta: Option<String>,
    pub source: String,
    #[serde(default)]
    pub channel: Option<String>,
}

impl CampaignFields {
    pub(crate) fn normalized_country(&self) -> String {
        normalize_token(&self.country)
    }

    pub(crate) fn normalized_type(&self) -> String {
        normalize_opt(self.campaign_type.as_deref())
    }

    pub(crate) fn normalized_name(&self) -> String {
        normalize_token(&self.name)
    }

    pub(crate) fn normalized_cta(&self) -> String {
        normalize_opt(self.cta.as_deref())
    }

    /// The manual-entry sentinel only opens the free-text field; it is
    /// never a source.
    pub(crate) fn normalized_source(&self) -> String {
        if self.is_manual_source() {
            return String::new();
        }
        normalize_token(&self.source)
    }

    pub(crate) fn is_manual_source(&self) -> bool {
        self.source.trim() == MANUAL_SOURCE_SENTINEL
    }

    pub(crate) fn normalized_channel(&self) -> String {
        normalize_opt(self.channel.as_deref())
    }
}

fn normalize_opt(v: Option<&str>) -> String {
    v.map(normalize_token).unwrap_or_default()
}

/// `YYYYMMDD`
pub fn format_campaign_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Underscore-joined campaign identifier. Empty parts are skipped; the date
/// is always present.
pub fn compose_campaign_name(fields: &CampaignFields) -> String {
    let date = format_campaign_date(fields.date);
    let parts = [
        fields.normalized_country(),
        fields.normalized_type(),
        fields.normalized_name(),
        date,
        fields.normalized_cta(),
    ];
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CampaignFields {
        CampaignFields {
            country: "it".into(),
            campaign_type: None,
            name: "saldi estate".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            cta: None,
            source: "google".into(),
            channel: None,
        }
    }

    #[test]
    fn minimal_name() {
        assert_eq!(compose_campaign_name(&fields()), "it_saldi-estate_20250601");
    }

    #[test]
    fn all_parts_in_order() {
        let f = CampaignFields {
            country: "IT".into(),
            campaign_type: Some("Promo".into()),
            cta: Some("Banner Top".into()),
            ..fields()
        };
        assert_eq!(
            compose_campaign_name(&f),
            "it_promo_saldi-estate_20250601_banner-top"
        );
    }

    #[test]
    fn blank_optionals_leave_no_gaps() {
        let f = CampaignFields {
            campaign_type: Some("   ".into()),
            cta: Some("".into()),
            ..fields()
        };
        let name = compose_campaign_name(&f);
        assert!(!name.contains("__"));
        assert_eq!(name, "it_saldi-estate_20250601");
    }

    #[test]
    fn date_survives_empty_fields() {
        let f = CampaignFields {
            country: "".into(),
            name: "".into(),
            ..fields()
        };
        assert_eq!(compose_campaign_name(&f), "20250601");
    }
}
