//! # Taxonomy
//!
//! The channel guide: which `utm_medium` / `utm_source` values belong to each
//! traffic type, plus the [`SourceCatalog`] of literal sources derived from it.
//!
//! - The table is compiled in as a static slice; it is never edited at runtime.
//! - Source tokens wrapped in parentheses or brackets (`(domain)`, `(direct)`)
//!   are placeholders, not literal sources.
//! - The catalog grows with sources observed on a property and never shrinks.

use serde::Serialize;
use std::collections::BTreeSet;

/// Selectable source meaning "the user types the source by hand".
pub const MANUAL_SOURCE_SENTINEL: &str = "Altro (Inserisci manuale)";

/// One row of the channel guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficTypeRule {
    pub traffic_type: &'static str,
    /// Alternates are kept in order; displayed joined with `|`.
    pub allowed_mediums: &'static [&'static str],
    pub allowed_sources: &'static [&'static str],
}

impl TrafficTypeRule {
    /// Medium column as shown in the guide, e.g. `email|mailing_campaign`.
    pub fn medium_label(&self) -> String {
        self.allowed_mediums.join("|")
    }

    /// Source column as shown in the guide, e.g. `google, bing`.
    pub fn source_label(&self) -> String {
        self.allowed_sources.join(", ")
    }

    /// Case-insensitive, whitespace-trimmed membership test.
    pub fn lists_source(&self, source: &str) -> bool {
        let needle = source.trim().to_lowercase();
        self.allowed_sources
            .iter()
            .any(|s| s.trim().to_lowercase() == needle)
    }

    /// Literal (non-placeholder) sources of this row.
    pub fn literal_sources(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.allowed_sources
            .iter()
            .copied()
            .map(|s| s.trim().trim_end_matches("...").trim())
            .filter(|s| is_literal_source(s))
    }
}

pub const TAXONOMY: &[TrafficTypeRule] = &[
    TrafficTypeRule {
        traffic_type: "Organic",
        allowed_mediums: &["organic"],
        allowed_sources: &["google", "bing", "yahoo"],
    },
    TrafficTypeRule {
        traffic_type: "Referral",
        allowed_mediums: &["referral"],
        allowed_sources: &["(domain)"],
    },
    TrafficTypeRule {
        traffic_type: "Direct",
        allowed_mediums: &["(none)"],
        allowed_sources: &["(direct)"],
    },
    TrafficTypeRule {
        traffic_type: "Paid Search",
        allowed_mediums: &["cpc"],
        allowed_sources: &["google", "bing"],
    },
    TrafficTypeRule {
        traffic_type: "Affiliate",
        allowed_mediums: &["affiliate"],
        allowed_sources: &["tradetracker", "awin"],
    },
    TrafficTypeRule {
        traffic_type: "Display",
        allowed_mediums: &["cpm"],
        allowed_sources: &["reservation", "display", "dv360", "google"],
    },
    TrafficTypeRule {
        traffic_type: "Video",
        allowed_mediums: &["cpv"],
        allowed_sources: &["youtube", "vimeo", "google"],
    },
    TrafficTypeRule {
        traffic_type: "Programmatic",
        allowed_mediums: &["cpm"],
        allowed_sources: &["rcs", "mediamond", "rai", "manzoni"],
    },
    TrafficTypeRule {
        traffic_type: "Email",
        allowed_mediums: &["email", "mailing_campaign"],
        allowed_sources: &["newsletter", "email", "crm", "sfmc", "mailchimp"],
    },
    TrafficTypeRule {
        traffic_type: "Organic Social",
        allowed_mediums: &["social_org"],
        allowed_sources: &["facebook", "instagram", "tiktok", "linkedin", "pinterest"],
    },
    TrafficTypeRule {
        traffic_type: "Paid Social",
        allowed_mediums: &["social_paid"],
        allowed_sources: &["facebook", "instagram", "tiktok", "linkedin", "pinterest"],
    },
    TrafficTypeRule {
        traffic_type: "App traffic",
        allowed_mediums: &["-"],
        allowed_sources: &["app"],
    },
    TrafficTypeRule {
        traffic_type: "SMS",
        allowed_mediums: &["offline"],
        allowed_sources: &["sms"],
    },
    TrafficTypeRule {
        traffic_type: "Altro",
        allowed_mediums: &["other"],
        allowed_sources: &[],
    },
];

/// Traffic types whose rows list `source` (case-insensitive, trimmed).
pub fn traffic_types_for_source(source: &str) -> BTreeSet<&'static str> {
    TAXONOMY
        .iter()
        .filter(|r| r.lists_source(source))
        .map(|r| r.traffic_type)
        .collect()
}

fn is_literal_source(token: &str) -> bool {
    !token.is_empty() && !token.contains('(') && !token.contains('[')
}

/// Guide row as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct GuideRow {
    #[serde(rename = "Traffic type")]
    pub traffic_type: String,
    pub utm_medium: String,
    pub utm_source: String,
}

pub fn guide_rows() -> Vec<GuideRow> {
    TAXONOMY
        .iter()
        .map(|r| GuideRow {
            traffic_type: r.traffic_type.to_string(),
            utm_medium: r.medium_label(),
            utm_source: r.source_label(),
        })
        .collect()
}

/// Known literal sources: the taxonomy's own plus any observed at runtime.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: BTreeSet<String>,
}

impl SourceCatalog {
    /// Catalog seeded from every taxonomy row.
    pub fn from_taxonomy() -> Self {
        let sources = TAXONOMY
            .iter()
            .flat_map(|r| r.literal_sources())
            .map(str::to_string)
            .collect();
        Self { sources }
    }

    /// Set union with observed sources. Returns how many were new.
    pub fn merge<I, S>(&mut self, observed: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.sources.len();
        for s in observed {
            let t = s.as_ref().trim();
            if !t.is_empty() {
                self.sources.insert(t.to_string());
            }
        }
        self.sources.len() - before
    }

    pub fn contains(&self, source: &str) -> bool {
        let needle = source.trim();
        self.sources.iter().any(|s| s.eq_ignore_ascii_case(needle))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }

    /// Selectable options: empty first, sorted catalog, manual sentinel last.
    pub fn options(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.sources.len() + 2);
        out.push(String::new());
        out.extend(self.sources.iter().cloned());
        out.push(MANUAL_SOURCE_SENTINEL.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_fourteen_rows() {
        assert_eq!(TAXONOMY.len(), 14);
    }

    #[test]
    fn google_maps_to_four_traffic_types() {
        let types = traffic_types_for_source("  Google ");
        let want: BTreeSet<&str> = ["Organic", "Paid Search", "Display", "Video"].into();
        assert_eq!(types, want);
    }

    #[test]
    fn catalog_skips_placeholders() {
        let c = SourceCatalog::from_taxonomy();
        assert!(c.contains("google"));
        assert!(c.contains("Mailchimp"));
        assert!(!c.contains("(domain)"));
        assert!(!c.contains("(direct)"));
        assert!(!c.iter().any(|s| s.is_empty()));
    }

    #[test]
    fn merge_only_grows() {
        let mut c = SourceCatalog::from_taxonomy();
        let base = c.len();
        assert_eq!(c.merge(["google", " partner-site ", ""]), 1);
        assert_eq!(c.len(), base + 1);
        assert_eq!(c.merge(Vec::<String>::new()), 0);
        assert_eq!(c.len(), base + 1);
    }

    #[test]
    fn options_are_bracketed_by_empty_and_sentinel() {
        let opts = SourceCatalog::from_taxonomy().options();
        assert_eq!(opts.first().map(String::as_str), Some(""));
        assert_eq!(opts.last().map(String::as_str), Some(MANUAL_SOURCE_SENTINEL));
        let middle = &opts[1..opts.len() - 1];
        let mut sorted = middle.to_vec();
        sorted.sort();
        assert_eq!(middle, sorted.as_slice());
    }

    #[test]
    fn medium_alternates_render_with_pipe() {
        let email = TAXONOMY.iter().find(|r| r.traffic_type == "Email").unwrap();
        assert_eq!(email.medium_label(), "email|mailing_campaign");
    }
}
