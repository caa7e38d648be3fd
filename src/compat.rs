// src/compat.rs
//! Source → channel compatibility.
//!
//! Narrows the client's channel list to the traffic types that list the chosen
//! source in the taxonomy. When the data cannot disambiguate (no source, manual
//! entry, unknown source, or no overlap with the client's channels) the full
//! client list is returned so the user is never left without options.

use std::collections::BTreeSet;

use crate::taxonomy::{traffic_types_for_source, MANUAL_SOURCE_SENTINEL};

/// Channels the client may pair with `source`, led by an empty "unselected" option.
pub fn compatible_channels(source: &str, client_channels: &[String]) -> Vec<String> {
    let source = source.trim();
    if source.is_empty() || source == MANUAL_SOURCE_SENTINEL {
        return unfiltered(client_channels);
    }

    let compatible: BTreeSet<String> = traffic_types_for_source(source)
        .into_iter()
        .map(str::to_lowercase)
        .collect();
    if compatible.is_empty() {
        return unfiltered(client_channels);
    }

    let mut filtered: Vec<String> = client_channels
        .iter()
        .filter(|c| compatible.contains(&c.trim().to_lowercase()))
        .cloned()
        .collect();
    if filtered.is_empty() {
        return unfiltered(client_channels);
    }

    filtered.sort();
    let mut out = Vec::with_capacity(filtered.len() + 1);
    out.push(String::new());
    out.extend(filtered);
    out
}

/// The resolver output without the empty option.
pub fn real_options(options: &[String]) -> Vec<&str> {
    options
        .iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect()
}

/// A channel must be picked when more than one real option remains and none was chosen.
pub fn channel_required(source: &str, chosen: Option<&str>, client_channels: &[String]) -> bool {
    let chosen = chosen.map(str::trim).unwrap_or_default();
    if !chosen.is_empty() {
        return false;
    }
    let options = compatible_channels(source, client_channels);
    real_options(&options).len() > 1
}

fn unfiltered(client_channels: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(client_channels.len() + 1);
    out.push(String::new());
    out.extend(client_channels.iter().cloned());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn google_narrows_to_paid_search() {
        let c = client(&["Paid Search", "Affiliate", "Organic Social"]);
        assert_eq!(compatible_channels("google", &c), vec!["", "Paid Search"]);
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        let c = client(&["Video", " display ", "Email"]);
        assert_eq!(
            compatible_channels("  GOOGLE ", &c),
            vec!["", " display ", "Video"]
        );
    }

    #[test]
    fn unknown_source_fails_open() {
        let c = client(&["Paid Search", "Affiliate"]);
        assert_eq!(
            compatible_channels("zzz-unknown", &c),
            vec!["", "Paid Search", "Affiliate"]
        );
    }

    #[test]
    fn empty_intersection_fails_open() {
        let c = client(&["Affiliate", "Email"]);
        assert_eq!(
            compatible_channels("youtube", &c),
            vec!["", "Affiliate", "Email"]
        );
    }

    #[test]
    fn empty_and_manual_sources_are_unfiltered() {
        let c = client(&["Email", "Display"]);
        assert_eq!(compatible_channels("", &c), vec!["", "Email", "Display"]);
        assert_eq!(
            compatible_channels(MANUAL_SOURCE_SENTINEL, &c),
            vec!["", "Email", "Display"]
        );
    }

    #[test]
    fn filtered_result_is_sorted() {
        let c = client(&["Paid Social", "Organic Social", "Email"]);
        assert_eq!(
            compatible_channels("facebook", &c),
            vec!["", "Organic Social", "Paid Social"]
        );
    }

    #[test]
    fn channel_required_only_when_ambiguous() {
        let c = client(&["Paid Social", "Organic Social", "Email"]);
        assert!(channel_required("instagram", None, &c));
        assert!(channel_required("instagram", Some("  "), &c));
        assert!(!channel_required("instagram", Some("Paid Social"), &c));
        assert!(!channel_required("mailchimp", None, &c));
    }
}
