// src/normalize.rs
//! Token normalizer: turns free text into a lowercase, hyphen-separated slug
//! that is safe to embed in a URL query string.

use deunicode::deunicode_char;
use unicode_normalization::UnicodeNormalization;

const SEPARATOR: char = '-';

/// Normalize free text into a slug of `[a-z0-9-]`.
///
/// Empty input yields an empty string. Normalizing an already normalized
/// slug returns it unchanged.
pub fn normalize_token(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    // 1) Apostrophes separate words ("l'estate" -> "l-estate")
    let out = text.replace('\'', "-");

    // 2) HTML character references (&amp; &#233; &#xE9;)
    let out = html_escape::decode_html_entities(&out).to_string();

    // 3) Transliterate to ASCII
    let mut ascii = String::with_capacity(out.len());
    for c in out.chars() {
        transliterate_into(c, &mut ascii);
    }

    // 4) Lowercase, drop thousands separators between digits
    let lowered = strip_digit_commas(&ascii.to_ascii_lowercase());

    // 5) Collapse everything else into single separators
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Normalized form of `raw`, if it differs from what the user typed.
pub fn suggestion(raw: &str) -> Option<String> {
    let norm = normalize_token(raw);
    (!raw.is_empty() && norm != raw).then_some(norm)
}

/// ASCII approximation of one character. Scripts without Latin letters are
/// romanized (`Москва` -> `Moskva`, `日本` -> `Ri Ben`); only characters with
/// no approximation at all turn into a separator.
fn transliterate_into(c: char, out: &mut String) {
    if c.is_ascii() {
        out.push(c);
        return;
    }
    if let Some(ascii) = deunicode_char(c) {
        out.push_str(ascii);
        return;
    }
    // Not in the romanization tables: keep the ASCII base of its NFKD form.
    let before = out.len();
    for d in c.nfkd() {
        if d.is_ascii() {
            out.push(d);
        }
    }
    if out.len() == before {
        out.push(SEPARATOR);
    }
}

fn strip_digit_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        let between_digits = c == ','
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if !between_digits {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank() {
        assert_eq!(normalize_token(""), "");
        assert_eq!(normalize_token("   \t"), "");
    }

    #[test]
    fn spaces_and_case() {
        assert_eq!(normalize_token("Saldi Estate"), "saldi-estate");
        assert_eq!(normalize_token("  Paid   Search  "), "paid-search");
    }

    #[test]
    fn underscores_become_hyphens() {
        assert_eq!(normalize_token("social_paid"), "social-paid");
    }

    #[test]
    fn accents_are_transliterated() {
        assert_eq!(normalize_token("Perché però"), "perche-pero");
        assert_eq!(normalize_token("Straße"), "strasse");
        assert_eq!(normalize_token("Ærø"), "aero");
    }

    #[test]
    fn apostrophes_and_entities() {
        assert_eq!(normalize_token("L'estate"), "l-estate");
        assert_eq!(normalize_token("Tom &amp; Jerry"), "tom-jerry");
        assert_eq!(normalize_token("caf&#233;"), "cafe");
    }

    #[test]
    fn digit_commas_are_dropped() {
        assert_eq!(normalize_token("Win 1,000 euro"), "win-1000-euro");
        assert_eq!(normalize_token("a, b"), "a-b");
    }

    #[test]
    fn non_latin_scripts_are_romanized() {
        assert_eq!(normalize_token("Москва"), "moskva");
        assert_eq!(normalize_token("Ελλάδα"), "ellada");
        assert_eq!(normalize_token("Saldi Москва"), "saldi-moskva");

        let cjk = normalize_token("日本");
        assert!(!cjk.is_empty());
        assert!(cjk.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
    }

    #[test]
    fn currency_and_ligatures() {
        assert_eq!(normalize_token("Sconto 10€"), "sconto-10eur");
        assert_eq!(normalize_token("ﬁne"), "fine");
    }

    #[test]
    fn idempotent_on_samples() {
        for s in ["Saldi Estate", "L'été à Paris", "--x--", "1,2,3", "Ünïcödé_ß", "Москва 2025"] {
            let once = normalize_token(s);
            assert_eq!(normalize_token(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn suggestion_only_when_changed() {
        assert_eq!(suggestion("google"), None);
        assert_eq!(suggestion(""), None);
        assert_eq!(suggestion("Google Ads"), Some("google-ads".to_string()));
    }
}
