//! Phone channel classification.
//!
//! Business listings expose a single "phone" that may be a mobile line (able
//! to receive direct messages) or a landline. The master workbook keeps these
//! in separate columns, so every number is classified before it is written.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Mobile line, reachable through direct-message apps.
    Mobile,
    Landline,
}

impl ChannelKind {
    pub fn is_mobile_capable(self) -> bool {
        matches!(self, ChannelKind::Mobile)
    }
}

/// Locale-specific strategy for deciding whether a number is mobile-capable.
pub trait ChannelClassifier: Send + Sync {
    fn classify(&self, raw: &str) -> ChannelKind;
}

/// Prefix heuristic: after stripping non-digits and an optional country code,
/// a number is mobile when it starts with `mobile_prefix`.
///
/// The default is Colombia (`+57`, mobiles start with `3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixClassifier {
    pub country_code: String,
    pub mobile_prefix: char,
}

impl Default for PrefixClassifier {
    fn default() -> Self {
        Self { country_code: "57".to_string(), mobile_prefix: '3' }
    }
}

impl PrefixClassifier {
    pub fn new(country_code: impl Into<String>, mobile_prefix: char) -> Self {
        Self { country_code: country_code.into(), mobile_prefix }
    }

    /// National significant digits: digits only, country code removed.
    pub fn national_digits(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if !self.country_code.is_empty() && digits.len() > self.country_code.len() {
            if let Some(rest) = digits.strip_prefix(self.country_code.as_str()) {
                return rest.to_string();
            }
        }
        digits
    }
}

impl ChannelClassifier for PrefixClassifier {
    fn classify(&self, raw: &str) -> ChannelKind {
        if self.national_digits(raw).starts_with(self.mobile_prefix) {
            ChannelKind::Mobile
        } else {
            ChannelKind::Landline
        }
    }
}

/// Route one raw number to `(mobile, landline)` according to `classifier`.
pub fn split_phone(
    classifier: &dyn ChannelClassifier,
    raw: &str,
) -> (Option<String>, Option<String>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    match classifier.classify(trimmed) {
        ChannelKind::Mobile => (Some(trimmed.to_string()), None),
        ChannelKind::Landline => (None, Some(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colombian_mobiles() {
        let c = PrefixClassifier::default();
        assert_eq!(c.classify("+57 300 123 4567"), ChannelKind::Mobile);
        assert_eq!(c.classify("573001234567"), ChannelKind::Mobile);
        assert_eq!(c.classify("310-555-0000"), ChannelKind::Mobile);
    }

    #[test]
    fn colombian_landlines() {
        let c = PrefixClassifier::default();
        assert_eq!(c.classify("(604) 444 5566"), ChannelKind::Landline);
        assert_eq!(c.classify("+57 601 2345678"), ChannelKind::Landline);
        assert_eq!(c.classify(""), ChannelKind::Landline);
    }

    #[test]
    fn bare_country_code_is_not_stripped() {
        let c = PrefixClassifier::default();
        assert_eq!(c.national_digits("57"), "57");
    }

    #[test]
    fn other_locale() {
        let c = PrefixClassifier::new("34", '6');
        assert_eq!(c.classify("+34 612 345 678"), ChannelKind::Mobile);
        assert_eq!(c.classify("+34 912 345 678"), ChannelKind::Landline);
    }

    #[test]
    fn split_routes_exclusively() {
        let c = PrefixClassifier::default();
        assert_eq!(split_phone(&c, " 3001234567 "), (Some("3001234567".into()), None));
        assert_eq!(split_phone(&c, "6044445566"), (None, Some("6044445566".into())));
        assert_eq!(split_phone(&c, "  "), (None, None));
    }
}
