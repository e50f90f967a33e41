//! Identity key canonicalization.
//!
//! Two values refer to the same business when their normalized keys are equal
//! and non-empty. Normalization strips the URL scheme and a leading `www.`,
//! lower-cases, and keeps only ASCII letters and digits, so
//! `"https://www.Cafe-Sol.com/"` and `"cafesol.com"` both become `"cafesolcom"`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:https?://)?(?:www\.)?").expect("static regex"))
}

/// Canonicalize an identity string. Pure and idempotent.
///
/// Returns an empty string when nothing alphanumeric remains. An empty key
/// never matches anything; use [`Key::new`] to get that rule for free.
pub fn normalize_key(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let stripped = prefix_re().replace(&lowered, "");
    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// A non-empty normalized identity key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    /// Normalize `value`, returning `None` for inputs that produce an empty key.
    pub fn new(value: &str) -> Option<Self> {
        let key = normalize_key(value);
        if key.is_empty() {
            None
        } else {
            Some(Key(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Websites
// ---------------------------------------------------------------------------

/// Hosts that are messaging links, social profiles, map pins or shorteners.
/// A listing whose only "website" is one of these has no website.
pub const EXCLUDED_WEBSITE_HOSTS: &[&str] = &[
    "wa.me",
    "wa.link",
    "whatsapp.com",
    "web.whatsapp.com",
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "tiktok.com",
    "linkedin.com",
    "youtube.com",
    "maps.google.com",
    "goo.gl",
    "bit.ly",
    "tinyurl.com",
    "t.co",
];

/// Extract the lower-cased host from a URL-ish string without a full parse.
pub fn website_host(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let rest = match trimmed.find("://") {
        Some(idx) => &trimmed[idx + 3..],
        None => trimmed,
    };
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    // drop credentials and port
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host).to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// True if `raw` points at an excluded host or any subdomain of one.
pub fn is_excluded_website(raw: &str) -> bool {
    let Some(host) = website_host(raw) else {
        return false;
    };
    EXCLUDED_WEBSITE_HOSTS.iter().any(|excluded| {
        host == *excluded || host.ends_with(&format!(".{excluded}"))
    })
}

/// Clean a raw website value into something a browser can open.
///
/// Adds `https://` when no scheme is present, drops the fragment and trailing
/// slash, and returns `None` for blank values and excluded hosts.
pub fn clean_website(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_excluded_website(trimmed) {
        return None;
    }
    let mut url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    if let Some(idx) = url.find('#') {
        url.truncate(idx);
    }
    while url.ends_with('/') {
        url.pop();
    }
    website_host(&url)?;
    Some(url)
}
