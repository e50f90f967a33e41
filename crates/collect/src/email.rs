//! Contact email discovery on business websites.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::error::ScanError;

/// Pages tried, in order, relative to the site root.
pub const CONTACT_PATHS: &[&str] = &[
    "/contact",
    "/contacto",
    "/contact-us",
    "/contactenos",
    "/contactar",
    "/",
    "/about",
    "/nosotros",
    "/quienes-somos",
    "/acerca",
    "/ubicacion",
    "/location",
    "/reservas",
    "/reserva",
    "/bookings",
    "/booking",
    "/politica-de-datos",
    "/politica-de-privacidad",
    "/privacy-policy",
];

/// Domains that only show up in templates and placeholder text.
const PLACEHOLDER_DOMAINS: &[&str] = &["example.com", "localhost", "test.com", "demo.com", "domain.com"];

/// Asset suffixes that the address regex mistakes for TLDs (`logo@2x.png`).
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".css", ".js"];

pub trait EmailFinder: Send + Sync {
    /// Contact emails published on `website`, best candidate first.
    fn find_emails(&self, website: &str) -> Result<Vec<String>, ScanError>;
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9_.+%-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("static regex")
    })
}

fn mailto_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)mailto:([^"'?>\s]+)"#).expect("static regex"))
}

fn is_plausible(email: &str) -> bool {
    let lower = email.to_lowercase();
    let Some((_, domain)) = lower.rsplit_once('@') else {
        return false;
    };
    if PLACEHOLDER_DOMAINS.iter().any(|d| domain == *d || domain.ends_with(&format!(".{d}"))) {
        return false;
    }
    !ASSET_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Addresses in `html`: `mailto:` links first, then plain-text matches.
/// Lower-cased, deduplicated, placeholders removed.
pub fn extract_emails(html: &str) -> Vec<String> {
    let mailto = mailto_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let plain = email_re().find_iter(html).map(|m| m.as_str().to_string());

    let mut out: Vec<String> = Vec::new();
    for candidate in mailto.chain(plain) {
        let email = candidate.trim().trim_end_matches('.').to_lowercase();
        if email_re().is_match(&email) && is_plausible(&email) && !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

/// Stable sort: addresses on the site's own domain first.
pub fn rank_by_domain(emails: &mut [String], site_host: &str) {
    let host = site_host.trim_start_matches("www.").to_lowercase();
    emails.sort_by_key(|e| {
        let domain = e.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
        let own = domain == host || host.ends_with(&format!(".{domain}")) || domain.ends_with(&format!(".{host}"));
        !own
    });
}

/// Fetches likely contact pages and harvests addresses from them.
pub struct SiteEmailScanner {
    http: reqwest::blocking::Client,
    max_pages: usize,
}

impl SiteEmailScanner {
    pub fn new(max_pages: usize, timeout: Duration) -> Result<Self, ScanError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("leadbase/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Unreachable(e.to_string()))?;
        Ok(Self { http, max_pages: max_pages.max(1) })
    }

    fn fetch(&self, url: &Url) -> Option<String> {
        let resp = self.http.get(url.clone()).send().ok()?;
        if !resp.status().is_success() {
            log::debug!("{} -> HTTP {}", url, resp.status().as_u16());
            return None;
        }
        resp.text().ok()
    }
}

impl EmailFinder for SiteEmailScanner {
    fn find_emails(&self, website: &str) -> Result<Vec<String>, ScanError> {
        let trimmed = website.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let root = Url::parse(&with_scheme).map_err(|e| ScanError::InvalidUrl(format!("{website}: {e}")))?;
        let host = root
            .host_str()
            .ok_or_else(|| ScanError::InvalidUrl(format!("{website}: no host")))?
            .to_string();

        let mut found: Vec<String> = Vec::new();
        let mut reached = 0usize;
        for path in CONTACT_PATHS.iter().take(self.max_pages) {
            let Ok(page_url) = root.join(path) else {
                continue;
            };
            let Some(html) = self.fetch(&page_url) else {
                continue;
            };
            reached += 1;
            for email in extract_emails(&html) {
                if !found.contains(&email) {
                    found.push(email);
                }
            }
            if !found.is_empty() {
                break;
            }
        }

        if reached == 0 {
            return Err(ScanError::Unreachable(host));
        }
        rank_by_domain(&mut found, &host);
        Ok(found)
    }
}
