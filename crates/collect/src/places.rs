//! Places Text Search client.
//!
//! Blocking reqwest client (no Tokio runtime required). Pages through
//! `places:searchText` results with `nextPageToken` until the requested
//! number of listings is reached or the source runs out.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use crate::error::LookupError;
use crate::source::{Listing, LookupSource};

pub const DEFAULT_BASE_URL: &str = "https://places.googleapis.com";

/// Results per page accepted by the API.
const PAGE_SIZE: usize = 20;

const MAX_RETRIES: u32 = 3;

const FIELD_MASK: &str = "places.id,places.displayName,places.nationalPhoneNumber,\
places.internationalPhoneNumber,places.websiteUri,places.formattedAddress,nextPageToken";

#[derive(Debug, Clone)]
pub struct PlacesOptions {
    pub base_url: String,
    pub language: String,
    pub region: String,
    pub timeout: Duration,
    pub rate_limit_per_minute: u32,
    /// First retry delay; doubles per attempt.
    pub backoff: Duration,
}

impl Default for PlacesOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: "es".to_string(),
            region: "co".to_string(),
            timeout: Duration::from_secs(10),
            rate_limit_per_minute: 600,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Spaces requests at least `interval` apart.
#[derive(Debug)]
struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    fn per_minute(rate: u32) -> Self {
        let interval = Duration::from_secs(60) / rate.max(1);
        Self { interval, last: Mutex::new(None) }
    }

    fn wait(&self) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    places: Vec<Place>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    id: Option<String>,
    display_name: Option<LocalizedText>,
    national_phone_number: Option<String>,
    international_phone_number: Option<String>,
    website_uri: Option<String>,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

impl Place {
    fn into_listing(self) -> Listing {
        let maps_url = self
            .id
            .as_ref()
            .map(|id| format!("https://www.google.com/maps/place/?q=place_id:{id}"));
        Listing {
            external_id: self.id,
            name: self.display_name.map(|d| d.text).unwrap_or_default(),
            phone: self.national_phone_number.or(self.international_phone_number),
            website: self.website_uri,
            address: self.formatted_address,
            maps_url,
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Places API client (blocking).
pub struct PlacesClient {
    http: reqwest::blocking::Client,
    api_key: String,
    options: PlacesOptions,
    throttle: Throttle,
}

impl PlacesClient {
    pub fn new(api_key: impl Into<String>, options: PlacesOptions) -> Result<Self, LookupError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LookupError::MissingApiKey);
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("leadbase/{}", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;
        let throttle = Throttle::per_minute(options.rate_limit_per_minute);
        Ok(Self { http, api_key, options, throttle })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/places:searchText", self.options.base_url.trim_end_matches('/'))
    }

    /// One page of results.
    fn search_page(
        &self,
        query: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, LookupError> {
        let mut body = json!({
            "textQuery": query,
            "languageCode": self.options.language,
            "regionCode": self.options.region,
            "pageSize": page_size,
        });
        if let Some(token) = page_token {
            body["pageToken"] = json!(token);
        }

        let mut backoff = self.options.backoff;
        for attempt in 0..=MAX_RETRIES {
            self.throttle.wait();
            let resp = self
                .http
                .post(self.endpoint())
                .header("X-Goog-Api-Key", &self.api_key)
                .header("X-Goog-FieldMask", FIELD_MASK)
                .json(&body)
                .send()
                .map_err(|e| LookupError::Network(e.to_string()))?;

            let status = resp.status().as_u16();

            // Retryable: 429, 5xx
            if status == 429 || status >= 500 {
                if attempt == MAX_RETRIES {
                    let msg = format!("gave up after {} retries (HTTP {})", MAX_RETRIES, status);
                    return Err(if status == 429 {
                        LookupError::RateLimited(msg)
                    } else {
                        LookupError::Http(status, msg)
                    });
                }
                log::warn!("places retry {}/{} in {:?} (HTTP {})", attempt + 1, MAX_RETRIES, backoff, status);
                thread::sleep(backoff);
                backoff *= 2;
                continue;
            }

            if !resp.status().is_success() {
                let text = resp.text().unwrap_or_default();
                return Err(LookupError::Http(status, error_message(&text)));
            }

            return resp
                .json::<SearchResponse>()
                .map_err(|e| LookupError::Parse(e.to_string()));
        }

        Err(LookupError::Network("retry loop exhausted".into()))
    }
}

/// `error.message` from a Google API error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl LookupSource for PlacesClient {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, LookupError> {
        let mut listings = Vec::new();
        let mut token: Option<String> = None;

        while listings.len() < limit {
            let page_size = (limit - listings.len()).min(PAGE_SIZE);
            let page = self.search_page(query, page_size, token.as_deref())?;
            let got = page.places.len();
            listings.extend(page.places.into_iter().map(Place::into_listing));
            log::debug!("places '{}': +{} (total {})", query, got, listings.len());

            match page.next_page_token {
                Some(next) if got > 0 && !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        listings.truncate(limit);
        Ok(listings)
    }
}
