// End-to-end collection against a mock lookup API and a mock business site:
// search -> iterative collection -> email enrichment.

use std::time::Duration;

use httpmock::prelude::*;
use leadbase_collect::{
    enrich_all, CollectorConfig, IterativeCollector, PlacesClient, PlacesOptions, SiteEmailScanner,
};
use leadbase_recon::PrefixClassifier;
use serde_json::json;

fn client(server: &MockServer) -> PlacesClient {
    PlacesClient::new(
        "test_key",
        PlacesOptions {
            base_url: server.base_url(),
            backoff: Duration::from_millis(1),
            rate_limit_per_minute: 60_000,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn search_collect_and_enrich() {
    let api = MockServer::start();
    let site = MockServer::start();

    api.mock(|when, then| {
        when.method(POST)
            .path("/v1/places:searchText")
            .body_includes("\"textQuery\":\"cafe in Medellin\"");
        then.status(200).json_body(json!({
            "places": [
                {
                    "id": "sol",
                    "displayName": { "text": "Cafe Sol" },
                    "nationalPhoneNumber": "300 123 4567",
                    "websiteUri": format!("{}/", site.base_url())
                },
                {
                    "id": "kiosko",
                    "displayName": { "text": "Kiosko Central" },
                    "nationalPhoneNumber": "(604) 765 4321"
                },
                {
                    "id": "nophone",
                    "displayName": { "text": "Sin Telefono" },
                    "websiteUri": "https://www.facebook.com/sintelefono"
                }
            ]
        }));
    });
    // later attempts add nothing new
    api.mock(|when, then| {
        when.method(POST).path("/v1/places:searchText");
        then.status(200).json_body(json!({
            "places": [{ "id": "sol", "displayName": { "text": "Cafe Sol" } }]
        }));
    });
    site.mock(|when, then| {
        when.method(GET).path("/contact");
        then.status(200)
            .body(r#"<a href="mailto:hola@cafesol.co">hola@cafesol.co</a>"#);
    });

    let places = client(&api);
    let classifier = PrefixClassifier::default();
    let config = CollectorConfig { max_attempts: 2, ..Default::default() };
    let collector = IterativeCollector::new(&places, &classifier, config);

    let (records, stats) = collector.collect_with_stats("Medellin", "cafe", 10);

    assert_eq!(stats.attempts, 2);
    assert_eq!(stats.with_phone, 2);
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Cafe Sol", "Kiosko Central", "Sin Telefono"]);
    assert_eq!(records[0].mobile.as_deref(), Some("300 123 4567"));
    assert_eq!(records[1].landline.as_deref(), Some("(604) 765 4321"));
    assert_eq!(records[2].website, None);

    let scanner = SiteEmailScanner::new(3, Duration::from_secs(5)).unwrap();
    let outcomes = enrich_all(records, &scanner, 2);

    assert!(outcomes.iter().all(|o| o.error.is_none()));
    assert_eq!(outcomes[0].record.email.as_deref(), Some("hola@cafesol.co"));
    assert_eq!(outcomes[1].record.email, None);
}
