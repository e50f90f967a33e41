//! Iterative collection: repeat the search with varied terms until enough
//! contactable businesses are found or the attempt budget runs out.

use std::collections::HashSet;

use leadbase_recon::{BusinessRecord, ChannelClassifier};

use crate::source::{Listing, LookupSource};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub max_attempts: usize,
    /// Sub-area terms appended to the category on attempts after the first.
    pub qualifiers: Vec<String>,
    /// Floor for the per-attempt search limit.
    pub min_results_per_attempt: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            qualifiers: ["zona", "area", "sector", "barrio", "centro"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_results_per_attempt: 60,
        }
    }
}

/// Per-run counters, for the CLI summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub attempts: usize,
    pub failed_attempts: usize,
    pub with_phone: usize,
    pub without_phone: usize,
    pub returned: usize,
}

pub struct IterativeCollector<'a, S: LookupSource> {
    source: &'a S,
    classifier: &'a dyn ChannelClassifier,
    config: CollectorConfig,
}

impl<'a, S: LookupSource> IterativeCollector<'a, S> {
    pub fn new(source: &'a S, classifier: &'a dyn ChannelClassifier, config: CollectorConfig) -> Self {
        Self { source, classifier, config }
    }

    /// Query text for attempt `n` (zero-based).
    pub fn query_for(&self, attempt: usize, location: &str, category: &str) -> String {
        let qualifier = attempt
            .checked_sub(1)
            .and_then(|i| self.config.qualifiers.get(i % self.config.qualifiers.len().max(1)));
        match qualifier {
            Some(q) => format!("{category} {q} in {location}"),
            None => format!("{category} in {location}"),
        }
    }

    /// Collect up to `target` records for `category` in `location`.
    ///
    /// Never fails: source errors end that attempt and the next one runs.
    /// Listings without an external id cannot be deduplicated and are ignored.
    /// Records with a phone come first; the rest of the slots are filled with
    /// phone-less records.
    pub fn collect(&self, location: &str, category: &str, target: usize) -> Vec<BusinessRecord> {
        self.collect_with_stats(location, category, target).0
    }

    pub fn collect_with_stats(
        &self,
        location: &str,
        category: &str,
        target: usize,
    ) -> (Vec<BusinessRecord>, CollectStats) {
        let mut stats = CollectStats::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut with_phone: Vec<Listing> = Vec::new();
        let mut without_phone: Vec<Listing> = Vec::new();

        if target == 0 {
            return (Vec::new(), stats);
        }

        for attempt in 0..self.config.max_attempts {
            if with_phone.len() >= target {
                break;
            }
            stats.attempts += 1;

            let query = self.query_for(attempt, location, category);
            let remaining = target - with_phone.len();
            let limit = (remaining * 3).max(self.config.min_results_per_attempt);

            let listings = match self.source.search(&query, limit) {
                Ok(listings) => listings,
                Err(e) => {
                    log::warn!("attempt {} ('{}') failed: {}", attempt + 1, query, e);
                    stats.failed_attempts += 1;
                    continue;
                }
            };

            let mut fresh = 0usize;
            for listing in listings {
                let Some(id) = listing.external_id.clone().filter(|id| !id.is_empty()) else {
                    continue;
                };
                if !seen.insert(id) {
                    continue;
                }
                if listing.has_phone() {
                    fresh += 1;
                    with_phone.push(listing);
                } else {
                    without_phone.push(listing);
                }
            }
            log::info!(
                "attempt {}: {} new with phone, total {}/{}",
                attempt + 1,
                fresh,
                with_phone.len(),
                target
            );
        }

        stats.with_phone = with_phone.len();
        stats.without_phone = without_phone.len();

        let records: Vec<BusinessRecord> = with_phone
            .into_iter()
            .chain(without_phone)
            .take(target)
            .map(|l| l.into_record(location, self.classifier))
            .collect();
        stats.returned = records.len();
        (records, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::error::LookupError;
    use leadbase_recon::PrefixClassifier;

    /// Returns scripted pages in order and records the queries it saw.
    struct Scripted {
        pages: RefCell<Vec<Result<Vec<Listing>, LookupError>>>,
        queries: RefCell<Vec<(String, usize)>>,
    }

    impl Scripted {
        fn new(pages: Vec<Result<Vec<Listing>, LookupError>>) -> Self {
            Self { pages: RefCell::new(pages), queries: RefCell::new(Vec::new()) }
        }
    }

    impl LookupSource for Scripted {
        fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, LookupError> {
            self.queries.borrow_mut().push((query.to_string(), limit));
            let mut pages = self.pages.borrow_mut();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                pages.remove(0)
            }
        }
    }

    fn listing(id: &str, phone: bool) -> Listing {
        Listing {
            external_id: Some(id.to_string()),
            name: format!("Biz {id}"),
            phone: phone.then(|| "3001234567".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn shared_ids_across_attempts_are_dropped() {
        // attempt 1: a1..a5; attempt 2: 10 listings, 3 of which repeat attempt-1 ids
        let first: Vec<_> = (1..=5).map(|i| listing(&format!("a{i}"), true)).collect();
        let mut second: Vec<_> = (1..=7).map(|i| listing(&format!("b{i}"), true)).collect();
        second.insert(2, listing("a1", true));
        second.insert(5, listing("a3", true));
        second.push(listing("a5", true));
        assert_eq!(second.len(), 10);

        let source = Scripted::new(vec![Ok(first), Ok(second)]);
        let classifier = PrefixClassifier::default();
        let collector = IterativeCollector::new(&source, &classifier, CollectorConfig::default());

        let (records, stats) = collector.collect_with_stats("Bogota", "cafe", 50);

        assert_eq!(records.len(), 12);
        let mut ids: Vec<_> = records.iter().filter_map(|r| r.external_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 12);
        assert_eq!(stats.attempts, 5);
    }

    #[test]
    fn shared_id_dedup_does_not_depend_on_order() {
        let first: Vec<_> = (1..=5).map(|i| listing(&format!("a{i}"), true)).collect();
        let mut second: Vec<_> = (1..=7).map(|i| listing(&format!("b{i}"), true)).collect();
        second.extend(["a1", "a3", "a5"].iter().map(|id| listing(id, true)));

        let mut expected: Vec<String> = (1..=5).map(|i| format!("a{i}")).collect();
        expected.extend((1..=7).map(|i| format!("b{i}")));
        expected.sort();

        let mut orders = Vec::new();
        for rotation in 0..second.len() {
            let mut rotated = second.clone();
            rotated.rotate_left(rotation);
            orders.push(vec![first.clone(), rotated.clone()]);
            orders.push(vec![rotated, first.clone()]);
        }
        let mut reversed = first.clone();
        reversed.reverse();
        orders.push(vec![reversed, second.iter().rev().cloned().collect()]);

        let classifier = PrefixClassifier::default();
        for pages in orders {
            let source = Scripted::new(pages.into_iter().map(Ok).collect());
            let collector = IterativeCollector::new(&source, &classifier, CollectorConfig::default());

            let records = collector.collect("Bogota", "cafe", 50);

            let mut ids: Vec<String> = records.iter().filter_map(|r| r.external_id.clone()).collect();
            ids.sort();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn stops_once_target_reached() {
        let page: Vec<_> = (0..8).map(|i| listing(&format!("p{i}"), true)).collect();
        let source = Scripted::new(vec![Ok(page)]);
        let classifier = PrefixClassifier::default();
        let collector = IterativeCollector::new(&source, &classifier, CollectorConfig::default());

        let (records, stats) = collector.collect_with_stats("Cali", "panaderia", 5);

        assert_eq!(records.len(), 5);
        assert_eq!(stats.attempts, 1);
        assert_eq!(source.queries.borrow()[0], ("panaderia in Cali".to_string(), 60));
    }

    #[test]
    fn phone_records_first_then_fill() {
        let page = vec![listing("n1", false), listing("p1", true), listing("n2", false)];
        let source = Scripted::new(vec![Ok(page)]);
        let classifier = PrefixClassifier::default();
        let config = CollectorConfig { max_attempts: 1, ..Default::default() };
        let collector = IterativeCollector::new(&source, &classifier, config);

        let records = collector.collect("Cali", "bar", 2);

        let ids: Vec<_> = records.iter().filter_map(|r| r.external_id.as_deref()).collect();
        assert_eq!(ids, vec!["p1", "n1"]);
        assert_eq!(records[0].mobile.as_deref(), Some("3001234567"));
        assert_eq!(records[0].city, "Cali");
    }

    #[test]
    fn failures_do_not_abort() {
        let source = Scripted::new(vec![
            Err(LookupError::Network("timeout".into())),
            Ok(vec![listing("x1", true)]),
        ]);
        let classifier = PrefixClassifier::default();
        let config = CollectorConfig { max_attempts: 3, ..Default::default() };
        let collector = IterativeCollector::new(&source, &classifier, config);

        let (records, stats) = collector.collect_with_stats("Cali", "bar", 10);

        assert_eq!(records.len(), 1);
        assert_eq!(stats.failed_attempts, 1);
        assert_eq!(stats.attempts, 3);
    }

    #[test]
    fn queries_vary_per_attempt() {
        let source = Scripted::new(vec![]);
        let classifier = PrefixClassifier::default();
        let collector = IterativeCollector::new(&source, &classifier, CollectorConfig::default());

        collector.collect("Medellin", "cafe", 30);

        let queries: Vec<_> = source.queries.borrow().iter().map(|(q, _)| q.clone()).collect();
        assert_eq!(
            queries,
            vec![
                "cafe in Medellin",
                "cafe zona in Medellin",
                "cafe area in Medellin",
                "cafe sector in Medellin",
                "cafe barrio in Medellin",
            ]
        );
        assert_eq!(source.queries.borrow()[0].1, 90);
    }

    #[test]
    fn listings_without_id_are_ignored() {
        let mut anon = listing("x", true);
        anon.external_id = None;
        let source = Scripted::new(vec![Ok(vec![anon])]);
        let classifier = PrefixClassifier::default();
        let config = CollectorConfig { max_attempts: 1, ..Default::default() };
        let collector = IterativeCollector::new(&source, &classifier, config);

        assert!(collector.collect("Cali", "bar", 3).is_empty());
    }
}
