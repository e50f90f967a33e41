//! Bounded-concurrency email enrichment.
//!
//! Each record with a website and no email gets one scan. Scans run on a
//! dedicated rayon pool of `workers` threads; results come back in input
//! order and a failed scan only marks its own record.

use leadbase_recon::BusinessRecord;
use rayon::prelude::*;

use crate::email::EmailFinder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOutcome {
    pub record: BusinessRecord,
    /// Scan failure for this record, if any. The record is returned unchanged.
    pub error: Option<String>,
}

fn enrich_one(mut record: BusinessRecord, finder: &dyn EmailFinder) -> EnrichOutcome {
    let website = match (&record.email, &record.website) {
        (None, Some(site)) if !site.trim().is_empty() => site.clone(),
        _ => return EnrichOutcome { record, error: None },
    };
    match finder.find_emails(&website) {
        Ok(emails) => {
            if let Some(first) = emails.into_iter().next() {
                log::debug!("{}: {}", record.name, first);
                record.email = Some(first);
            }
            EnrichOutcome { record, error: None }
        }
        Err(e) => {
            log::warn!("{}: email scan failed: {}", record.name, e);
            EnrichOutcome { record, error: Some(e.to_string()) }
        }
    }
}

/// Look up emails for `records` with at most `workers` concurrent scans.
pub fn enrich_all(records: Vec<BusinessRecord>, finder: &dyn EmailFinder, workers: usize) -> Vec<EnrichOutcome> {
    if workers <= 1 || records.len() <= 1 {
        return records.into_iter().map(|r| enrich_one(r, finder)).collect();
    }

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            log::warn!("could not start {} enrichment workers ({}), scanning sequentially", workers, e);
            return records.into_iter().map(|r| enrich_one(r, finder)).collect();
        }
    };

    pool.install(|| records.into_par_iter().map(|r| enrich_one(r, finder)).collect())
}
