//! Duplicate classification: split candidates into new records and records
//! the master already knows, by normalized name OR normalized website.

use std::collections::BTreeMap;

use crate::config::MergeConfig;
use crate::model::{BusinessRecord, Classification, Dataset, DuplicateInfo, Field, MatchSignal};
use crate::normalize::Key;

/// Normalized identity indexes over a master dataset.
#[derive(Debug, Default)]
pub struct MasterIndex {
    names: BTreeMap<Key, usize>,
    websites: BTreeMap<Key, usize>,
}

impl MasterIndex {
    /// Index the master's name and website columns. Missing cells and cells
    /// that normalize to nothing are not indexed. First occurrence wins.
    pub fn build(master: &Dataset, config: &MergeConfig) -> Self {
        let mut index = MasterIndex::default();
        let name_col = config.columns.resolve(Field::Name, &master.columns);
        let web_col = config.columns.resolve(Field::Website, &master.columns);

        for (row_idx, row) in master.rows.iter().enumerate() {
            if let Some(key) = name_col.and_then(|c| cell_key(config, &row[c])) {
                index.names.entry(key).or_insert(row_idx);
            }
            if let Some(key) = web_col.and_then(|c| cell_key(config, &row[c])) {
                index.websites.entry(key).or_insert(row_idx);
            }
        }
        index
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn website_count(&self) -> usize {
        self.websites.len()
    }

    /// Match a candidate. Returns `None` if neither signal hits.
    pub fn lookup(&self, record: &BusinessRecord) -> Option<DuplicateInfo> {
        let mut reason = Vec::new();
        let mut matched_keys = Vec::new();
        let mut master_row = None;

        if let Some(key) = record.get(Field::Name).and_then(Key::new) {
            if let Some(&row) = self.names.get(&key) {
                reason.push(MatchSignal::Name);
                matched_keys.push(key.to_string());
                master_row.get_or_insert(row);
            }
        }
        if let Some(key) = record.get(Field::Website).and_then(Key::new) {
            if let Some(&row) = self.websites.get(&key) {
                reason.push(MatchSignal::Website);
                matched_keys.push(key.to_string());
                master_row.get_or_insert(row);
            }
        }

        let master_row = master_row?;
        Some(DuplicateInfo {
            reason,
            matched_keys,
            website: record.get(Field::Website).map(str::to_string),
            mobile: record.get(Field::Mobile).map(str::to_string),
            landline: record.get(Field::Landline).map(str::to_string),
            master_row,
        })
    }
}

fn cell_key(config: &MergeConfig, cell: &str) -> Option<Key> {
    config.present(cell).and_then(Key::new)
}

/// Partition `candidates` against `master`.
///
/// Every candidate lands in exactly one of `new_records` / `duplicates`, and
/// input order is preserved within each. A candidate with no usable name and
/// no usable website is new: empty keys never match.
pub fn classify(
    candidates: Vec<BusinessRecord>,
    master: &Dataset,
    config: &MergeConfig,
) -> Classification {
    let index = MasterIndex::build(master, config);
    log::debug!(
        "master index: {} names, {} websites",
        index.name_count(),
        index.website_count()
    );

    let mut out = Classification::default();
    for record in candidates {
        match index.lookup(&record) {
            Some(info) => {
                out.report.insert(record.name.clone(), info);
                out.duplicates.push(record);
            }
            None => out.new_records.push(record),
        }
    }
    log::info!(
        "classified {} new, {} duplicate",
        out.new_records.len(),
        out.duplicates.len()
    );
    out
}
