//! In-memory reconciliation of a record batch into a master dataset.
//!
//! The master's column schema is fixed: matched rows are updated in place and
//! unmatched records are appended, but only columns the master already has are
//! ever written. Fields with no master column are dropped, and so are phone
//! numbers whose channel has no column: a mobile number never lands in a
//! landline column or the reverse.

use std::collections::BTreeMap;

use crate::channel::{ChannelClassifier, ChannelKind};
use crate::config::MergeConfig;
use crate::model::{BusinessRecord, Dataset, Field, MergeStats};
use crate::normalize::Key;

/// A column used for identity matching, and the record field that feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeySlot {
    field: Field,
    column: usize,
}

/// Identity columns in lookup order.
///
/// The first slot is the designated key column: the first `key_priority`
/// field the master has, else the name column, else the first column. The
/// remaining priority fields and name follow as fallbacks so rows whose key
/// cell is blank (an appended record without a website, say) still match on
/// the next merge.
fn key_slots(master: &Dataset, config: &MergeConfig) -> Vec<KeySlot> {
    let mut slots: Vec<KeySlot> = Vec::new();
    let order = config.key_priority.iter().copied().chain(std::iter::once(Field::Name));
    for field in order {
        if let Some(column) = config.columns.resolve(field, &master.columns) {
            if !slots.iter().any(|s| s.column == column) {
                slots.push(KeySlot { field, column });
            }
        }
    }
    if slots.is_empty() && !master.columns.is_empty() {
        slots.push(KeySlot { field: Field::Name, column: 0 });
    }
    slots
}

/// Master columns designated for each known field.
#[derive(Debug, Default)]
struct Layout {
    columns: BTreeMap<Field, usize>,
}

impl Layout {
    fn new(master: &Dataset, config: &MergeConfig) -> Self {
        let mut columns = BTreeMap::new();
        for field in Field::ALL {
            if let Some(idx) = config.columns.resolve(field, &master.columns) {
                // two fields aliasing the same header: first field wins
                if !columns.values().any(|&c| c == idx) {
                    columns.insert(field, idx);
                }
            }
        }
        Layout { columns }
    }

    fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }
}

/// `(column, value)` writes for a record's phone numbers.
///
/// Each number is classified and sent to the column for its kind. A number
/// whose kind has no column in the master is dropped. A column takes the
/// first number routed to it.
fn route_phones(
    record: &BusinessRecord,
    layout: &Layout,
    classifier: &dyn ChannelClassifier,
) -> Vec<(usize, String)> {
    let mobile_col = layout.column(Field::Mobile);
    let landline_col = layout.column(Field::Landline);
    let mut writes: Vec<(usize, String)> = Vec::new();

    let numbers = [record.get(Field::Mobile), record.get(Field::Landline)];
    for raw in numbers.into_iter().flatten() {
        let kind = classifier.classify(raw);
        let target = match kind {
            ChannelKind::Mobile => mobile_col,
            ChannelKind::Landline => landline_col,
        };
        match target {
            Some(col) if !writes.iter().any(|(c, _)| *c == col) => {
                writes.push((col, raw.to_string()));
            }
            Some(_) => {}
            None => log::debug!("no {kind:?} column for {:?}; number dropped", record.name),
        }
    }
    writes
}

/// All cell writes for `record`, phones routed by classification.
fn record_writes(
    record: &BusinessRecord,
    layout: &Layout,
    config: &MergeConfig,
    classifier: &dyn ChannelClassifier,
) -> Vec<(usize, String)> {
    let mut writes = Vec::new();
    for (&field, &col) in &layout.columns {
        if field.is_phone() {
            continue;
        }
        if let Some(value) = record.get(field).and_then(|v| config.present(v)) {
            writes.push((col, value.to_string()));
        }
    }
    writes.extend(route_phones(record, layout, classifier));
    writes
}

fn row_keys(row: &[String], slots: &[KeySlot], config: &MergeConfig) -> Vec<(usize, Key)> {
    slots
        .iter()
        .filter_map(|slot| {
            config
                .present(&row[slot.column])
                .and_then(Key::new)
                .map(|key| (slot.column, key))
        })
        .collect()
}

fn record_keys(record: &BusinessRecord, slots: &[KeySlot], config: &MergeConfig) -> Vec<(usize, Key)> {
    slots
        .iter()
        .filter_map(|slot| {
            record
                .get(slot.field)
                .and_then(|v| config.present(v))
                .and_then(Key::new)
                .map(|key| (slot.column, key))
        })
        .collect()
}

/// Reconcile `records` into `master`, in input order.
///
/// A record matches the first row that shares a normalized key in the same
/// identity column, trying columns in [`key_slots`] order. Matched rows get
/// every non-empty incoming value for columns they have; unmatched records
/// become new rows with the missing-value marker for absent cells. Appended
/// rows are matchable by later records in the same batch, so repeated keys
/// update rather than duplicate (last value wins). Records with no usable
/// key are skipped.
pub fn reconcile(
    master: &mut Dataset,
    records: &[BusinessRecord],
    config: &MergeConfig,
    classifier: &dyn ChannelClassifier,
) -> MergeStats {
    let slots = key_slots(master, config);
    let layout = Layout::new(master, config);
    let mut stats = MergeStats {
        master_rows: master.rows.len(),
        incoming: records.len(),
        key_column: slots
            .first()
            .map(|s| master.columns[s.column].clone())
            .unwrap_or_default(),
        ..Default::default()
    };

    let mut index: BTreeMap<(usize, Key), usize> = BTreeMap::new();
    for (row_idx, row) in master.rows.iter().enumerate() {
        for key in row_keys(row, &slots, config) {
            index.entry(key).or_insert(row_idx);
        }
    }
    log::debug!("merge key column '{}', {} indexed keys", stats.key_column, index.len());

    for record in records {
        let keys = record_keys(record, &slots, config);
        if keys.is_empty() {
            log::warn!("skipping record with no identity key: {:?}", record.name);
            stats.skipped += 1;
            continue;
        }

        let writes = record_writes(record, &layout, config, classifier);
        let hit = keys.iter().find_map(|k| index.get(k).copied());

        match hit {
            Some(row_idx) => {
                for (col, value) in writes {
                    master.set_cell(row_idx, col, value);
                }
                for key in row_keys(&master.rows[row_idx], &slots, config) {
                    index.entry(key).or_insert(row_idx);
                }
                stats.updated += 1;
            }
            None => {
                let mut row = vec![config.missing_value.clone(); master.columns.len()];
                for (col, value) in writes {
                    row[col] = value;
                }
                let row_idx = master.rows.len();
                for key in row_keys(&row, &slots, config) {
                    index.entry(key).or_insert(row_idx);
                }
                master.rows.push(row);
                stats.appended += 1;
            }
        }
    }

    log::info!(
        "merged {} records: {} appended, {} updated, {} skipped",
        stats.incoming,
        stats.appended,
        stats.updated,
        stats.skipped
    );
    stats
}
