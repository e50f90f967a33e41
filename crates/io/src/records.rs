//! Business records to and from spreadsheet files.
//!
//! Headers map onto record fields through the configured column aliases. The
//! missing-value marker is read as absent and written for absent values, so
//! it never reaches [`BusinessRecord`].

use std::path::Path;

use leadbase_recon::model::Field;
use leadbase_recon::{BusinessRecord, Dataset, MergeConfig};

/// Which columns an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Exactly name, mobile, landline, email, website, city.
    #[default]
    Template,
    /// Every known field, including address, maps link and external id.
    Full,
}

impl ExportMode {
    pub fn fields(self) -> &'static [Field] {
        match self {
            ExportMode::Template => &Field::TEMPLATE,
            ExportMode::Full => &Field::ALL,
        }
    }
}

/// Convert dataset rows to records.
///
/// A header claimed by an earlier column for the same field, or matching no
/// field, is kept in `extra`. Rows with no name and no website are dropped.
pub fn records_from_dataset(dataset: &Dataset, config: &MergeConfig) -> Vec<BusinessRecord> {
    let mut mapping: Vec<Option<Field>> = Vec::with_capacity(dataset.columns.len());
    for header in &dataset.columns {
        let field = config
            .columns
            .field_for(header)
            .filter(|f| !mapping.contains(&Some(*f)));
        mapping.push(field);
    }

    let mut records = Vec::new();
    for row in &dataset.rows {
        let mut record = BusinessRecord::default();
        for ((header, field), cell) in dataset.columns.iter().zip(&mapping).zip(row) {
            let Some(value) = config.present(cell) else {
                continue;
            };
            match field {
                Some(field) => record.set(*field, value),
                None => {
                    record.extra.insert(header.clone(), value.to_string());
                }
            }
        }
        if record.get(Field::Name).is_none() && record.get(Field::Website).is_none() {
            continue;
        }
        records.push(record);
    }
    records
}

/// Convert records to a dataset with the columns `mode` selects, named by
/// each field's primary alias.
pub fn records_to_dataset(
    records: &[BusinessRecord],
    config: &MergeConfig,
    mode: ExportMode,
) -> Dataset {
    let fields = mode.fields();
    let columns = fields
        .iter()
        .map(|f| config.columns.primary(*f).to_string())
        .collect();
    let rows = records
        .iter()
        .map(|r| {
            fields
                .iter()
                .map(|f| r.get(*f).unwrap_or(config.missing_value.as_str()).to_string())
                .collect()
        })
        .collect();
    Dataset::new(columns, rows)
}

pub fn read_records(path: &Path, config: &MergeConfig) -> Result<Vec<BusinessRecord>, String> {
    let dataset = crate::read_table(path)?;
    Ok(records_from_dataset(&dataset, config))
}

pub fn write_records(
    records: &[BusinessRecord],
    path: &Path,
    config: &MergeConfig,
    mode: ExportMode,
) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    crate::write_table(&records_to_dataset(records, config, mode), path)
}
