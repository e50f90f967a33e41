use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A known business-record field. Column names in workbooks map onto these
/// through the alias lists in [`crate::config::ColumnMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Mobile,
    Landline,
    Email,
    Website,
    City,
    Address,
    MapsUrl,
    ExternalId,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::Mobile,
        Field::Landline,
        Field::Email,
        Field::Website,
        Field::City,
        Field::Address,
        Field::MapsUrl,
        Field::ExternalId,
    ];

    /// Columns written in template mode, in order.
    pub const TEMPLATE: [Field; 6] = [
        Field::Name,
        Field::Mobile,
        Field::Landline,
        Field::Email,
        Field::Website,
        Field::City,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Mobile => "mobile",
            Field::Landline => "landline",
            Field::Email => "email",
            Field::Website => "website",
            Field::City => "city",
            Field::Address => "address",
            Field::MapsUrl => "maps_url",
            Field::ExternalId => "external_id",
        }
    }

    pub fn is_phone(self) -> bool {
        matches!(self, Field::Mobile | Field::Landline)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One business listing. Absent values are `None`, never a sentinel string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub city: String,
    pub address: Option<String>,
    pub maps_url: Option<String>,
    /// Source-assigned id, used to dedup across collection attempts only.
    pub external_id: Option<String>,
    /// Input columns that matched no known field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl BusinessRecord {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        Self { name: name.into(), city: city.into(), ..Default::default() }
    }

    /// Value of `field`, with empty strings treated as absent.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Name => Some(self.name.as_str()),
            Field::City => Some(self.city.as_str()),
            Field::Mobile => self.mobile.as_deref(),
            Field::Landline => self.landline.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Website => self.website.as_deref(),
            Field::Address => self.address.as_deref(),
            Field::MapsUrl => self.maps_url.as_deref(),
            Field::ExternalId => self.external_id.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set `field`; blank values clear optional fields.
    pub fn set(&mut self, field: Field, value: &str) {
        let trimmed = value.trim();
        let opt = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        match field {
            Field::Name => self.name = trimmed.to_string(),
            Field::City => self.city = trimmed.to_string(),
            Field::Mobile => self.mobile = opt,
            Field::Landline => self.landline = opt,
            Field::Email => self.email = opt,
            Field::Website => self.website = opt,
            Field::Address => self.address = opt,
            Field::MapsUrl => self.maps_url = opt,
            Field::ExternalId => self.external_id = opt,
        }
    }

    pub fn has_phone(&self) -> bool {
        self.get(Field::Mobile).is_some() || self.get(Field::Landline).is_some()
    }

    /// Any phone, mobile first.
    pub fn best_phone(&self) -> Option<&str> {
        self.get(Field::Mobile).or_else(|| self.get(Field::Landline))
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Spreadsheet type of a cell that was not plain text in the source file.
///
/// The cell text holds the value as read (serial number for dates and times)
/// so writers can restore the original type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Number,
    Bool,
    Date,
    DateTime,
    Time,
}

/// A tabular dataset: ordered header plus rows of string cells.
///
/// Rows are padded or truncated to the header width on construction so cell
/// access by column index is always in bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Typed cells keyed by `(row, column)`. Cells not listed are text.
    pub cell_types: BTreeMap<(usize, usize), CellType>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                let dropped = row.iter().skip(width).filter(|c| !c.trim().is_empty()).count();
                if dropped > 0 {
                    log::warn!(
                        "row {}: dropping {dropped} non-empty cells past the last header column",
                        idx + 1
                    );
                }
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows, cell_types: BTreeMap::new() }
    }

    pub fn cell_type(&self, row: usize, col: usize) -> Option<CellType> {
        self.cell_types.get(&(row, col)).copied()
    }

    /// Overwrite a cell. The new value is text; any original type is dropped.
    pub fn set_cell(&mut self, row: usize, col: usize, value: String) {
        self.rows[row][col] = value;
        self.cell_types.remove(&(row, col));
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Duplicate report
// ---------------------------------------------------------------------------

/// Which identity signal matched the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    Name,
    Website,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateInfo {
    pub reason: Vec<MatchSignal>,
    /// The normalized key that matched, per signal, in `reason` order.
    pub matched_keys: Vec<String>,
    pub website: Option<String>,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    /// Zero-based index of the first matching master row.
    pub master_row: usize,
}

impl DuplicateInfo {
    /// Human summary, e.g. `name: cafesol | website: cafesolcom`.
    pub fn describe(&self) -> String {
        self.reason
            .iter()
            .zip(&self.matched_keys)
            .map(|(signal, key)| match signal {
                MatchSignal::Name => format!("name: {key}"),
                MatchSignal::Website => format!("website: {key}"),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Duplicates keyed by display name. Later candidates with the same display
/// name overwrite earlier entries.
pub type DuplicateReport = BTreeMap<String, DuplicateInfo>;

/// Result of partitioning candidates against a master.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub new_records: Vec<BusinessRecord>,
    pub duplicates: Vec<BusinessRecord>,
    pub report: DuplicateReport,
}

// ---------------------------------------------------------------------------
// Merge stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub master_rows: usize,
    pub incoming: usize,
    pub appended: usize,
    pub updated: usize,
    /// Records with no usable identity key.
    pub skipped: usize,
    pub key_column: String,
}

impl MergeStats {
    pub fn total_rows(&self) -> usize {
        self.master_rows + self.appended
    }
}
