// Dataset file I/O: spreadsheets in, spreadsheets out, nothing overwritten in place

pub mod backup;
pub mod csv;
pub mod housekeeping;
pub mod merge;
pub mod naming;
pub mod records;
pub mod xlsx;

use std::path::Path;

use leadbase_recon::Dataset;

pub use backup::BackupManager;
pub use merge::{MergeEngine, MergeError, MergeOutcome, MergeResult};
pub use records::{read_records, write_records, ExportMode};

/// Spreadsheet formats a dataset can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xlsx,
    /// Read-only workbook formats (xls, xlsb, ods); written back as xlsx.
    OtherWorkbook,
    Csv,
    Tsv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" | "xlsb" | "ods" => Some(Self::OtherWorkbook),
            "csv" | "txt" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            _ => None,
        }
    }

    /// Extension used when writing a dataset that was read in this format.
    pub fn output_extension(self) -> &'static str {
        match self {
            Self::Xlsx | Self::OtherWorkbook => "xlsx",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

/// True for files `read_table` can load.
pub fn is_table_file(path: &Path) -> bool {
    path.is_file() && TableFormat::from_path(path).is_some()
}

/// Read a dataset, picking the reader from the file extension.
pub fn read_table(path: &Path) -> Result<Dataset, String> {
    match TableFormat::from_path(path) {
        Some(TableFormat::Xlsx | TableFormat::OtherWorkbook) => xlsx::import(path),
        Some(TableFormat::Csv) => csv::import(path),
        Some(TableFormat::Tsv) => csv::import_with_delimiter(path, b'\t'),
        None => Err(format!("unsupported file type: {}", path.display())),
    }
}

/// Write a dataset, picking the writer from the file extension.
/// Read-only workbook extensions are rejected; write `.xlsx` instead.
pub fn write_table(dataset: &Dataset, path: &Path) -> Result<(), String> {
    match TableFormat::from_path(path) {
        Some(TableFormat::Xlsx) => xlsx::export(dataset, path, xlsx::DEFAULT_SHEET_NAME),
        Some(TableFormat::Csv) => csv::export(dataset, path),
        Some(TableFormat::Tsv) => csv::export_tsv(dataset, path),
        Some(TableFormat::OtherWorkbook) | None => {
            Err(format!("cannot write this file type: {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a.XLSX")), Some(TableFormat::Xlsx));
        assert_eq!(TableFormat::from_path(Path::new("a.ods")), Some(TableFormat::OtherWorkbook));
        assert_eq!(TableFormat::from_path(Path::new("a.csv")), Some(TableFormat::Csv));
        assert_eq!(TableFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(TableFormat::OtherWorkbook.output_extension(), "xlsx");
    }

    #[test]
    fn tsv_round_trip_through_dispatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        let ds = Dataset::new(vec!["a".into(), "b".into()], vec![vec!["1, 2".into(), "3".into()]]);

        write_table(&ds, &path).unwrap();
        assert_eq!(read_table(&path).unwrap(), ds);
    }

    #[test]
    fn unsupported_extensions() {
        let dir = tempdir().unwrap();
        assert!(read_table(&dir.path().join("x.json")).is_err());
        assert!(write_table(&Dataset::default(), &dir.path().join("x.ods")).is_err());
    }
}
