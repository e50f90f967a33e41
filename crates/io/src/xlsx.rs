// Excel dataset import (xlsx, xls, xlsb, ods) and xlsx export

use std::path::Path;

use std::collections::BTreeMap;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use leadbase_recon::{CellType, Dataset};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};

/// Default worksheet name for exported datasets.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Import the first worksheet of an Excel file as a dataset.
///
/// The first row is the header (trimmed). Fully blank data rows are skipped.
/// An empty worksheet yields an empty dataset rather than an error. Number,
/// boolean and date cells keep their type in [`Dataset::cell_types`].
pub fn import(path: &Path) -> Result<Dataset, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_to_string(c).trim().to_string()).collect(),
        None => return Ok(Dataset::default()),
    };

    let mut data: Vec<Vec<String>> = Vec::new();
    let mut cell_types = BTreeMap::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let row_idx = data.len();
        for (col, cell) in row.iter().enumerate().take(columns.len()) {
            if let Some(kind) = cell_type(cell) {
                cell_types.insert((row_idx, col), kind);
            }
        }
        data.push(cells);
    }

    let mut dataset = Dataset::new(columns, data);
    dataset.cell_types = cell_types;
    Ok(dataset)
}

fn cell_type(cell: &Data) -> Option<CellType> {
    match cell {
        Data::Float(_) | Data::Int(_) => Some(CellType::Number),
        Data::Bool(_) => Some(CellType::Bool),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            Some(if serial < 1.0 {
                CellType::Time
            } else if serial.fract() == 0.0 {
                CellType::Date
            } else {
                CellType::DateTime
            })
        }
        _ => None,
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // phone numbers stored as numbers must not come back as 3.001234567e9
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Export a dataset to a single-sheet xlsx workbook.
///
/// Cells listed in [`Dataset::cell_types`] are written back with their type
/// (dates get a date number format). Everything else is written as text.
pub fn export(dataset: &Dataset, path: &Path, sheet_name: &str) -> Result<(), String> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();
    let formats = DateFormats::new();

    let worksheet = xlsx_workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    for (col, name) in dataset.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| format!("Failed to write header '{}': {}", name, e))?;
    }

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let xl_row = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            write_cell(worksheet, xl_row, col as u16, value, dataset.cell_type(row_idx, col), &formats)
                .map_err(|e| format!("Failed to write cell ({}, {}): {}", xl_row, col, e))?;
        }
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(())
}

struct DateFormats {
    date: Format,
    datetime: Format,
    time: Format,
}

impl DateFormats {
    fn new() -> Self {
        Self {
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
            time: Format::new().set_num_format("hh:mm:ss"),
        }
    }
}

/// Write one cell. A typed cell whose text no longer parses as its type
/// (a merge overwrote it) falls back to text.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &str,
    kind: Option<CellType>,
    formats: &DateFormats,
) -> Result<(), XlsxError> {
    let number = kind.and_then(|_| value.trim().parse::<f64>().ok()).filter(|n| n.is_finite());
    match (kind, number) {
        (Some(CellType::Number), Some(n)) => {
            worksheet.write_number(row, col, n)?;
        }
        (Some(CellType::Date), Some(n)) => {
            worksheet.write_number_with_format(row, col, n, &formats.date)?;
        }
        (Some(CellType::DateTime), Some(n)) => {
            worksheet.write_number_with_format(row, col, n, &formats.datetime)?;
        }
        (Some(CellType::Time), Some(n)) => {
            worksheet.write_number_with_format(row, col, n, &formats.time)?;
        }
        (Some(CellType::Bool), _) if value == "TRUE" || value == "FALSE" => {
            worksheet.write_boolean(row, col, value == "TRUE")?;
        }
        _ => {
            worksheet.write_string(row, col, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["Nombre".into(), "WhatsApp".into(), "Ciudad".into()],
            vec![
                vec!["Cafe Sol".into(), "3001234567".into(), "Bogota".into()],
                vec!["Luna".into(), "".into(), "Cali".into()],
            ],
        )
    }

    #[test]
    fn export_then_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.xlsx");

        export(&sample(), &path, DEFAULT_SHEET_NAME).unwrap();
        let back = import(&path).unwrap();

        assert_eq!(back, sample());
    }

    #[test]
    fn numeric_phones_read_without_decimals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("numbers.xlsx");

        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, " Telefono ").unwrap();
        ws.write_number(1, 0, 6011234567.0).unwrap();
        wb.save(&path).unwrap();

        let ds = import(&path).unwrap();
        assert_eq!(ds.columns, vec!["Telefono"]);
        assert_eq!(ds.rows[0][0], "6011234567");
        assert_eq!(ds.cell_type(0, 0), Some(CellType::Number));
    }

    fn typed_workbook(path: &Path) {
        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet();
        for (col, name) in ["Nombre", "Fecha contacto", "Visitas", "Activo"].iter().enumerate() {
            ws.write_string(0, col as u16, *name).unwrap();
        }
        ws.write_string(1, 0, "Cafe Sol").unwrap();
        // 2024-03-15
        ws.write_number_with_format(1, 1, 45366.0, &Format::new().set_num_format("yyyy-mm-dd"))
            .unwrap();
        ws.write_number(1, 2, 12.5).unwrap();
        ws.write_boolean(1, 3, true).unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn typed_cells_survive_import_export() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("typed.xlsx");
        let copy = dir.path().join("copy.xlsx");
        typed_workbook(&source);

        let ds = import(&source).unwrap();
        assert_eq!(ds.rows[0], vec!["Cafe Sol", "45366", "12.5", "TRUE"]);
        assert_eq!(ds.cell_type(0, 1), Some(CellType::Date));
        assert_eq!(ds.cell_type(0, 0), None);

        export(&ds, &copy, DEFAULT_SHEET_NAME).unwrap();

        let mut wb: Sheets<_> = open_workbook_auto(&copy).unwrap();
        let range = wb.worksheet_range(DEFAULT_SHEET_NAME).unwrap();
        match range.get_value((1, 1)) {
            Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 45366.0),
            other => panic!("expected a date cell, got {other:?}"),
        }
        assert_eq!(range.get_value((1, 2)), Some(&Data::Float(12.5)));
        assert_eq!(range.get_value((1, 3)), Some(&Data::Bool(true)));
        assert_eq!(import(&copy).unwrap(), ds);
    }

    #[test]
    fn overwritten_typed_cell_is_written_as_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("text.xlsx");
        let mut ds = Dataset::new(vec!["Visitas".into()], vec![vec!["12".into()]]);
        ds.cell_types.insert((0, 0), CellType::Number);
        ds.rows[0][0] = "doce".into();

        export(&ds, &path, DEFAULT_SHEET_NAME).unwrap();

        let back = import(&path).unwrap();
        assert_eq!(back.rows[0][0], "doce");
        assert_eq!(back.cell_type(0, 0), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(import(&dir.path().join("nope.xlsx")).is_err());
    }
}
