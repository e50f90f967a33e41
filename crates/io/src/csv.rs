// CSV/TSV dataset import/export

use std::io::Read;
use std::path::Path;

use leadbase_recon::Dataset;

pub fn import(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Spanish-locale spreadsheet exports use `;`, so the delimiter is guessed
/// from the header line: the candidate that splits it into the most fields,
/// provided the next data line splits the same way. Falls back to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    // max_by_key keeps the last maximum, so ties resolve toward `,`
    const CANDIDATES: [u8; 4] = [b'|', b'\t', b';', b','];

    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return b',';
    };
    let first_row = lines.next();

    let width = |line: &str, delim: u8| -> usize {
        csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(Result::ok)
            .map_or(1, |r| r.len())
    };

    CANDIDATES
        .iter()
        .map(|&d| (d, width(header, d)))
        .filter(|&(d, w)| w > 1 && first_row.map_or(true, |row| width(row, d) == w))
        .max_by_key(|&(_, w)| w)
        .map_or(b',', |(d, _)| d)
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports from Excel).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// Parse `content` with a header row. Header names are trimmed; blank rows are skipped.
///
/// Short rows are padded. A row with a non-empty value past the last header
/// column is an error: the value has no column to live in.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let columns: Vec<String> = match records.next() {
        Some(header) => header
            .map_err(|e| e.to_string())?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => return Ok(Dataset::default()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if let Some(stray) = record.iter().skip(columns.len()).find(|f| !f.trim().is_empty()) {
            let line = record.position().map_or(0, |p| p.line());
            return Err(format!(
                "line {line} has {} fields but the header has {}: {stray:?} has no column",
                record.len(),
                columns.len()
            ));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Dataset::new(columns, rows))
}

pub fn export(dataset: &Dataset, path: &Path) -> Result<(), String> {
    export_with_delimiter(dataset, path, b',')
}

pub fn export_tsv(dataset: &Dataset, path: &Path) -> Result<(), String> {
    export_with_delimiter(dataset, path, b'\t')
}

fn export_with_delimiter(dataset: &Dataset, path: &Path, delimiter: u8) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    writer.write_record(&dataset.columns).map_err(|e| e.to_string())?;
    for row in &dataset.rows {
        writer.write_record(row).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
