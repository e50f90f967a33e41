//! File naming for backups, preserved originals and promoted masters.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Timestamp format used in every generated file name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Current local time as `YYYYMMDD_HHMMSS`.
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// `(stem, ".ext")` of a path; the extension part is empty when there is none.
pub fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// `<stem>_backup_<stamp>.<ext>`
pub fn backup_file_name(source: &Path, stamp: &str) -> String {
    let (stem, ext) = split_name(source);
    format!("{stem}_backup_{stamp}{ext}")
}

/// `<stem> - original.<ext>`
pub fn original_file_name(source: &Path) -> String {
    let (stem, ext) = split_name(source);
    format!("{stem} - original{ext}")
}

/// First path from `dir/name` that does not exist, trying `<stem>_2.<ext>`,
/// `<stem>_3.<ext>`, ... on collision.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let (stem, ext) = split_name(Path::new(name));
    let mut n = 2u32;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Slot for the preserved original of `master`: `<stem> - original.<ext>`,
/// or `<stem> - original_<stamp>.<ext>` when that is taken.
pub fn preserved_original_path(master: &Path, stamp: &str) -> PathBuf {
    let dir = master.parent().unwrap_or_else(|| Path::new("."));
    let plain = dir.join(original_file_name(master));
    if !plain.exists() {
        return plain;
    }
    let (stem, ext) = split_name(master);
    unique_path(dir, &format!("{stem} - original_{stamp}{ext}"))
}
