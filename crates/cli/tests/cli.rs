// Integration tests for the `leadbase` binary: exit codes, --json stdout
// contract, and the on-disk effects of check / merge / backup.
//
// Run with: cargo test -p leadbase-cli --test cli -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const HEADER: &str = "Nombre,WhatsApp,Telefono,Correo,Pagina Web,Ciudad\n";

/// Command running in `dir`, isolated from any real settings or API key.
fn leadbase(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_leadbase"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("HOME", dir)
        .env_remove("LEADBASE_CONFIG")
        .env_remove("GOOGLE_API_KEY")
        .env("LEADBASE_LOG", "warn");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    leadbase(dir).args(args).output().expect("spawn leadbase")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json_stdout(out: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!("stdout must be one JSON value: {e}\nstdout:\n{stdout}\nstderr:\n{}", stderr(out))
    })
}

/// `input/master.csv` with Cafe Sol, and `records.csv` with Cafe Sol (new
/// mobile) plus Kiosko Central (landline only, no website).
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("input")).unwrap();
    fs::write(
        dir.path().join("input/master.csv"),
        format!("{HEADER}Cafe Sol,,,hola@cafesol.com,https://cafesol.com,Bogota\n"),
    )
    .unwrap();
    fs::write(
        dir.path().join("records.csv"),
        format!(
            "{HEADER}Cafe Sol,3001234567,N/A,N/A,https://www.cafesol.com,Bogota\n\
             Kiosko Central,N/A,6017654321,N/A,N/A,Bogota\n"
        ),
    )
    .unwrap();
    dir
}

// ===========================================================================
// merge
// ===========================================================================

#[test]
fn merge_missing_master_exits_3() {
    let dir = workspace();

    let out = run(dir.path(), &["merge", "records.csv", "--master", "input/nope.csv"]);

    assert_eq!(out.status.code(), Some(3), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("error: master file not found"));
    assert!(stderr(&out).contains("hint:"));
}

#[test]
fn merge_missing_records_is_usage_error() {
    let dir = workspace();

    let out = run(dir.path(), &["merge", "missing.csv", "--master", "input/master.csv"]);

    assert_eq!(out.status.code(), Some(2), "stderr: {}", stderr(&out));
}

#[test]
fn merge_writes_artifact_and_preserves_original() {
    let dir = workspace();
    let master = dir.path().join("input/master.csv");
    let before = fs::read(&master).unwrap();

    let out = run(
        dir.path(),
        &["merge", "records.csv", "--master", "input/master.csv", "--output-dir", "merged", "--json"],
    );

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val = json_stdout(&out);
    assert_eq!(val["status"], "merged");
    assert_eq!(val["stats"]["master_rows"], 1);
    assert_eq!(val["stats"]["appended"], 1);
    assert_eq!(val["stats"]["updated"], 1);

    // master renamed, bytes unchanged
    assert!(!master.exists());
    let preserved = dir.path().join("input/master - original.csv");
    assert_eq!(fs::read(&preserved).unwrap(), before);

    let merged = fs::read_to_string(dir.path().join("merged/master.csv")).unwrap();
    let mut lines = merged.lines();
    assert_eq!(lines.next(), Some(HEADER.trim_end()));
    assert!(merged.contains("3001234567"));
    assert!(merged.contains("Kiosko Central"));
    assert!(merged.contains("6017654321"));
    assert_eq!(merged.lines().count(), 3);
}

#[test]
fn merge_into_own_directory_is_refused() {
    let dir = workspace();

    let out = run(
        dir.path(),
        &["merge", "records.csv", "--master", "input/master.csv", "--output-dir", "input"],
    );

    assert_eq!(out.status.code(), Some(8), "stderr: {}", stderr(&out));
    assert!(dir.path().join("input/master.csv").exists());
}

#[test]
fn merge_locked_master_exits_4() {
    let dir = workspace();
    // a live pid, so the lock is not treated as stale
    let pid = std::process::id();
    fs::write(dir.path().join("input/master.csv.lock"), format!("{pid}\n")).unwrap();

    let out = run(
        dir.path(),
        &["merge", "records.csv", "--master", "input/master.csv", "--output-dir", "merged"],
    );

    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains(&format!("held by pid {pid}")), "stderr: {}", stderr(&out));
    assert!(dir.path().join("input/master.csv").exists());
    assert!(!dir.path().join("merged/master.csv").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn merge_takes_over_stale_lock() {
    let dir = workspace();
    fs::write(dir.path().join("input/master.csv.lock"), "999999999\n").unwrap();

    let out = run(
        dir.path(),
        &["merge", "records.csv", "--master", "input/master.csv", "--output-dir", "merged"],
    );

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(dir.path().join("merged/master.csv").exists());
    assert!(!dir.path().join("input/master.csv.lock").exists());
}

#[test]
fn merge_empty_batch_touches_nothing() {
    let dir = workspace();
    fs::write(dir.path().join("empty.csv"), HEADER).unwrap();

    let out = run(
        dir.path(),
        &["merge", "empty.csv", "--master", "input/master.csv", "--output-dir", "merged", "--json"],
    );

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(json_stdout(&out)["status"], "nothing_to_merge");
    assert!(dir.path().join("input/master.csv").exists());
    assert!(!dir.path().join("merged").exists());
}

// ===========================================================================
// check
// ===========================================================================

#[test]
fn check_json_reports_duplicates_and_writes_new_file() {
    let dir = workspace();

    let out = run(dir.path(), &["check", "records.csv", "--master", "input/master.csv", "--json"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val = json_stdout(&out);
    assert_eq!(val["new"], 1);
    assert_eq!(val["duplicate"], 1);
    assert!(val["duplicates"].get("Cafe Sol").is_some());
    assert!(dir.path().join("data/output/records_new.xlsx").is_file());
    // check never modifies the master
    assert!(dir.path().join("input/master.csv").exists());
}

// ===========================================================================
// search / settings
// ===========================================================================

#[test]
fn search_without_api_key_exits_10() {
    let dir = workspace();

    let out = run(dir.path(), &["search", "Bogota", "cafe", "--no-emails"]);

    assert_eq!(out.status.code(), Some(10), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("GOOGLE_API_KEY"));
    assert!(out.stdout.is_empty());
}

#[test]
fn invalid_settings_exit_2() {
    let dir = workspace();
    fs::write(dir.path().join("leadbase.toml"), "[merge]\nkey_priority = []\n").unwrap();

    let out = run(dir.path(), &["check", "records.csv", "--master", "input/master.csv"]);

    assert_eq!(out.status.code(), Some(2), "stderr: {}", stderr(&out));
}

#[test]
fn settings_paths_are_honored() {
    let dir = workspace();
    fs::write(
        dir.path().join("custom.toml"),
        "[paths]\ninput_dir = \"input\"\nmaster_name = \"master.csv\"\nbackup_dir = \"snapshots\"\n",
    )
    .unwrap();

    let out = run(dir.path(), &["--config", "custom.toml", "backup", "--json"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let backup = json_stdout(&out)["backup"].as_str().unwrap().to_string();
    assert!(backup.starts_with("snapshots"), "{backup}");
    assert!(backup.contains("master_backup_"));
    assert!(dir.path().join(&backup).is_file());
}

// ===========================================================================
// backup / promote
// ===========================================================================

#[test]
fn backup_missing_master_exits_3() {
    let dir = workspace();

    let out = run(dir.path(), &["backup", "--master", "input/none.xlsx"]);

    assert_eq!(out.status.code(), Some(3), "stderr: {}", stderr(&out));
}

#[test]
fn promote_replaces_master_and_archives_inputs() {
    let dir = workspace();
    fs::create_dir_all(dir.path().join("merged")).unwrap();
    fs::write(dir.path().join("merged/new.csv"), format!("{HEADER}A,,,,,\n")).unwrap();
    fs::write(
        dir.path().join("leadbase.toml"),
        "[paths]\ninput_dir = \"input\"\nbackup_dir = \"backup\"\nmaster_name = \"master.csv\"\n",
    )
    .unwrap();

    let out = run(dir.path(), &["promote", "merged/new.csv", "--json"]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val = json_stdout(&out);
    assert_eq!(val["archived"].as_array().unwrap().len(), 1);
    let promoted = fs::read_to_string(dir.path().join("input/master.csv")).unwrap();
    assert!(promoted.contains("A,"));
    assert!(dir.path().join("merged/new.csv").exists());
}
