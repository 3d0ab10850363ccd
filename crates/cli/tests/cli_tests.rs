// End-to-end tests for the `sgrid` binary.
// Run with: cargo test -p statgrid-cli --test cli_tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SURVEY: &str = "group,sex,age\n1,m,20\n2,f,31\n2,f,45\n1,m,38\n,f,27\n";

fn sgrid(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sgrid"));
    cmd.current_dir(dir);
    // Never touch the user's own settings
    cmd.arg("--config").arg(dir.join("settings.json"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Imports the survey CSV and returns the workspace and the .sgrid path.
fn imported() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("survey.csv");
    fs::write(&csv, SURVEY).unwrap();
    let sgrid_file = dir.path().join("survey.sgrid");

    let out = sgrid(dir.path()).arg("import").arg(&csv).arg("-o").arg(&sgrid_file).output().unwrap();
    assert!(out.status.success(), "import failed: {}", stderr(&out));
    assert!(stderr(&out).contains("5 case(s), 3 variable(s)"));
    (dir, sgrid_file)
}

#[test]
fn import_then_list_variables() {
    let (dir, file) = imported();

    let out = sgrid(dir.path()).arg("variables").arg(&file).arg("--json").output().unwrap();
    assert!(out.status.success());
    let vars: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let names: Vec<&str> = vars.as_array().unwrap().iter().map(|v| v["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["group", "sex", "age"]);
}

#[test]
fn frequencies_prints_tables_and_records_audit() {
    let (dir, file) = imported();

    let out = sgrid(dir.path()).arg("frequencies").arg(&file).arg("group").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("Frequencies"));
    assert!(text.contains("Statistics"));
    assert!(text.contains("Valid Percent"));

    let out = sgrid(dir.path()).arg("audit").arg(&file).arg("--json").output().unwrap();
    assert!(out.status.success());
    let logs: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["text"], "FREQUENCIES VARIABLES=group.");
    let stats = logs[0]["analytics"][0]["statistics"].as_array().unwrap();
    assert_eq!(stats.len(), 2);

    // The dataset survived the audit write
    let out = sgrid(dir.path()).arg("variables").arg(&file).output().unwrap();
    assert!(stdout(&out).contains("group"));
}

#[test]
fn stored_statistic_can_be_shown() {
    let (dir, file) = imported();
    let out = sgrid(dir.path()).arg("descriptives").arg(&file).arg("age").arg("--json").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["tables"][0]["title"], "Descriptive Statistics");
    let id = report["statistics"][0].as_i64().unwrap();

    let out = sgrid(dir.path()).arg("audit").arg(&file).arg("--show").arg(id.to_string()).output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("Descriptive Statistics"));
    assert!(stdout(&out).contains("32.2"));
}

#[test]
fn separate_audit_database() {
    let (dir, file) = imported();
    let audit = dir.path().join("trail.sgrid");

    let out = sgrid(dir.path())
        .args(["crosstabs"])
        .arg(&file)
        .args(["--row", "sex", "--col", "group", "--audit"])
        .arg(&audit)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("sex * group Crosstabulation"));

    let out = sgrid(dir.path()).arg("audit").arg(&audit).output().unwrap();
    assert!(stdout(&out).contains("CROSSTABS /TABLES=sex BY group."));

    let out = sgrid(dir.path()).arg("audit").arg(&file).output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).is_empty());
}

#[test]
fn unknown_variable_is_noted_and_skipped() {
    let (dir, file) = imported();

    let out = sgrid(dir.path()).arg("frequencies").arg(&file).args(["group", "nope"]).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("no variable named 'nope'"));

    let quiet = sgrid(dir.path()).arg("frequencies").arg(&file).args(["group", "nope", "-q"]).output().unwrap();
    assert!(!stderr(&quiet).contains("nope"));
}

#[test]
fn compute_failure_exit_code() {
    let (dir, file) = imported();

    let out = sgrid(dir.path()).arg("descriptives").arg(&file).arg("sex").output().unwrap();
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("numeric"));

    let audit = sgrid(dir.path()).arg("audit").arg(&file).arg("--json").output().unwrap();
    assert_eq!(stdout(&audit).trim(), "[]");
}

#[test]
fn missing_dataset_exit_code() {
    let dir = TempDir::new().unwrap();
    let out = sgrid(dir.path()).args(["frequencies", "absent.sgrid", "x"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("hint:"));
}

#[test]
fn export_round_trips_cells() {
    let (dir, file) = imported();
    let tsv = dir.path().join("out.tsv");

    let out = sgrid(dir.path()).arg("export").arg(&file).arg("-o").arg(&tsv).args(["--delimiter", "tab"]).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = fs::read_to_string(&tsv).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("group\tsex\tage"));
    assert_eq!(lines.next(), Some("1\tm\t20"));
}
