use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn drivesort(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("drivesort").unwrap();
    cmd.env_remove("DRIVESORT_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(config);
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("drivesort.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_classify_names() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    drivesort(&missing)
        .args(["classify", "Dragon & Matt - Weekly Sync", "[No] Standup", "[R] Acme Corp Call", "Call [R] notes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dragon"))
        .stdout(predicate::str::contains("no_instructions"))
        .stdout(predicate::str::contains("customer"))
        .stdout(predicate::str::contains("catchall"))
        .stdout(predicate::str::contains("Call [R] notes"));
}

#[test]
fn test_classify_ignore_case() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    drivesort(&missing)
        .args(["classify", "--ignore-case", "[r] acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer"));
}

#[test]
fn test_query_uses_configured_source() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        &temp_dir,
        r#"
[folders]
source = "my-source"
"#,
    );

    drivesort(&config)
        .arg("query")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "'my-source' in parents and (name contains 'Transcript' or name contains 'Recording')",
        ));
}

#[test]
fn test_config_flag_after_subcommand() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        &temp_dir,
        r#"
[folders]
source = "late-flag-source"
"#,
    );

    let mut cmd = Command::cargo_bin("drivesort").unwrap();
    cmd.env_remove("DRIVESORT_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("query")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("'late-flag-source' in parents"));
}

#[test]
fn test_check_config_lists_folders() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        &temp_dir,
        r#"
[folders]
source = "src"
dragon = "d"
no_instructions = "n"
customer = "c"
catchall = "all"
"#,
    );

    drivesort(&config)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("catchall"))
        .stdout(predicate::str::contains("all"));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        &temp_dir,
        r#"
[folders]
source = "same"
dragon = "same"
"#,
    );

    drivesort(&config)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_malformed_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[folders\nsource = ");

    drivesort(&config)
        .arg("query")
        .assert()
        .failure();
}

#[test]
fn test_run_without_credentials_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(
        &temp_dir,
        r#"
[credentials]
access_token_env = "DRIVESORT_CLI_TEST_TOKEN_UNSET"
"#,
    );

    drivesort(&config)
        .env_remove("DRIVESORT_CLI_TEST_TOKEN_UNSET")
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials"));
}

#[test]
fn test_run_failure_written_to_log_files() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");
    let config = write_config(
        &temp_dir,
        &format!(
            r#"
[credentials]
access_token_env = "DRIVESORT_CLI_TEST_LOG_TOKEN_UNSET"

[logging]
log_dir = "{}"
"#,
            log_dir.display().to_string().replace('\\', "/")
        ),
    );

    drivesort(&config)
        .env_remove("DRIVESORT_CLI_TEST_LOG_TOKEN_UNSET")
        .arg("run")
        .assert()
        .failure();

    let main_log = fs::read_to_string(log_dir.join("drivesort.log")).unwrap();
    assert!(main_log.contains(" - INFO - Starting drivesort v"));
    assert!(main_log.contains(" - ERROR - Failed to set up Drive credentials"));

    let error_log = fs::read_to_string(log_dir.join("drivesort_err.log")).unwrap();
    assert!(error_log.contains("Failed to set up Drive credentials"));
    assert!(!error_log.contains("Starting drivesort"));
}

#[test]
fn test_quiet_still_logs_info_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");
    let config = write_config(
        &temp_dir,
        &format!(
            "[logging]\nlog_dir = \"{}\"\n",
            log_dir.display().to_string().replace('\\', "/")
        ),
    );

    drivesort(&config)
        .args(["--quiet", "query"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let main_log = fs::read_to_string(log_dir.join("drivesort.log")).unwrap();
    assert!(main_log.contains("Starting drivesort"));
}
