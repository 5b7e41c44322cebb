//! Integration tests for configuration and workload loading

use std::io::Write;
use tempfile::NamedTempFile;
use vet_room::domain::{Species, Workload};
use vet_room::infra::{Config, LogFormat};

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[simulation]
tick_ms = 25
workload_file = "workloads/busy.json"

[logging]
level = "debug"
format = "json"

[metrics]
report_on_exit = false

[lab]
programmers = 8
db_slots = 3
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.tick_ms(), 25);
    assert_eq!(config.workload_file(), Some("workloads/busy.json"));
    assert_eq!(config.log_level(), "debug");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(!config.report_on_exit());
    assert_eq!(config.lab().programmers, 8);
    assert_eq!(config.lab().db_slots, 3);
    assert_eq!(config.lab().rounds, 3);
}

#[test]
fn test_zero_tick_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[simulation]\ntick_ms = 0\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.tick_ms(), 1000);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_load_workload_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let workload_content = r#"{
        "challenge_id": "two.species",
        "workload": {
            "animals": [
                { "id": "A1", "species": "A", "arrival_time": 0, "rest_duration": 1 },
                { "id": "B1", "species": "B", "arrival_time": 0, "rest_duration": 1 }
            ]
        }
    }"#;
    temp_file.write_all(workload_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let workload = Workload::from_file(temp_file.path()).unwrap();
    assert_eq!(workload.challenge_id, "two.species");
    assert_eq!(workload.animals()[0].species, Species::Dog);
    assert_eq!(workload.animals()[1].species, Species::Cat);
}

#[test]
fn test_missing_workload_file_has_context() {
    let err = Workload::from_file("/nonexistent/workload.json").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/workload.json"));
}
