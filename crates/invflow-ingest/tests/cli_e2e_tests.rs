//! End-to-end tests for the invflow binary
//!
//! These validate:
//! - A successful run and its artifacts
//! - Exit codes for terminal and exhausted failures
//! - Workflow file handling
//! - Argument validation

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::net::TcpListener;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const INVENTORY_TSV: &str = "Item\tVolume 2015\n\
bolts\t5.0\n\
nuts\t4.5\n\
washers\t3.0\n\
screws\t2.5\n\
rivets\t1.5\n\
pins\t1.0\n";

async fn inventory_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/inventory.tsv"))
        .respond_with(ResponseTemplate::new(status).set_body_string(INVENTORY_TSV))
        .mount(&server)
        .await;
    server
}

/// Binary isolated from the caller's environment and working directory
fn invflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("invflow").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("INVFLOW_CONFIG")
        .env_remove("INVFLOW_URL")
        .env_remove("INVFLOW_COLUMN")
        .env_remove("INVFLOW_DATA_DIR")
        .env_remove("INVFLOW_MAX_ATTEMPTS")
        .env_remove("RUST_LOG")
        .env("LOG_LEVEL", "info")
        .env("LOG_OUTPUT", "console")
        .arg("--backoff-ms")
        .arg("1");
    cmd
}

#[tokio::test]
async fn test_successful_run() {
    let server = inventory_server(200).await;
    let dir = TempDir::new().unwrap();

    invflow(&dir)
        .arg("--url")
        .arg(format!("{}/inventory.tsv", server.uri()))
        .arg("--data-dir")
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline complete"));

    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("run/stats.json")).unwrap())
            .unwrap();
    assert_eq!(
        stats,
        serde_json::json!({ "Maximum": 5.0, "Minimum": 1.0, "Median": 2.75 })
    );

    let dataset: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("run/data.json")).unwrap())
            .unwrap();
    assert_eq!(dataset.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_terminal_status_exits_with_one() {
    let server = inventory_server(404).await;
    let dir = TempDir::new().unwrap();

    invflow(&dir)
        .arg("--url")
        .arg(format!("{}/inventory.tsv", server.uri()))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("fetching"));

    assert!(!dir.path().join("stats.json").exists());
}

#[test]
fn test_refused_connection_exits_with_two() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let dir = TempDir::new().unwrap();

    invflow(&dir)
        .arg("--url")
        .arg(format!("http://127.0.0.1:{}/inventory.tsv", port))
        .arg("--max-attempts")
        .arg("1")
        .assert()
        .code(2);

    assert!(!dir.path().join("data.json").exists());
    assert!(!dir.path().join("stats.json").exists());
}

#[tokio::test]
async fn test_workflow_file_with_column_override() {
    let server = inventory_server(200).await;
    let dir = TempDir::new().unwrap();
    let workflow = serde_json::json!({
        "workflow": [
            { "name": "fetch", "input": server.uri(), "filename": "inventory.tsv" },
            { "name": "convert", "input": "fetch", "filename": "inventory.json" },
            {
                "name": "stats",
                "input": "inventory.json",
                "filename": "summary.json",
                "extra": [{ "column_name": "Volume 2099" }]
            }
        ]
    });
    fs::write(dir.path().join("workflow.json"), workflow.to_string()).unwrap();

    invflow(&dir)
        .arg("--config")
        .arg("workflow.json")
        .arg("--column")
        .arg("Volume 2015")
        .assert()
        .success();

    assert!(dir.path().join("inventory.json").exists());
    assert!(dir.path().join("summary.json").exists());
}

#[test]
fn test_invalid_workflow_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("workflow.json"), r#"{"workflow": []}"#).unwrap();

    invflow(&dir)
        .arg("--config")
        .arg("workflow.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch"));
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("invflow")
        .unwrap()
        .current_dir(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-attempts"))
        .stdout(predicate::str::contains("--pad-short-rows"));
}
