//! Binary-level tests: run `ofda` as a subprocess against a mock server.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ofda_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ofda");
    path
}

fn run_ofda(workdir: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ofda_binary();
    let output = Command::new(&binary)
        .current_dir(workdir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ofda binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_harvest_writes_date_named_file() {
    let server = MockServer::start().await;
    let meta = json!({ "last_updated": "2024-06-01", "results": { "total": 2 } });
    Mock::given(method("GET"))
        .and(path("/device/event.json"))
        .and(query_param_is_missing("limit"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": meta.clone(), "results": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device/event.json"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": meta,
            "results": [
                { "report_number": "1" },
                { "report_number": "2" }
            ]
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let base_url = format!("{}/device", server.uri());
    let (stdout, stderr, success) = run_ofda(
        tmp.path(),
        &[
            "harvest",
            "acme",
            "--database",
            "event",
            "--base-url",
            &base_url,
            "--progress",
            "off",
        ],
    );
    assert!(success, "harvest failed: stdout={}, stderr={}", stdout, stderr);

    let out_path = tmp.path().join("2024-06-01_FDA_JSON_event.json");
    assert!(out_path.exists(), "expected {} to exist", out_path.display());

    let records: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_harvest_stdout_is_a_json_array() {
    let server = MockServer::start().await;
    let meta = json!({ "last_updated": "2024-06-01", "results": { "total": 1 } });
    Mock::given(method("GET"))
        .and(path("/device/udi.json"))
        .and(query_param_is_missing("limit"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": meta.clone(), "results": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device/udi.json"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": meta,
            "results": [ { "brand_name": "Widget" } ]
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let base_url = format!("{}/device", server.uri());
    let (stdout, stderr, success) = run_ofda(
        tmp.path(),
        &[
            "harvest",
            "acme",
            "--database",
            "udi",
            "--base-url",
            &base_url,
            "--out",
            "-",
            "--progress",
            "off",
        ],
    );
    assert!(success, "harvest failed: stderr={}", stderr);

    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records[0]["brand_name"], "Widget");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_count_prints_frequency_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/event.json"))
        .and(query_param("count", "event_type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ { "term": "Malfunction", "count": 9 } ]
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let base_url = format!("{}/device", server.uri());
    let (stdout, stderr, success) = run_ofda(
        tmp.path(),
        &[
            "count",
            "acme",
            "event_type",
            "--base-url",
            &base_url,
            "--progress",
            "off",
        ],
    );
    assert!(success, "count failed: stderr={}", stderr);

    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows[0]["term"], "Malfunction");
    assert_eq!(rows[0]["count"], 9);
}
