//! Integration tests for the map generation pipeline.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use tempfile::TempDir;

use covidmap::{generate_map, generate_map_with, Args, JsonSource};

const CASES_URL: &str = "https://cases.test/summary";
const COUNTRIES_URL: &str = "https://countries.test/all";
const BORDERS_URL: &str = "https://borders.test/borders.json";

struct FixtureSource {
    responses: HashMap<String, Value>,
}

impl FixtureSource {
    fn new(cases: Value, countries: Value, borders: Value) -> Self {
        let mut responses = HashMap::new();
        responses.insert(CASES_URL.to_string(), cases);
        responses.insert(COUNTRIES_URL.to_string(), countries);
        responses.insert(BORDERS_URL.to_string(), borders);
        Self { responses }
    }

    fn without(mut self, url: &str) -> Self {
        self.responses.remove(url);
        self
    }
}

impl JsonSource for FixtureSource {
    fn fetch(&self, url: &str) -> Result<Value> {
        match self.responses.get(url) {
            Some(value) => Ok(value.clone()),
            None => anyhow::bail!("Request to {} returned HTTP 500 Internal Server Error", url),
        }
    }
}

fn default_aliases() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("default_name_aliases.txt")
}

fn test_args(output: &Path, extra: &[&str]) -> Args {
    let aliases = default_aliases();
    let mut argv = vec![
        "covidmap".to_string(),
        "--output".to_string(),
        output.display().to_string(),
        "--cases-url".to_string(),
        CASES_URL.to_string(),
        "--countries-url".to_string(),
        COUNTRIES_URL.to_string(),
        "--borders-url".to_string(),
        BORDERS_URL.to_string(),
    ];
    if !extra.contains(&"--no-aliases") {
        argv.push("--aliases".to_string());
        argv.push(aliases.display().to_string());
    }
    argv.extend(extra.iter().map(|s| s.to_string()));
    Args::parse_from(argv)
}

fn polygon(name: &str) -> Value {
    json!({
        "type": "Feature",
        "properties": {"name": name},
        "geometry": {"type": "Polygon", "coordinates": [[[30.0, 50.0], [40.0, 50.0], [40.0, 60.0], [30.0, 50.0]]]}
    })
}

fn russia_fixture() -> FixtureSource {
    FixtureSource::new(
        json!({
            "Countries": [
                {"Country": "Russian Federation", "TotalConfirmed": 1000, "TotalDeaths": 50, "TotalRecovered": 900},
                {"Country": "Diamond Princess", "TotalConfirmed": 712, "TotalDeaths": 13, "TotalRecovered": 651}
            ],
            "Date": "2020-05-01T12:00:00Z"
        }),
        json!([
            {"name": "Russian Federation", "latlng": [61.5, 105.3]},
            {"name": "Antarctica", "latlng": [-74.65, 4.48]}
        ]),
        json!({"type": "FeatureCollection", "features": [polygon("Russia"), polygon("France")]}),
    )
}

#[test]
fn test_end_to_end_russia() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");

    let summary = generate_map_with(&test_args(&output, &[]), &russia_fixture()).unwrap();

    assert_eq!(summary.case_records, 2);
    assert_eq!(summary.geo_records, 2);
    assert_eq!(summary.joined, 1);
    assert_eq!(summary.join_stats.unmatched_cases, 1);
    assert_eq!(summary.join_stats.unmatched_geo, 1);
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.tiers.medium, 1);
    assert_eq!(summary.tiers.low + summary.tiers.high, 0);
    assert!(summary.unmatched_boundaries.is_empty());

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("Total Cases : 1000"));
    assert!(html.contains("Country : Russian Federation<"));
    assert!(html.contains("\"color\":\"orange\""));
    assert!(html.contains("\"Russia\":\"#eff3ff\""));
    assert!(!html.contains("Diamond Princess"));
    assert!(html.contains("Data as of May 1, 2020"));
}

#[test]
fn test_without_aliases_names_stay_unmatched() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");

    let summary =
        generate_map_with(&test_args(&output, &["--no-aliases"]), &russia_fixture()).unwrap();

    assert_eq!(summary.renamed, 0);
    assert_eq!(summary.unmatched_boundaries, vec!["Russian Federation".to_string()]);
}

#[test]
fn test_output_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.html");
    let second = dir.path().join("second.html");

    generate_map_with(&test_args(&first, &[]), &russia_fixture()).unwrap();
    generate_map_with(&test_args(&second, &[]), &russia_fixture()).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_empty_join_still_renders() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");
    let source = FixtureSource::new(
        json!({"Countries": [{"Country": "Atlantis", "TotalConfirmed": 5}]}),
        json!([{"name": "Lemuria", "latlng": [0.0, 0.0]}]),
        json!({"type": "FeatureCollection", "features": []}),
    );

    let summary = generate_map_with(&test_args(&output, &[]), &source).unwrap();

    assert_eq!(summary.joined, 0);
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("var marker_data = [];"));
}

#[test]
fn test_failed_fetch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");
    let source = russia_fixture().without(BORDERS_URL);

    let err = generate_map_with(&test_args(&output, &[]), &source).unwrap_err();

    assert!(format!("{:#}", err).contains("HTTP 500"));
    assert!(!output.exists());
}

#[test]
fn test_malformed_case_payload_is_fatal() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");
    let source = FixtureSource::new(
        json!({"Message": "Caching in progress"}),
        json!([]),
        json!({"type": "FeatureCollection", "features": []}),
    );

    assert!(generate_map_with(&test_args(&output, &[]), &source).is_err());
    assert!(!output.exists());
}

/// Serves one canned response on a local port and returns its URL.
fn serve_once(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        let mut stream = stream;
        let response = format!(
            "{}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
            status_line
        );
        stream.write_all(response.as_bytes()).unwrap();
    });
    format!("http://{}/summary", addr)
}

#[test]
fn test_http_error_status_aborts_run() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("index.html");
    let cases_url = serve_once("HTTP/1.1 404 Not Found");

    let mut args = test_args(&output, &["--timeout", "5"]);
    args.cases_url = cases_url;

    let err = generate_map(&args).unwrap_err();

    assert!(format!("{:#}", err).contains("404"));
    assert!(!output.exists());
}
