//! Common test utilities for access-log-import integration tests

#![allow(dead_code)]

use access_log_import::{Config, Event, LogImporter};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock server serves the log under
pub const LOG_PATH: &str = "/apache-log/access.log";

/// A valid combined-format line
pub fn log_line(ip: &str, method: &str, uri: &str, size: u64) -> String {
    format!(
        r#"{ip} - - [19/Dec/2020:13:57:26 +0100] "{method} {uri} HTTP/1.1" 200 {size} "-" "Mozilla/5.0""#
    )
}

/// `count` valid lines from distinct addresses, each newline-terminated
pub fn sample_log(count: usize) -> String {
    (0..count)
        .map(|i| {
            let ip = format!("192.168.{}.{}", i / 200, i % 200 + 1);
            format!("{}\n", log_line(&ip, "GET", &format!("/item/{i}"), 100))
        })
        .collect()
}

/// Importer backed by a fresh database in a temp dir
pub async fn create_importer() -> (LogImporter, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("import.db");
    config.import.request_timeout = Some(Duration::from_secs(5));

    let importer = LogImporter::new(config)
        .await
        .expect("Failed to create importer");
    (importer, temp_dir)
}

/// Serves a body honouring `Range: bytes=a-b` the way Apache does
pub struct RangeResponder(pub Vec<u8>);

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)));

        let Some((from, to)) = range else {
            return ResponseTemplate::new(200).set_body_bytes(self.0.clone());
        };
        if from >= self.0.len() {
            return ResponseTemplate::new(416);
        }
        let to = to.min(self.0.len() - 1);
        ResponseTemplate::new(206)
            .insert_header(
                "content-range",
                format!("bytes {from}-{to}/{}", self.0.len()).as_str(),
            )
            .set_body_bytes(self.0[from..=to].to_vec())
    }
}

/// Mock server advertising byte ranges for `body`
pub async fn ranged_log_server(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(LOG_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-length", body.len().to_string().as_str())
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(RangeResponder(body.as_bytes().to_vec()))
        .mount(&server)
        .await;
    server
}

/// Mock server without range support, serving `body` whole
pub async fn plain_log_server(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(LOG_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

/// Full URL of the log on `server`
pub fn log_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), LOG_PATH)
}

/// Collect events until a finished or failed import is seen
pub async fn collect_until_terminal(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let terminal = matches!(
                event,
                Event::ImportFinished { .. } | Event::ImportFailed { .. }
            );
            seen.push(event);
            if terminal {
                break;
            }
        }
    })
    .await;
    seen
}
