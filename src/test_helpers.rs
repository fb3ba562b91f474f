//! Shared fakes and fixtures for unit tests.

use crate::error::{Error, Result};
use crate::sink::{LogSink, ProgressSink};
use crate::source::{LogSource, ProbeResult};
use crate::types::{ImportRun, RunId, RunStatus};
use crate::validate::LogRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use url::Url;
use wiremock::{Request, Respond, ResponseTemplate};

/// A valid combined-format line for the given address and path
pub(crate) fn log_line(ip: &str, method: &str, path: &str) -> String {
    format!(r#"{ip} - - [19/Dec/2020:13:57:26 +0100] "{method} {path} HTTP/1.1" 200 512 "-" "curl/8.0""#)
}

/// `count` valid lines, each newline-terminated
pub(crate) fn sample_log(count: usize) -> String {
    (0..count)
        .map(|i| {
            let ip = format!("10.0.{}.{}", i / 250, i % 250 + 1);
            format!("{}\n", log_line(&ip, "GET", &format!("/page/{i}")))
        })
        .collect()
}

/// Calls observed by [`MemorySource`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SourceCall {
    Probe,
    Range(u64, u64),
    All,
}

/// In-memory [`LogSource`] serving a fixed body
pub(crate) struct MemorySource {
    body: Vec<u8>,
    supports_ranges: bool,
    /// Range fetches allowed to succeed before every further one fails
    fail_after: Option<usize>,
    calls: Mutex<Vec<SourceCall>>,
}

impl MemorySource {
    pub(crate) fn ranged(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            supports_ranges: true,
            fail_after: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn whole(body: impl Into<Vec<u8>>) -> Self {
        Self {
            supports_ranges: false,
            ..Self::ranged(body)
        }
    }

    pub(crate) fn failing_after(mut self, successful_ranges: usize) -> Self {
        self.fail_after = Some(successful_ranges);
        self
    }

    pub(crate) fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn range_calls(&self) -> Vec<(u64, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SourceCall::Range(from, to) => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LogSource for MemorySource {
    async fn probe(&self, _url: &Url) -> Result<ProbeResult> {
        self.calls.lock().unwrap().push(SourceCall::Probe);
        Ok(ProbeResult {
            supports_ranges: self.supports_ranges,
            total_length: if self.supports_ranges {
                self.body.len() as u64
            } else {
                0
            },
        })
    }

    async fn fetch_range(&self, url: &Url, from: u64, to: u64) -> Result<Vec<u8>> {
        let served = {
            let mut calls = self.calls.lock().unwrap();
            let served = calls
                .iter()
                .filter(|c| matches!(c, SourceCall::Range(..)))
                .count();
            calls.push(SourceCall::Range(from, to));
            served
        };
        if self.fail_after.is_some_and(|limit| served >= limit) {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: 503,
            });
        }

        let end = (to as usize).min(self.body.len().saturating_sub(1));
        Ok(self
            .body
            .get(from as usize..=end)
            .unwrap_or_default()
            .to_vec())
    }

    async fn fetch_all(&self, _url: &Url) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(SourceCall::All);
        Ok(self.body.clone())
    }
}

/// Calls observed by [`RecordingSink`]
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SinkCall {
    CreateRecords(Vec<LogRecord>),
    CreateRun(RunId),
    UpdateRun(RunId, u8),
    FinishRun(RunId),
}

/// In-memory [`LogSink`] and [`ProgressSink`] that records every call
#[derive(Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    runs: Mutex<Vec<ImportRun>>,
}

impl RecordingSink {
    pub(crate) fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Every batch handed to `create_records`, in call order
    pub(crate) fn batches(&self) -> Vec<Vec<LogRecord>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::CreateRecords(records) => Some(records),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn records(&self) -> Vec<LogRecord> {
        self.batches().into_iter().flatten().collect()
    }

    pub(crate) fn updates(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::UpdateRun(_, percent) => Some(percent),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn finish_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::FinishRun(_)))
            .count()
    }

    fn set_run(&self, id: RunId, percent: u8, status: RunStatus) -> Result<ImportRun> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("import run {id}")))?;
        run.percent = percent;
        run.status = status;
        run.updated_at = Utc::now();
        Ok(run.clone())
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn create_records(&self, records: &[LogRecord]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::CreateRecords(records.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn create_run(&self) -> Result<ImportRun> {
        let mut runs = self.runs.lock().unwrap();
        let now = Utc::now();
        let run = ImportRun {
            id: RunId(runs.len() as i64 + 1),
            percent: 1,
            status: RunStatus::Started,
            created_at: now,
            updated_at: now,
        };
        runs.push(run.clone());
        self.calls.lock().unwrap().push(SinkCall::CreateRun(run.id));
        Ok(run)
    }

    async fn update_run(&self, id: RunId, percent: u8) -> Result<ImportRun> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::UpdateRun(id, percent));
        self.set_run(id, percent, RunStatus::Started)
    }

    async fn finish_run(&self, id: RunId) -> Result<ImportRun> {
        self.calls.lock().unwrap().push(SinkCall::FinishRun(id));
        self.set_run(id, 100, RunStatus::Finished)
    }

    async fn list_runs(&self) -> Result<Vec<ImportRun>> {
        Ok(self.runs.lock().unwrap().clone())
    }
}

/// wiremock responder that honours `Range: bytes=a-b` against a fixed body
pub(crate) struct RangeResponder(pub(crate) Vec<u8>);

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
