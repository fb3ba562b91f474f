//! Combined log format line validation
//!
//! A line is split on whitespace into the positional fields of the Apache
//! "combined" layout:
//!
//! ```text
//! ip ident authuser [day/Mon/Year:HH:MM:SS ±HHMM] "METHOD uri protocol" status size ...
//! ```
//!
//! Fields are checked in order (address, timestamp, method, status) and the
//! first failure rejects the line. An unparsable size never rejects; it
//! becomes 0. The URI is taken verbatim.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;
use utoipa::ToSchema;

/// Timestamp layout after the brackets are removed and date and zone joined
const DATE_FORMAT: &str = "%d/%b/%Y:%H:%M:%S%z";

/// Whitespace-separated tokens a line must have to reach the size field
const MIN_FIELDS: usize = 10;

const IP_FIELD: usize = 0;
const DATE_FIELD: usize = 3;
const ZONE_FIELD: usize = 4;
const METHOD_FIELD: usize = 5;
const URI_FIELD: usize = 6;
const STATUS_FIELD: usize = 8;
const SIZE_FIELD: usize = 9;

/// HTTP methods accepted in a request line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// PATCH
    Patch,
    /// TRACE
    Trace,
    /// CONNECT
    Connect,
}

impl HttpMethod {
    /// Every accepted method
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
        HttpMethod::Trace,
        HttpMethod::Connect,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ();

    /// Exact, case-sensitive match against the wire names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or(())
    }
}

/// One validated access-log entry
///
/// Only [`validate_line`] builds these, so every instance has a parsed
/// address, timestamp, method and in-range status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Client address
    pub ip_address: IpAddr,
    /// Request time with its original offset
    pub timestamp: DateTime<FixedOffset>,
    /// Request method
    pub method: HttpMethod,
    /// Request URI, unvalidated
    pub uri: String,
    /// Response status, 100 to 599
    pub status_code: u16,
    /// Response size in bytes, 0 when the field was not a number
    pub size: u64,
}

/// Why a line was not turned into a [`LogRecord`]
///
/// The `Display` text is the diagnostic emitted for the line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Empty or whitespace-only line; never reported
    #[error("blank line")]
    Blank,

    /// Not enough whitespace-separated fields
    #[error("expected at least 10 fields, found {0}")]
    TooFewFields(usize),

    /// First field is not an IPv4 or IPv6 address
    #[error("{0} is not a valid ip address")]
    InvalidIp(String),

    /// Joined date and zone did not match the timestamp layout
    #[error("{0} date is not a valid date.")]
    InvalidDate(String),

    /// Method outside the accepted set
    #[error("{0} method is not valid.")]
    InvalidMethod(String),

    /// Status field is not a number
    #[error("{0} status code is not an integer.")]
    StatusNotInteger(String),

    /// Status number outside 100-599
    #[error("{0} status code is not in range 100-599.")]
    StatusOutOfRange(i64),
}

/// Accepted records of a batch plus the count of reported rejections
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatedBatch {
    /// Valid records in input order
    pub records: Vec<LogRecord>,
    /// Rejected lines, blank lines excluded
    pub rejected: u64,
}

/// Validate one raw log line
pub fn validate_line(line: &str) -> Result<LogRecord, Rejection> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Err(Rejection::Blank);
    }
    if fields.len() < MIN_FIELDS {
        return Err(Rejection::TooFewFields(fields.len()));
    }

    let ip_address = parse_ip(fields[IP_FIELD])?;
    let timestamp = parse_timestamp(fields[DATE_FIELD], fields[ZONE_FIELD])?;
    let method = parse_method(fields[METHOD_FIELD])?;
    let status_code = parse_status(fields[STATUS_FIELD])?;
    let size = fields[SIZE_FIELD].parse().unwrap_or(0);

    Ok(LogRecord {
        ip_address,
        timestamp,
        method,
        uri: fields[URI_FIELD].to_string(),
        status_code,
        size,
    })
}

/// Validate a batch of lines, logging each reportable rejection
pub fn validate_lines<'a, I>(lines: I) -> ValidatedBatch
where
    I: IntoIterator<Item = &'a str>,
{
    let mut batch = ValidatedBatch::default();
    for line in lines {
        match validate_line(line) {
            Ok(record) => batch.records.push(record),
            Err(Rejection::Blank) => {}
            Err(rejection) => {
                tracing::warn!(reason = %rejection, "rejected log line");
                batch.rejected += 1;
            }
        }
    }
    batch
}

fn parse_ip(value: &str) -> Result<IpAddr, Rejection> {
    value
        .parse()
        .map_err(|_| Rejection::InvalidIp(value.to_string()))
}

fn parse_timestamp(date: &str, zone: &str) -> Result<DateTime<FixedOffset>, Rejection> {
    let date = date.strip_prefix('[').unwrap_or(date);
    let zone = zone.strip_suffix(']').unwrap_or(zone);
    let joined = format!("{date}{zone}");

    DateTime::parse_from_str(&joined, DATE_FORMAT).map_err(|_| Rejection::InvalidDate(joined))
}

fn parse_method(value: &str) -> Result<HttpMethod, Rejection> {
    let method = value.strip_prefix('"').unwrap_or(value);
    method
        .parse()
        .map_err(|_| Rejection::InvalidMethod(method.to_string()))
}

fn parse_status(value: &str) -> Result<u16, Rejection> {
    let code: i64 = value
        .parse()
        .map_err(|_| Rejection::StatusNotInteger(value.to_string()))?;
    if !(100..=599).contains(&code) {
        return Err(Rejection::StatusOutOfRange(code));
    }
    // In range, so the narrowing cannot fail
    u16::try_from(code).map_err(|_| Rejection::StatusOutOfRange(code))
}
