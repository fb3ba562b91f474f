use crate::db::Database;
use crate::validate::{LogRecord, validate_line};
use tempfile::NamedTempFile;

mod runs;

/// Open a fresh database; keep the returned file alive for the test's duration
async fn create_test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// Build a record through the validator so tests only use reachable values
fn record(ip: &str, method: &str, uri: &str, size: &str) -> LogRecord {
    validate_line(&format!(
        r#"{ip} - - [19/Dec/2020:13:57:26 +0100] "{method} {uri} HTTP/1.1" 200 {size}"#
    ))
    .unwrap()
}
