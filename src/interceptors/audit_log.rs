//! Audit log interceptor
//!
//! Logs every request and its terminal envelope for compliance and debugging.

use super::RequestInterceptor;
use crate::envelope::ResultEnvelope;
use crate::request::Request;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RESULT_CHARS: usize = 1000;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    request_id: &'a str,
    kind: &'a str,
    chain: &'a str,
    app_name: &'a str,
    origin: &'a str,
    status: &'static str,
    /// Failing stage, for error envelopes
    stage: Option<&'a str>,
    result: Option<Value>,
    duration_ms: u64,
}

impl<'a> AuditEntry<'a> {
    fn for_request(request: &'a Request, entry_type: &'static str, status: &'static str) -> Self {
        Self {
            timestamp: Utc::now(),
            entry_type,
            request_id: request.id.as_str(),
            kind: request.kind.wire_name(),
            chain: &request.chain,
            app_name: &request.app_name,
            origin: &request.origin,
            status,
            stage: None,
            result: None,
            duration_ms: 0,
        }
    }
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Interceptor that logs all requests to a JSONL file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    /// Create a new audit log interceptor
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    async fn append(&self, entry: &AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[async_trait]
impl RequestInterceptor for AuditLogInterceptor {
    async fn on_request(&self, request: &Request) {
        let entry = AuditEntry::for_request(request, "request_start", "pending");
        self.append(&entry).await;
    }

    async fn on_complete(&self, request: &Request, envelope: &ResultEnvelope, duration_ms: u64) {
        let status = if envelope.is_error() { "error" } else { "success" };
        let mut entry = AuditEntry::for_request(request, "request_complete", status);
        entry.stage = envelope.method();
        entry.result = envelope.success_value().map(truncate_result);
        entry.duration_ms = duration_ms;
        self.append(&entry).await;
    }
}

/// Truncate result for logging
fn truncate_result(result: &Value) -> Value {
    let s = serde_json::to_string(result).unwrap_or_default();
    match s.char_indices().nth(MAX_RESULT_CHARS) {
        Some((cut, _)) => serde_json::json!(format!("{}... [truncated]", &s[..cut])),
        None => result.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::request::{RequestId, RequestKind};
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn entries(file: &NamedTempFile) -> Vec<Value> {
        std::fs::read_to_string(file.path())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_logs_request_lifecycle() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let request = Request::new("req-1", RequestKind::Transfer, "BTS", json!({"params": {}}))
            .with_app("dex", "https://dex.example");

        interceptor.on_request(&request).await;
        let envelope = ResultEnvelope::success(RequestId::from("req-1"), json!({"id": "abc"}));
        interceptor.on_complete(&request, &envelope, 150).await;

        let logged = entries(&temp_file);
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0]["entry_type"], "request_start");
        assert_eq!(logged[1]["status"], "success");
        assert_eq!(logged[1]["kind"], "transfer");
        assert_eq!(logged[1]["result"], json!({"id": "abc"}));
        assert_eq!(logged[1]["duration_ms"], 150);
    }

    #[tokio::test]
    async fn test_logs_failing_stage() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let request = Request::new("req-2", RequestKind::SignNft, "BTS", json!({}));

        let error = StageError::rejected("signNFT.reject", json!("user said no"));
        let envelope = ResultEnvelope::failure(RequestId::from("req-2"), &error);
        interceptor.on_complete(&request, &envelope, 3).await;

        let logged = entries(&temp_file);
        assert_eq!(logged[0]["status"], "error");
        assert_eq!(logged[0]["stage"], "signNFT.reject");
        assert!(logged[0]["result"].is_null());
    }

    #[test]
    fn test_truncates_large_results() {
        let large = json!({"blob": "x".repeat(5000)});
        let truncated = truncate_result(&large);
        let text = truncated.as_str().unwrap();
        assert!(text.ends_with("[truncated]"));
        assert!(text.len() < 1100);
    }
}
