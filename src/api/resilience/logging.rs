//! Structured logging with correlation tracking for Creatio API operations
//!
//! Log records go through the `log` facade as JSON payloads. When a
//! transport log is configured, every HTTP exchange is also appended to
//! that file as one JSON line.

use super::config::{LogLevel, MonitoringConfig};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Structured logger for API operations with correlation tracking
#[derive(Debug, Clone)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

/// Context for a single API operation with correlation tracking
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: String,
    /// read, create, update or delete
    pub operation_type: String,
    pub collection: String,
    pub start_time: Instant,
}

/// Outcome summary for a finished operation
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub duration: Duration,
    pub attempts: u32,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

/// One request/response pair as written to the transport log
#[derive(Debug, Clone)]
pub struct Exchange<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub request_body: Option<&'a str>,
    pub status: Option<u16>,
    pub response_body: Option<&'a str>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl ApiLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    pub fn correlation_ids(&self) -> bool {
        self.config.correlation_ids
    }

    /// Start tracking a new operation
    pub fn start_operation(&self, operation_type: &str, collection: &str, correlation_id: &str) -> OperationContext {
        let context = OperationContext {
            correlation_id: correlation_id.to_string(),
            operation_type: operation_type.to_string(),
            collection: collection.to_string(),
            start_time: Instant::now(),
        };

        if self.config.request_logging && self.should_log(LogLevel::Debug) {
            let log_data = json!({
                "event": "operation_started",
                "correlation_id": context.correlation_id,
                "operation_type": context.operation_type,
                "collection": context.collection,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });

            debug!("API Operation Started: {}", log_data);
        }

        context
    }

    /// Log HTTP request details
    pub fn log_request(&self, context: &OperationContext, method: &str, url: &str, headers: &HashMap<String, String>) {
        if !self.config.request_logging || !self.should_log(LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "http_request",
            "correlation_id": context.correlation_id,
            "method": method,
            "url": url,
            "headers": sanitize_headers(headers),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        debug!("HTTP Request: {}", log_data);
    }

    /// Log HTTP response details
    pub fn log_response(&self, context: &OperationContext, status_code: u16, duration: Duration) {
        if !self.config.request_logging || !self.should_log(LogLevel::Debug) {
            return;
        }

        let log_data = json!({
            "event": "http_response",
            "correlation_id": context.correlation_id,
            "collection": context.collection,
            "status_code": status_code,
            "duration_ms": duration.as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if status_code >= 400 {
            warn!("HTTP Response (Error): {}", log_data);
        } else {
            debug!("HTTP Response: {}", log_data);
        }
    }

    /// Log retry attempt
    pub fn log_retry(&self, context: &OperationContext, attempt: u32) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "retry_attempt",
            "correlation_id": context.correlation_id,
            "operation_type": context.operation_type,
            "collection": context.collection,
            "attempt": attempt,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        warn!("Retry Attempt: {}", log_data);
    }

    /// Log that a rejected credential is being replaced
    pub fn log_reauthentication(&self, context: &OperationContext, status_code: u16) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "reauthenticating",
            "correlation_id": context.correlation_id,
            "collection": context.collection,
            "status_code": status_code,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        warn!("Credential Rejected: {}", log_data);
    }

    /// Complete an operation and log metrics
    pub fn complete_operation(&self, context: &OperationContext, metrics: &OperationMetrics) {
        if self.config.performance_metrics && self.should_log(LogLevel::Info) {
            let log_data = json!({
                "event": "operation_completed",
                "correlation_id": context.correlation_id,
                "operation_type": context.operation_type,
                "collection": context.collection,
                "duration_ms": metrics.duration.as_millis(),
                "attempts": metrics.attempts,
                "success": metrics.success,
                "status_code": metrics.status_code,
                "error_message": metrics.error_message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });

            if metrics.success {
                info!("API Operation Completed: {}", log_data);
            } else {
                error!("API Operation Failed: {}", log_data);
            }
        }

        if metrics.duration > self.config.slow_threshold {
            self.log_performance_warning(context, metrics.duration);
        }
    }

    /// Log performance warning for slow operations
    fn log_performance_warning(&self, context: &OperationContext, duration: Duration) {
        if !self.config.performance_metrics || !self.should_log(LogLevel::Warn) {
            return;
        }

        let log_data = json!({
            "event": "performance_warning",
            "correlation_id": context.correlation_id,
            "collection": context.collection,
            "duration_ms": duration.as_millis(),
            "threshold_ms": self.config.slow_threshold.as_millis(),
        });

        warn!("Slow Operation Detected: {}", log_data);
    }

    /// Append an exchange to the transport log, if one is configured.
    /// Write failures are logged and swallowed.
    pub async fn record_exchange(&self, context: &OperationContext, exchange: &Exchange<'_>) {
        let Some(path) = &self.config.transport_log else {
            return;
        };

        let line = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "correlation_id": context.correlation_id,
            "method": exchange.method,
            "url": exchange.url,
            "request_body": exchange.request_body,
            "status": exchange.status,
            "response_body": exchange.response_body,
            "error": exchange.error,
            "duration_ms": exchange.duration.as_millis(),
        });

        let mut record = line.to_string();
        record.push('\n');

        let result = match tokio::fs::OpenOptions::new().create(true).append(true).open(path).await {
            Ok(mut file) => file.write_all(record.as_bytes()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Failed to write transport log {}: {}", path.display(), e);
        }
    }

    /// Check if we should log at the given level
    fn should_log(&self, level: LogLevel) -> bool {
        let rank = |level: LogLevel| match level {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
            LogLevel::Trace => 4,
        };
        rank(level) <= rank(self.config.log_level)
    }
}

/// Redact credentials from a header map before it is logged
pub fn sanitize_headers(headers: &HashMap<String, String>) -> HashMap<String, Value> {
    headers
        .iter()
        .map(|(key, value)| {
            let key_lower = key.to_lowercase();
            let sensitive = key_lower.contains("authorization")
                || key_lower.contains("cookie")
                || key_lower.contains("csrf")
                || key_lower.contains("token");
            let value = if sensitive {
                Value::from("[REDACTED]")
            } else {
                Value::from(value.as_str())
            };
            (key.clone(), value)
        })
        .collect()
}

impl OperationContext {
    /// Calculate elapsed time since operation started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn create_metrics(&self, attempts: u32, status_code: Option<u16>, error_message: Option<String>) -> OperationMetrics {
        OperationMetrics {
            duration: self.elapsed(),
            attempts,
            success: error_message.is_none() && status_code.is_some_and(|s| (200..300).contains(&s)),
            status_code,
            error_message,
        }
    }
}
