//! Resilience configuration with builder pattern
//!
//! Retry settings plus what [`ApiLogger`](super::ApiLogger) records for each call.

use super::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Retry and monitoring settings carried by a client
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub monitoring: MonitoringConfig,
}

/// What gets logged for each call
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Send `X-Correlation-Id` and tag log records with it
    pub correlation_ids: bool,
    /// Per-request debug records (method, URL, sanitized headers, status)
    pub request_logging: bool,
    /// Completion summaries and slow-call warnings
    pub performance_metrics: bool,
    pub log_level: LogLevel,
    /// Operations slower than this get a warning
    pub slow_threshold: Duration,
    /// Append one JSON line per HTTP exchange to this file
    pub transport_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            correlation_ids: true,
            request_logging: true,
            performance_metrics: true,
            log_level: LogLevel::Info,
            slow_threshold: Duration::from_secs(5),
            transport_log: None,
        }
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn correlation_ids(mut self, enabled: bool) -> Self {
        self.config.monitoring.correlation_ids = enabled;
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.monitoring.log_level = level;
        self
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.config.monitoring.slow_threshold = threshold;
        self
    }

    pub fn transport_log(mut self, path: Option<PathBuf>) -> Self {
        self.config.monitoring.transport_log = path;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}
