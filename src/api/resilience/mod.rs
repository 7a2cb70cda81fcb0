//! Resilience and observability for Creatio API calls
//!
//! Provides retry policies and structured, correlation-tracked logging.

pub mod config;
pub mod logging;
pub mod retry;

pub use config::{LogLevel, MonitoringConfig, ResilienceConfig, ResilienceConfigBuilder};
pub use logging::{ApiLogger, Exchange, OperationContext, OperationMetrics};
pub use retry::{AttemptOutcome, RetryConfig, RetryPolicy, RetryableError};
