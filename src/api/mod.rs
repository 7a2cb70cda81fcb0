//! Creatio OData API Module
//!
//! Authentication (OAuth client credentials or cookie session), the
//! read/create/update/delete request adapter, OData query building and
//! the retry and logging layer they share.

pub mod auth;
pub mod client;
pub mod constants;
pub mod models;
pub mod operations;
pub mod query;
pub mod resilience;
pub mod response;

pub use auth::{AuthHeaders, Authenticator};
pub use client::{ClientOptions, CreatioClient};
pub use models::{ConnectionMode, Credential, CredentialSet, Environment};
pub use operations::Operation;
pub use query::{Filter, FilterValue, OrderBy, Query, QueryBuilder, QueryResult};
pub use resilience::{
    ApiLogger, AttemptOutcome, LogLevel, MonitoringConfig, OperationContext, OperationMetrics, ResilienceConfig,
    RetryConfig, RetryPolicy, RetryableError,
};
pub use response::RawResponse;
