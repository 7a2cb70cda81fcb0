use super::auth::{AuthHeaders, Authenticator};
use super::constants::headers;
use super::models::Environment;
use super::operations::Operation;
use super::query::{OrderBy, Query, QueryResult};
use super::resilience::{
    ApiLogger, AttemptOutcome, Exchange, OperationContext, ResilienceConfig, RetryPolicy, RetryableError,
};
use super::response::RawResponse;
use anyhow::Context;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Transport and resilience settings for a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub resilience: ResilienceConfig,
    /// Session cookie file (session mode only)
    pub cookie_file: Option<PathBuf>,
    /// Treat sessions as stale after this long
    pub session_ttl: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("creatio-client/", env!("CARGO_PKG_VERSION")).to_string(),
            resilience: ResilienceConfig::default(),
            cookie_file: None,
            session_ttl: None,
        }
    }
}

/// Creatio OData client with connection pooling.
///
/// Clones share the connection pool and the cached credential.
#[derive(Clone)]
pub struct CreatioClient {
    base_url: String,
    http_client: reqwest::Client,
    authenticator: Arc<Authenticator>,
    retry_policy: RetryPolicy,
    api_logger: ApiLogger,
}

impl CreatioClient {
    pub fn new(environment: Environment) -> anyhow::Result<Self> {
        Self::with_options(environment, ClientOptions::default())
    }

    pub fn with_options(environment: Environment, options: ClientOptions) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        let authenticator = Authenticator::new(http_client.clone(), environment.clone())
            .with_cookie_path(options.cookie_file.clone())
            .with_session_ttl(options.session_ttl);

        Ok(Self {
            base_url: environment.base_url.trim_end_matches('/').to_string(),
            http_client,
            authenticator: Arc::new(authenticator),
            retry_policy: RetryPolicy::new(options.resilience.retry.clone()),
            api_logger: ApiLogger::new(options.resilience.monitoring),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Make sure a usable credential is cached
    pub async fn ensure_authenticated(&self) -> anyhow::Result<()> {
        self.authenticator.ensure_authenticated().await.map(|_| ())
    }

    /// Read rows: `<collection>?<options>[&$orderby=<field> desc]&$top=<limit>&$skip=<skip>`
    ///
    /// `limit` and a non-zero `skip` take precedence over `$top`/`$skip`
    /// given in `options`.
    pub async fn read(
        &self,
        collection: &str,
        options: &[(&str, &str)],
        limit: Option<u32>,
        orderby: Option<&str>,
        skip: u32,
    ) -> anyhow::Result<RawResponse> {
        let mut query = Query::new(collection);
        if let Some(field) = orderby {
            query.orderby = query.orderby.add(OrderBy::desc(field));
        }
        let mut query = query.with_options(options)?;
        if limit.is_some() {
            query.top = limit;
        }
        if skip > 0 || query.skip.is_none() {
            query = query.with_skip(skip);
        }
        self.execute(&Operation::read(query)).await
    }

    /// Create a record; the response body carries the new `Id`
    pub async fn create(&self, collection: &str, data: &Value) -> anyhow::Result<RawResponse> {
        self.execute(&Operation::create(collection, data.clone())).await
    }

    pub async fn update(&self, collection: &str, id: &str, data: &Value) -> anyhow::Result<RawResponse> {
        self.execute(&Operation::update(collection, id, data.clone())).await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<RawResponse> {
        self.execute(&Operation::delete(collection, id)).await
    }

    /// Execute a typed query and decode the verbose envelope
    pub async fn execute_query(&self, query: &Query) -> anyhow::Result<QueryResult> {
        let raw = self.execute(&Operation::read(query.clone())).await?;
        Ok(QueryResult::from_raw(&raw))
    }

    /// Execute a single operation.
    ///
    /// Any HTTP answer comes back as a [`RawResponse`]; only transport and
    /// authentication failures are errors. A 401 drops the credential and
    /// re-issues the request once.
    pub async fn execute(&self, operation: &Operation) -> anyhow::Result<RawResponse> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let context = self
            .api_logger
            .start_operation(operation.operation_type(), operation.collection(), &correlation_id);

        let url = operation.url(&self.base_url);
        let policy = if operation.is_idempotent() {
            self.retry_policy.clone()
        } else {
            self.retry_policy.without_retries()
        };
        let label = format!("{} {}", operation.http_method(), operation.collection());
        let attempts = AtomicU32::new(0);

        let mut reauthenticated = false;
        let result = loop {
            let result = policy
                .run(&label, |attempt| {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    self.attempt(operation, &url, &context, attempt)
                })
                .await;

            match result {
                Ok(raw) if raw.status == 401 && !reauthenticated => {
                    self.api_logger.log_reauthentication(&context, raw.status);
                    self.authenticator.invalidate().await;
                    reauthenticated = true;
                }
                other => break other,
            }
        };

        let metrics = match &result {
            Ok(raw) => context.create_metrics(
                attempts.load(Ordering::Relaxed),
                Some(raw.status),
                (!raw.is_success()).then(|| raw.error_message()),
            ),
            Err(e) => context.create_metrics(attempts.load(Ordering::Relaxed), None, Some(format!("{:#}", e))),
        };
        self.api_logger.complete_operation(&context, &metrics);

        result
    }

    /// One HTTP round trip, classified for the retry policy
    async fn attempt(
        &self,
        operation: &Operation,
        url: &str,
        context: &OperationContext,
        attempt: u32,
    ) -> AttemptOutcome<RawResponse> {
        if attempt > 1 {
            self.api_logger.log_retry(context, attempt);
        }

        let auth = match self.authenticator.ensure_authenticated().await {
            Ok(auth) => auth,
            Err(e) => return AttemptOutcome::Permanent(e.context("Authentication failed")),
        };

        let request = self.build_request(operation, url, &auth, context);
        let request_body = operation.body().map(|b| b.to_string());
        let started = Instant::now();

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => Ok(RawResponse::new(status, body)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(raw) => {
                self.api_logger.log_response(context, raw.status, elapsed);
                self.api_logger.record_exchange(
                    context,
                    &Exchange {
                        method: operation.http_method(),
                        url,
                        request_body: request_body.as_deref(),
                        status: Some(raw.status),
                        response_body: Some(&raw.body),
                        error: None,
                        duration: elapsed,
                    },
                )
                .await;

                let reason = RetryableError::from_status_code(raw.status);
                if raw.is_success() || !reason.should_retry() {
                    AttemptOutcome::Complete(raw)
                } else {
                    AttemptOutcome::Transient { reason, last: Ok(raw) }
                }
            }
            Err(e) => {
                self.api_logger.record_exchange(
                    context,
                    &Exchange {
                        method: operation.http_method(),
                        url,
                        request_body: request_body.as_deref(),
                        status: None,
                        response_body: None,
                        error: Some(e.to_string()),
                        duration: elapsed,
                    },
                )
                .await;

                let reason = RetryableError::from_reqwest_error(&e);
                let error = anyhow::Error::new(e).context(format!(
                    "{} {} failed",
                    operation.http_method(),
                    operation.collection()
                ));
                if reason.should_retry() {
                    AttemptOutcome::Transient {
                        reason,
                        last: Err(error),
                    }
                } else {
                    AttemptOutcome::Permanent(error)
                }
            }
        }
    }

    fn build_request(
        &self,
        operation: &Operation,
        url: &str,
        auth: &AuthHeaders,
        context: &OperationContext,
    ) -> reqwest::RequestBuilder {
        let method = match operation {
            Operation::Read { .. } => reqwest::Method::GET,
            Operation::Create { .. } => reqwest::Method::POST,
            Operation::Update { .. } => reqwest::Method::PUT,
            Operation::Delete { .. } => reqwest::Method::DELETE,
        };

        let mut log_headers = HashMap::new();
        log_headers.insert("Accept".to_string(), headers::ODATA_VERBOSE_JSON.to_string());

        let mut request = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, headers::ODATA_VERBOSE_JSON);

        if let Some(body) = operation.body() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, headers::ODATA_VERBOSE_JSON)
                .body(body.to_string());
            log_headers.insert("Content-Type".to_string(), headers::ODATA_VERBOSE_JSON.to_string());
        }

        if self.api_logger.correlation_ids() {
            request = request.header(headers::X_CORRELATION_ID, &context.correlation_id);
        }

        match auth {
            AuthHeaders::Bearer(_) => {
                log_headers.insert("Authorization".to_string(), String::new());
            }
            AuthHeaders::Session { .. } => {
                log_headers.insert("Cookie".to_string(), String::new());
                log_headers.insert(headers::CSRF.to_string(), String::new());
                log_headers.insert(headers::FORCE_USE_SESSION.to_string(), "true".to_string());
            }
        }

        debug!("{} {}", operation.http_method(), url);
        self.api_logger
            .log_request(context, operation.http_method(), url, &log_headers);

        auth.apply(request)
    }
}

impl std::fmt::Debug for CreatioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatioClient")
            .field("base_url", &self.base_url)
            .field("authenticator", &self.authenticator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::CredentialSet;

    fn environment() -> Environment {
        Environment {
            name: "test".to_string(),
            base_url: "https://site.creatio.com/".to_string(),
            identity_url: Some("https://site-is.creatio.com".to_string()),
            credentials: CredentialSet::ClientCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        }
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = CreatioClient::new(environment()).unwrap();
        assert_eq!(client.base_url(), "https://site.creatio.com");
    }

    #[test]
    fn test_clones_share_authenticator() {
        let client = CreatioClient::new(environment()).unwrap();
        let clone = client.clone();
        assert!(std::ptr::eq(client.authenticator(), clone.authenticator()));
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.resilience.retry.max_attempts, 3);
    }
}
