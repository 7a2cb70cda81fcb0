use log::{debug, error, info, warn};
use reqwest::header::SET_COOKIE;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

use super::constants::{self, headers};
use super::models::{Credential, CredentialSet, Environment};
use crate::auth::cookies::CookieStore;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_TTL: u64 = 3600;

/// What a request needs to prove who it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthHeaders {
    Bearer(String),
    Session { cookie: String, csrf: Option<String> },
}

impl AuthHeaders {
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthHeaders::Bearer(token) => request.bearer_auth(token),
            AuthHeaders::Session { cookie, csrf } => {
                let request = request
                    .header(reqwest::header::COOKIE, cookie)
                    .header(headers::FORCE_USE_SESSION, "true");
                match csrf {
                    Some(csrf) => request.header(headers::CSRF, csrf),
                    None => request,
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct AuthState {
    credential: Option<Credential>,
    cookie_file_checked: bool,
}

/// Obtains and caches the credential for one environment.
///
/// The check-and-refresh runs under an async mutex, so concurrent callers
/// wait for a single exchange instead of racing their own.
pub struct Authenticator {
    http_client: reqwest::Client,
    environment: Environment,
    cookie_path: Option<PathBuf>,
    session_ttl: Option<Duration>,
    state: Mutex<AuthState>,
}

impl Authenticator {
    pub fn new(http_client: reqwest::Client, environment: Environment) -> Self {
        Self {
            http_client,
            environment,
            cookie_path: None,
            session_ttl: None,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Persist session cookies to this file and reuse them on startup
    pub fn with_cookie_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_path = path;
        self
    }

    /// Treat a session as stale after this long; by default it lives until rejected
    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Return usable auth headers, refreshing the credential if needed
    pub async fn ensure_authenticated(&self) -> anyhow::Result<AuthHeaders> {
        let mut state = self.state.lock().await;

        if let Some(credential) = &state.credential {
            if credential.is_fresh() {
                return Ok(Self::headers_for(&self.environment.credentials, credential));
            }
            debug!("Credential for {} is stale, refreshing", self.environment.name);
        }

        if !state.cookie_file_checked {
            state.cookie_file_checked = true;
            if let Some(credential) = self.load_saved_session().await {
                let headers = Self::headers_for(&self.environment.credentials, &credential);
                state.credential = Some(credential);
                return Ok(headers);
            }
        }

        let credential = self.authenticate().await.map_err(|e| {
            error!("Authentication failed for environment {}: {:#}", self.environment.name, e);
            e
        })?;

        let headers = Self::headers_for(&self.environment.credentials, &credential);
        state.credential = Some(credential);
        Ok(headers)
    }

    /// Drop the cached credential so the next call authenticates again
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.credential.take().is_some() {
            info!("Invalidated credential for environment {}", self.environment.name);
        }
        state.cookie_file_checked = true;
    }

    /// Current anti-forgery token, if a session is established
    pub async fn cookie_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.credential.as_ref().and_then(|c| c.csrf_token.clone())
    }

    /// Perform a fresh exchange with the identity or login endpoint
    pub async fn authenticate(&self) -> anyhow::Result<Credential> {
        info!(
            "Authenticating to {} for environment {}",
            self.environment.base_url, self.environment.name
        );

        match &self.environment.credentials {
            CredentialSet::ClientCredentials {
                client_id,
                client_secret,
            } => self.request_token(client_id, client_secret).await,
            CredentialSet::UsernamePassword { username, password } => self.login(username, password).await,
        }
    }

    async fn request_token(&self, client_id: &str, client_secret: &str) -> anyhow::Result<Credential> {
        let identity_url = self
            .environment
            .identity_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OAuth mode requires an identity URL"))?;
        let token_url = constants::token_endpoint(identity_url);

        let response = self
            .http_client
            .post(&token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        debug!("Token request status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token request failed ({}): {}", status, error_text)
        }

        let token_data: serde_json::Value = response.json().await?;

        let access_token = token_data
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("No access token in response"))?;

        let expires_in = token_data
            .get("expires_in")
            .and_then(|e| e.as_u64().or_else(|| e.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(DEFAULT_TOKEN_TTL);

        info!(
            "Obtained access token for environment {} (expires in {}s)",
            self.environment.name, expires_in
        );
        Ok(Credential::bearer(access_token.to_string(), Duration::from_secs(expires_in)))
    }

    async fn login(&self, username: &str, password: &str) -> anyhow::Result<Credential> {
        let login_url = constants::login_endpoint(&self.environment.base_url);

        let response = self
            .http_client
            .post(&login_url)
            .header(reqwest::header::CONTENT_TYPE, headers::CONTENT_TYPE_JSON)
            .json(&serde_json::json!({
                "UserName": username,
                "UserPassword": password,
            }))
            .send()
            .await?;

        let status = response.status();
        debug!("Login request status: {}", status);

        let cookies = CookieStore::from_set_cookie_headers(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            anyhow::bail!("Login failed ({}): {}", status, body)
        }

        // The service answers 200 with {"Code": 1, "Message": ...} on bad credentials
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            let code = json.get("Code").and_then(|c| c.as_i64()).unwrap_or(0);
            if code != 0 {
                let message = json
                    .get("Message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error");
                anyhow::bail!("Login rejected (code {}): {}", code, message)
            }
        }

        if cookies.is_empty() {
            anyhow::bail!("Login succeeded but no session cookies were issued")
        }
        if cookies.csrf_token().is_none() {
            warn!("Login response carried no {} cookie", constants::CSRF_COOKIE);
        }

        if let Some(path) = &self.cookie_path {
            if let Err(e) = cookies.save(path).await {
                warn!("Could not persist session cookies: {:#}", e);
            }
        }

        info!("Session established for environment {}", self.environment.name);
        Ok(self.session_credential(&cookies))
    }

    async fn load_saved_session(&self) -> Option<Credential> {
        if !matches!(self.environment.credentials, CredentialSet::UsernamePassword { .. }) {
            return None;
        }
        let path = self.cookie_path.as_ref()?;

        match CookieStore::load(path).await {
            Ok(Some(cookies)) if !cookies.is_empty() => {
                info!("Reusing saved session from {}", path.display());
                Some(self.session_credential(&cookies))
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable cookie file: {:#}", e);
                None
            }
        }
    }

    fn session_credential(&self, cookies: &CookieStore) -> Credential {
        Credential::session(
            cookies.header_value(),
            cookies.csrf_token().map(|s| s.to_string()),
            self.session_ttl,
        )
    }

    fn headers_for(credentials: &CredentialSet, credential: &Credential) -> AuthHeaders {
        match credentials {
            CredentialSet::ClientCredentials { .. } => AuthHeaders::Bearer(credential.secret.clone()),
            CredentialSet::UsernamePassword { .. } => AuthHeaders::Session {
                cookie: credential.secret.clone(),
                csrf: credential.csrf_token.clone(),
            },
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("environment", &self.environment.name)
            .field("mode", &self.environment.mode())
            .field("cookie_path", &self.cookie_path)
            .finish()
    }
}
