use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Safety margin before expiry at which a credential is treated as stale
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Connection mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Client-credentials grant, bearer token per request
    #[serde(alias = "oAuth")]
    OAuth,
    /// Username/password login, session cookie plus BPMCSRF header
    #[serde(alias = "odata", alias = "oData")]
    Session,
}

impl std::str::FromStr for ConnectionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "oauth" => Ok(Self::OAuth),
            "session" | "odata" => Ok(Self::Session),
            other => anyhow::bail!("Unknown connection mode '{}'", other),
        }
    }
}

/// Resolved environment: where to talk to and how to authenticate
#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    /// Site URL, e.g. `https://mysite.creatio.com`
    pub base_url: String,
    /// Identity service URL, required for OAuth
    pub identity_url: Option<String>,
    pub credentials: CredentialSet,
}

impl Environment {
    pub fn mode(&self) -> ConnectionMode {
        self.credentials.mode()
    }
}

/// Credentials for one environment
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CredentialSet {
    #[serde(rename = "oauth")]
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    #[serde(rename = "session")]
    UsernamePassword { username: String, password: String },
}

impl CredentialSet {
    pub fn mode(&self) -> ConnectionMode {
        match self {
            CredentialSet::ClientCredentials { .. } => ConnectionMode::OAuth,
            CredentialSet::UsernamePassword { .. } => ConnectionMode::Session,
        }
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSet::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            CredentialSet::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Cached credential for an environment
#[derive(Debug, Clone)]
pub struct Credential {
    /// Bearer token, or the serialized `Cookie` header in session mode
    pub secret: String,
    /// Anti-forgery token (session mode only)
    pub csrf_token: Option<String>,
    pub issued_at: SystemTime,
    /// `None` means valid until the server rejects it
    pub expires_at: Option<SystemTime>,
}

impl Credential {
    pub fn bearer(token: String, ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            secret: token,
            csrf_token: None,
            issued_at: now,
            expires_at: Some(now + ttl),
        }
    }

    pub fn session(cookie_header: String, csrf_token: Option<String>, ttl: Option<Duration>) -> Self {
        let now = SystemTime::now();
        Self {
            secret: cookie_header,
            csrf_token,
            issued_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    /// Whether the credential can still be used at `now`
    pub fn is_fresh_at(&self, now: SystemTime) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => match expires_at.checked_sub(EXPIRY_MARGIN) {
                Some(deadline) => now < deadline,
                None => false,
            },
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_within_margin() {
        let credential = Credential::bearer("token".to_string(), Duration::from_secs(3600));
        assert!(credential.is_fresh());

        let almost_expired = credential.issued_at + Duration::from_secs(3600 - 29);
        assert!(!credential.is_fresh_at(almost_expired));

        let well_before = credential.issued_at + Duration::from_secs(3600 - 31);
        assert!(credential.is_fresh_at(well_before));
    }

    #[test]
    fn test_short_lived_token_is_stale_immediately() {
        let credential = Credential::bearer("token".to_string(), Duration::from_secs(10));
        assert!(!credential.is_fresh());
    }

    #[test]
    fn test_session_without_ttl_never_expires() {
        let credential = Credential::session("BPMCSRF=abc".to_string(), Some("abc".to_string()), None);
        assert!(credential.is_fresh_at(SystemTime::now() + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("oauth".parse::<ConnectionMode>().unwrap(), ConnectionMode::OAuth);
        assert_eq!("oData".parse::<ConnectionMode>().unwrap(), ConnectionMode::Session);
        assert!("ldap".parse::<ConnectionMode>().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = CredentialSet::ClientCredentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
