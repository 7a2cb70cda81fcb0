use anyhow::Result;
use log::info;
use std::path::Path;

use crate::api::models::{ConnectionMode, CredentialSet, Environment};

pub const ENV_BASE_URL: &str = "CREATIO_BASE_URL";
pub const ENV_IDENTITY_URL: &str = "CREATIO_IDENTITY_URL";
pub const ENV_MODE: &str = "CREATIO_MODE";
pub const ENV_CLIENT_ID: &str = "CREATIO_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CREATIO_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "CREATIO_USERNAME";
pub const ENV_PASSWORD: &str = "CREATIO_PASSWORD";

/// Connection details read from `CREATIO_*` variables
#[derive(Debug)]
pub struct Credentials {
    pub base_url: String,
    pub identity_url: Option<String>,
    pub credentials: CredentialSet,
}

impl Credentials {
    /// Read from the process environment, after loading `.env` if present
    pub fn from_env() -> Result<Credentials> {
        info!("Importing Creatio credentials from environment variables");
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_env_file(path: &str) -> Result<Credentials> {
        info!("Importing Creatio credentials from .env file: {}", path);

        if !Path::new(path).exists() {
            anyhow::bail!("Environment file not found: {}", path);
        }

        let vars: Vec<(String, String)> = dotenvy::from_path_iter(path)
            .map_err(|e| anyhow::anyhow!("Failed to load .env file '{}': {}", path, e))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to parse .env file '{}': {}", path, e))?;

        Self::from_lookup(|key| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        })
    }

    /// Resolve from any key lookup. The mode defaults to OAuth when a
    /// client id is present and to session login otherwise.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key));

        let base_url = require(ENV_BASE_URL)?;
        let identity_url = get(ENV_IDENTITY_URL);

        let mode = match get(ENV_MODE) {
            Some(mode) => mode.parse::<ConnectionMode>()?,
            None if get(ENV_CLIENT_ID).is_some() => ConnectionMode::OAuth,
            None => ConnectionMode::Session,
        };

        let credentials = match mode {
            ConnectionMode::OAuth => {
                if identity_url.is_none() {
                    anyhow::bail!("{} is required in OAuth mode", ENV_IDENTITY_URL);
                }
                CredentialSet::ClientCredentials {
                    client_id: require(ENV_CLIENT_ID)?,
                    client_secret: require(ENV_CLIENT_SECRET)?,
                }
            }
            ConnectionMode::Session => CredentialSet::UsernamePassword {
                username: require(ENV_USERNAME)?,
                password: require(ENV_PASSWORD)?,
            },
        };

        Ok(Credentials {
            base_url,
            identity_url,
            credentials,
        })
    }

    pub fn into_environment(self, name: impl Into<String>) -> Environment {
        Environment {
            name: name.into(),
            base_url: self.base_url,
            identity_url: self.identity_url,
            credentials: self.credentials,
        }
    }
}
