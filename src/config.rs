use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::client::{ClientOptions, CreatioClient};
use crate::api::models::{ConnectionMode, CredentialSet, Environment};
use crate::api::resilience::{LogLevel, ResilienceConfig, RetryConfig};
use crate::auth::credentials::Credentials;

pub const ENV_ENVIRONMENT: &str = "CREATIO_ENV";
pub const ENV_COOKIE_FILE: &str = "CREATIO_COOKIE_FILE";
pub const ENV_TRANSPORT_LOG: &str = "CREATIO_TRANSPORT_LOG";

/// Name given to an environment defined purely through variables
pub const DEFAULT_ENV_NAME: &str = "env";

/// One named Creatio site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatioConfig {
    pub current_environment: Option<String>,
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub correlation_ids: bool,
    pub request_logging: bool,
    pub log_level: LogLevel,
    pub slow_threshold_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 10,
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            backoff_multiplier: retry.backoff_multiplier,
            jitter: retry.jitter,
            correlation_ids: true,
            request_logging: true,
            log_level: LogLevel::Info,
            slow_threshold_ms: 5000,
            transport_log: None,
        }
    }
}

impl Settings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

impl CreatioConfig {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("creatio-client")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".creatio-client")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load the default config file (if any), then apply `CREATIO_*` overrides
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_toml_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        debug!("Loaded config with {} environments", config.environments.len());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", config_path);

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
                fs::create_dir_all(config_dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
                info!("Created config directory: {:?}", config_dir);
            }
        }

        let config_content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Apply `CREATIO_*` variables on top of the file contents.
    ///
    /// `CREATIO_BASE_URL` (with its credential variables) defines or replaces
    /// the environment named by `CREATIO_ENV`, default `env`, and selects it.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let selected = get(ENV_ENVIRONMENT);

        if get(crate::auth::credentials::ENV_BASE_URL).is_some() {
            let credentials = Credentials::from_lookup(&lookup)?;
            let name = selected.clone().unwrap_or_else(|| DEFAULT_ENV_NAME.to_string());
            let previous = self.environments.get(&name);

            let environment = EnvironmentConfig {
                base_url: credentials.base_url,
                identity_url: credentials.identity_url,
                credentials: credentials.credentials,
                cookie_file: previous.and_then(|p| p.cookie_file.clone()),
                session_ttl_secs: previous.and_then(|p| p.session_ttl_secs),
            };
            info!("Environment '{}' defined from environment variables", name);
            self.environments.insert(name.clone(), environment);
            self.current_environment = Some(name);
        } else if let Some(name) = selected {
            self.current_environment = Some(name);
        }

        if let Some(path) = get(ENV_COOKIE_FILE) {
            if let Some(name) = &self.current_environment {
                if let Some(environment) = self.environments.get_mut(name) {
                    environment.cookie_file = Some(PathBuf::from(path));
                }
            }
        }

        if let Some(path) = get(ENV_TRANSPORT_LOG) {
            self.settings.transport_log = Some(PathBuf::from(path));
        }

        Ok(())
    }

    pub fn add_environment(&mut self, name: String, environment: EnvironmentConfig) {
        info!("Adding environment: {}", name);
        self.environments.insert(name.clone(), environment);

        // Set as current environment if it's the first one
        if self.current_environment.is_none() {
            self.current_environment = Some(name.clone());
            info!("Set {} as current environment", name);
        }
    }

    pub fn get_current_environment_name(&self) -> Option<&String> {
        self.current_environment.as_ref()
    }

    pub fn set_current_environment(&mut self, name: String) -> Result<()> {
        if !self.environments.contains_key(&name) {
            anyhow::bail!("Environment '{}' not found", name);
        }

        info!("Setting current environment to: {}", name);
        self.current_environment = Some(name);
        Ok(())
    }

    pub fn list_environments(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.environments.keys().collect();
        names.sort();
        names
    }

    pub fn remove_environment(&mut self, name: &str) -> Result<()> {
        if self.environments.remove(name).is_none() {
            anyhow::bail!("Environment '{}' not found", name);
        }

        info!("Removing environment: {}", name);

        // If this was the current environment, clear it
        if self.current_environment.as_deref() == Some(name) {
            warn!("Removed current environment, clearing current selection");
            self.current_environment = None;
        }

        Ok(())
    }

    /// Resolve and validate a named environment
    pub fn environment(&self, name: &str) -> Result<Environment> {
        let config = self
            .environments
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Environment '{}' not found", name))?;

        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            anyhow::bail!("Environment '{}': base_url must be an http(s) URL", name);
        }
        if config.credentials.mode() == ConnectionMode::OAuth && config.identity_url.is_none() {
            anyhow::bail!("Environment '{}': identity_url is required in OAuth mode", name);
        }

        Ok(Environment {
            name: name.to_string(),
            base_url: config.base_url.clone(),
            identity_url: config.identity_url.clone(),
            credentials: config.credentials.clone(),
        })
    }

    pub fn current_environment(&self) -> Result<Environment> {
        let name = self
            .current_environment
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No current environment selected"))?;
        self.environment(name)
    }

    /// Transport options for the named environment
    pub fn client_options(&self, name: &str) -> ClientOptions {
        let environment = self.environments.get(name);
        ClientOptions {
            timeout: Duration::from_secs(self.settings.timeout_secs),
            connect_timeout: Duration::from_secs(self.settings.connect_timeout_secs),
            resilience: ResilienceConfig::builder()
                .retry_config(self.settings.retry_config())
                .correlation_ids(self.settings.correlation_ids)
                .request_logging(self.settings.request_logging)
                .log_level(self.settings.log_level)
                .slow_threshold(Duration::from_millis(self.settings.slow_threshold_ms))
                .transport_log(self.settings.transport_log.clone())
                .build(),
            cookie_file: environment.and_then(|e| e.cookie_file.clone()),
            session_ttl: environment.and_then(|e| e.session_ttl_secs).map(Duration::from_secs),
            ..ClientOptions::default()
        }
    }

    /// Build a client for the named environment, or the current one
    pub fn connect(&self, name: Option<&str>) -> Result<CreatioClient> {
        let environment = match name {
            Some(name) => self.environment(name)?,
            None => self.current_environment()?,
        };
        let options = self.client_options(&environment.name);
        CreatioClient::with_options(environment, options)
    }
}
