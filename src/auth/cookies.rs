//! Session cookie jar
//!
//! Creatio's session login answers with several `Set-Cookie` headers
//! (`.ASPXAUTH`, `BPMCSRF`, `BPMLOADER`, `UserName`, ...). Only name and value
//! matter to us; attributes such as `path` or `HttpOnly` are dropped.

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::api::constants::CSRF_COOKIE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieStore {
    cookies: BTreeMap<String, String>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from raw `Set-Cookie` header values
    pub fn from_set_cookie_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut store = Self::new();
        for header in headers {
            store.absorb(header);
        }
        store
    }

    /// Apply one `Set-Cookie` header. An empty value deletes the cookie.
    pub fn absorb(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            debug!("Ignoring malformed Set-Cookie header");
            return;
        };

        let name = name.trim();
        let value = value.trim().trim_matches('"');
        if name.is_empty() {
            return;
        }

        if value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    /// Anti-forgery token, the value of the `BPMCSRF` cookie
    pub fn csrf_token(&self) -> Option<&str> {
        self.get(CSRF_COOKIE)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Value for a `Cookie` request header
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Load a previously saved jar. A missing file is not an error.
    pub async fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read cookie file: {}", path.display()))?;

        let store: CookieStore = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cookie file: {}", path.display()))?;

        debug!("Loaded {} cookies from {}", store.len(), path.display());
        Ok(Some(store))
    }

    /// Persist the jar, creating parent directories as needed
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create cookie directory: {}", parent.display()))?;
            }
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize cookies")?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write cookie file: {}", path.display()))?;

        debug!("Saved {} cookies to {}", self.len(), path.display());
        Ok(())
    }
}
