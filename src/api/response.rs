//! Raw HTTP response handed back by the request adapter

use anyhow::Context;
use serde_json::Value;

/// Status code and body of a completed request, exactly as the server sent them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON; an empty body (204, DELETE) yields `Value::Null`
    pub fn json(&self) -> anyhow::Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
            .with_context(|| format!("Response body is not JSON (HTTP {})", self.status))
    }

    /// Message of an OData error envelope `{"error":{"message":{"value":..}}}`
    pub fn service_error(&self) -> Option<String> {
        let json = serde_json::from_str::<Value>(&self.body).ok()?;
        extract_service_error(&json)
    }

    /// Error description for a non-success response
    pub fn error_message(&self) -> String {
        self.service_error().unwrap_or_else(|| {
            let body = self.body.trim();
            if body.is_empty() {
                format!("HTTP {}", self.status)
            } else {
                format!("HTTP {}: {}", self.status, body)
            }
        })
    }
}

pub(crate) fn extract_service_error(json: &Value) -> Option<String> {
    let message = json.get("error")?.get("message")?;
    match message {
        Value::String(s) => Some(s.clone()),
        other => other.get("value").and_then(|v| v.as_str()).map(|s| s.to_string()),
    }
}
