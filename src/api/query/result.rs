//! Query result handling
//!
//! Decodes verbose OData v3 read responses: `{"d":{"results":[...]}}`.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::response::{extract_service_error, RawResponse};

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub success: bool,
    pub data: Option<QueryResponse>,
    pub error: Option<String>,
    pub status_code: u16,
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub value: Vec<Value>,
    pub count: Option<u64>,
    pub next_link: Option<String>,
}

impl QueryResult {
    pub fn success(data: QueryResponse, status_code: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code,
        }
    }

    pub fn error(error: String, status_code: u16) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            status_code,
        }
    }

    /// Classify a raw read response
    pub fn from_raw(raw: &RawResponse) -> Self {
        if !raw.is_success() {
            return Self::error(raw.error_message(), raw.status);
        }

        match raw.json().and_then(QueryResponse::from_json) {
            Ok(data) => Self::success(data, raw.status),
            Err(e) => Self::error(format!("{:#}", e), raw.status),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }

    /// Get the records from the response
    pub fn records(&self) -> Option<&Vec<Value>> {
        self.data.as_ref().map(|d| &d.value)
    }

    /// Get the count if requested in query
    pub fn count(&self) -> Option<u64> {
        self.data.as_ref().and_then(|d| d.count)
    }

    /// Get the next link for pagination
    pub fn next_link(&self) -> Option<&String> {
        self.data.as_ref().and_then(|d| d.next_link.as_ref())
    }

    /// Get number of records returned
    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if no records were returned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn an error result into `Err`, otherwise hand back the rows
    pub fn into_records(self) -> anyhow::Result<Vec<Value>> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data.value),
            _ => anyhow::bail!(
                "Query failed (HTTP {}): {}",
                self.status_code,
                self.error.unwrap_or_else(|| "unknown error".to_string())
            ),
        }
    }

    /// Deserialize every row into `T`
    pub fn deserialize<T: DeserializeOwned>(self) -> anyhow::Result<Vec<T>> {
        self.into_records()?
            .into_iter()
            .map(|record| serde_json::from_value(record).context("Unexpected record shape"))
            .collect()
    }
}

impl QueryResponse {
    /// Parse verbose OData JSON into QueryResponse.
    ///
    /// Accepts `d.results`, a bare `d` array, a single `d` entity (key lookups)
    /// and the v4 `value` array some endpoints return.
    pub fn from_json(json: Value) -> anyhow::Result<Self> {
        if let Some(message) = extract_service_error(&json) {
            anyhow::bail!("{}", message);
        }

        if let Some(d) = json.get("d") {
            let count = d
                .get("__count")
                .and_then(|c| c.as_str().and_then(|s| s.parse().ok()).or_else(|| c.as_u64()));
            let next_link = d.get("__next").and_then(|n| n.as_str()).map(|s| s.to_string());

            let value = match d {
                Value::Array(rows) => rows.clone(),
                Value::Object(map) => match map.get("results") {
                    Some(Value::Array(rows)) => rows.clone(),
                    _ => vec![d.clone()],
                },
                _ => anyhow::bail!("Unexpected 'd' payload in response"),
            };

            return Ok(Self {
                value,
                count,
                next_link,
            });
        }

        let value = json
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("Missing 'd.results' in response"))?
            .clone();

        Ok(Self {
            value,
            count: None,
            next_link: None,
        })
    }

    /// Get a specific field from all records
    pub fn get_field_values(&self, field_name: &str) -> Vec<Option<&Value>> {
        self.value.iter().map(|record| record.get(field_name)).collect()
    }
}
