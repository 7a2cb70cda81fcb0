//! Typed convenience methods over the raw request adapter
//!
//! Each method is one or a few reads/writes with a fixed `$select` list.
//! Lookups that find nothing yield `None` or an empty `Vec`; a service
//! error answer on a lookup is an `Err`. Writes report a [`WriteOutcome`].

pub mod accounts;
pub mod activities;
pub mod contacts;
pub mod dates;
pub mod geography;
pub mod orders;
pub mod products;
pub mod questionnaires;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::api::client::CreatioClient;
use crate::api::constants::EMPTY_GUID;
use crate::api::query::{Query, QueryBuilder};
use crate::api::response::RawResponse;

pub use accounts::{Account, AccountAddress};
pub use contacts::Contact;
pub use orders::{Order, OrderDelivery, OrderProduct, OrderStatus};
pub use products::Product;
pub use questionnaires::{
    AnswerType, AnsweredQuestionIds, Interview, InterviewSummary, NewInterview, QuestionAnswer, QuestionInQuestionnaire,
    Questionnaire, QuestionnaireQuestion,
};

/// Result of a create/update/delete
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub ok: bool,
    pub status: u16,
    /// New record id (creates only)
    pub id: Option<String>,
    /// The `d` payload of the answer, if any
    pub data: Option<Value>,
    /// Service error message when `ok` is false
    pub message: Option<String>,
}

impl WriteOutcome {
    pub fn from_response(raw: &RawResponse) -> Self {
        let json = raw.json().ok();
        let data = json.as_ref().and_then(|j| j.get("d")).cloned();
        let id = data
            .as_ref()
            .and_then(|d| d.get("Id"))
            .and_then(|id| id.as_str())
            .map(|s| s.to_string());

        let service_error = raw.service_error();
        let ok = raw.is_success() && service_error.is_none();
        let message = if ok { None } else { Some(raw.error_message()) };

        Self {
            ok,
            status: raw.status,
            id,
            data,
            message,
        }
    }

    /// `Ok(self)` when the write succeeded, otherwise the service message as an error
    pub fn into_result(self) -> anyhow::Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            anyhow::bail!(
                "Write failed (HTTP {}): {}",
                self.status,
                self.message.unwrap_or_default()
            )
        }
    }
}

/// `true` for `None`, empty strings and the empty GUID
pub fn is_unset(id: Option<&str>) -> bool {
    match id {
        None => true,
        Some(id) => id.is_empty() || id == EMPTY_GUID,
    }
}

/// Serde adapter: lookup ids where the empty GUID means "not set"
pub(crate) fn deserialize_guid_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !is_unset(Some(id.as_str()))))
}

/// Serde adapter: `Edm.Decimal` arrives as a string in verbose JSON
pub(crate) fn deserialize_decimal_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl CreatioClient {
    /// Run a query and deserialize every row
    pub(crate) async fn fetch_all<T: DeserializeOwned>(&self, query: Query) -> anyhow::Result<Vec<T>> {
        self.execute_query(&query).await?.deserialize()
    }

    /// First row of a query, if any
    pub(crate) async fn fetch_first<T: DeserializeOwned>(&self, query: Query) -> anyhow::Result<Option<T>> {
        Ok(self.fetch_all(query.with_top(1)).await?.into_iter().next())
    }

    /// A string field of the first matching row
    pub(crate) async fn fetch_field(&self, builder: QueryBuilder, field: &str) -> anyhow::Result<Option<String>> {
        let row: Option<Value> = self.fetch_first(builder.select(&[field]).build()).await?;
        Ok(row
            .as_ref()
            .and_then(|r| r.get(field))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()))
    }

    /// `Id` of the first row matching the builder's filter
    pub(crate) async fn fetch_id(&self, builder: QueryBuilder) -> anyhow::Result<Option<String>> {
        self.fetch_field(builder, "Id").await
    }

    pub(crate) async fn create_record(&self, collection: &str, data: &Value) -> anyhow::Result<WriteOutcome> {
        Ok(WriteOutcome::from_response(&self.create(collection, data).await?))
    }

    pub(crate) async fn update_record(&self, collection: &str, id: &str, data: &Value) -> anyhow::Result<WriteOutcome> {
        Ok(WriteOutcome::from_response(&self.update(collection, id, data).await?))
    }

    pub(crate) async fn delete_record(&self, collection: &str, id: &str) -> anyhow::Result<WriteOutcome> {
        Ok(WriteOutcome::from_response(&self.delete(collection, id).await?))
    }
}
