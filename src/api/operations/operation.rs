//! Core Operation types for Creatio CRUD requests

use serde_json::Value;

use crate::api::constants::{self, methods};
use crate::api::query::Query;
use crate::api::response::RawResponse;

/// A single request against the OData entity service
#[derive(Debug, Clone)]
pub enum Operation {
    /// Read rows from a collection
    Read { query: Query },
    /// Create a new record
    Create {
        /// Collection name (e.g. "ContactCollection")
        collection: String,
        /// Record fields as JSON
        data: Value,
    },
    /// Update an existing record
    Update {
        collection: String,
        /// Record ID (GUID)
        id: String,
        /// Changed fields as JSON
        data: Value,
    },
    /// Delete a record
    Delete { collection: String, id: String },
}

impl Operation {
    pub fn read(query: Query) -> Self {
        Self::Read { query }
    }

    pub fn create(collection: impl Into<String>, data: Value) -> Self {
        Self::Create {
            collection: collection.into(),
            data,
        }
    }

    pub fn update(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self::Update {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Get the collection name for this operation
    pub fn collection(&self) -> &str {
        match self {
            Self::Read { query } => &query.collection,
            Self::Create { collection, .. } => collection,
            Self::Update { collection, .. } => collection,
            Self::Delete { collection, .. } => collection,
        }
    }

    /// Get the HTTP method for this operation
    pub fn http_method(&self) -> &'static str {
        match self {
            Self::Read { .. } => methods::GET,
            Self::Create { .. } => methods::POST,
            Self::Update { .. } => methods::PUT,
            Self::Delete { .. } => methods::DELETE,
        }
    }

    /// Get the operation type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }

    /// Creates may not be repeated: a lost response could hide a created record
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Create { .. })
    }

    /// Full request URL against `base_url`
    pub fn url(&self, base_url: &str) -> String {
        match self {
            Self::Read { query } => query.to_url(base_url),
            Self::Create { collection, .. } => constants::create_endpoint(base_url, collection),
            Self::Update { collection, id, .. } | Self::Delete { collection, id } => {
                constants::entity_record_endpoint(base_url, collection, id)
            }
        }
    }

    /// JSON body, if the method carries one
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Create { data, .. } | Self::Update { data, .. } => Some(data),
            Self::Read { .. } | Self::Delete { .. } => None,
        }
    }

    /// Execute this operation against a client
    pub async fn execute(&self, client: &crate::api::CreatioClient) -> anyhow::Result<RawResponse> {
        client.execute(self).await
    }
}
