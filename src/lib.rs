//! Async client for the Creatio CRM OData service.
//!
//! [`CreatioClient`] authenticates with OAuth client credentials or a cookie
//! session, issues read/create/update/delete requests against
//! `EntityDataService.svc` collections, retries transient failures and
//! hands back raw status and body. The `services` module layers typed
//! lookups for orders, accounts, contacts, products and questionnaires
//! on top.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod services;

pub use api::{CreatioClient, Filter, OrderBy, QueryBuilder, RawResponse};
pub use config::CreatioConfig;
