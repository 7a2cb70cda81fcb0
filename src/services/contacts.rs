//! Contacts

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{deserialize_guid_opt, WriteOutcome};
use crate::api::client::CreatioClient;
use crate::api::query::{Filter, QueryBuilder};

pub const CONTACT_COLLECTION: &str = "ContactCollection";

pub const CONTACT_FIELDS: &[&str] = &[
    "Id",
    "Name",
    "AccountId",
    "Phone",
    "MobilePhone",
    "Email",
    "Surname",
    "GivenName",
    "MiddleName",
];

/// Name parts stored on contacts created without a first or last name
pub const PLACEHOLDER_GIVEN_NAME: &str = "Prénom";
pub const PLACEHOLDER_SURNAME: &str = "Nom";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
}

impl CreatioClient {
    /// The first `top` contacts
    pub async fn get_contacts(&self, top: u32) -> anyhow::Result<Vec<Contact>> {
        let query = QueryBuilder::new(CONTACT_COLLECTION)
            .select(CONTACT_FIELDS)
            .top(top)
            .build();
        self.fetch_all(query).await
    }

    pub async fn contact_by_id(&self, contact_id: &str) -> anyhow::Result<Option<Contact>> {
        let query = QueryBuilder::new(CONTACT_COLLECTION)
            .select(CONTACT_FIELDS)
            .by_id(contact_id)
            .build();
        self.fetch_first(query).await
    }

    pub async fn contacts_by_account(&self, account_id: &str) -> anyhow::Result<Vec<Contact>> {
        let query = QueryBuilder::new(CONTACT_COLLECTION)
            .select(CONTACT_FIELDS)
            .filter(Filter::guid("Account/Id", account_id))
            .build();
        self.fetch_all(query).await
    }

    /// Find a contact of an account by "<first> <last>".
    ///
    /// When either part is empty, a second lookup uses the placeholder
    /// name parts the CRM stores for such contacts.
    pub async fn contact_id_by_account_and_name(
        &self,
        account_id: &str,
        given_name: &str,
        surname: &str,
    ) -> anyhow::Result<Option<String>> {
        let full_name = format!("{} {}", given_name, surname);
        if let Some(id) = self.contact_id_by_full_name(account_id, &full_name).await? {
            return Ok(Some(id));
        }

        let given_name = if given_name.trim().is_empty() { PLACEHOLDER_GIVEN_NAME } else { given_name };
        let surname = if surname.trim().is_empty() { PLACEHOLDER_SURNAME } else { surname };
        let fallback_name = format!("{} {}", given_name, surname);
        if fallback_name == full_name {
            return Ok(None);
        }

        debug!("Retrying contact lookup with placeholder name '{}'", fallback_name);
        self.contact_id_by_full_name(account_id, &fallback_name).await
    }

    async fn contact_id_by_full_name(&self, account_id: &str, full_name: &str) -> anyhow::Result<Option<String>> {
        let builder = QueryBuilder::new(CONTACT_COLLECTION)
            .filter(Filter::guid("Account/Id", account_id))
            .filter(Filter::eq("Name", full_name));
        self.fetch_id(builder).await
    }

    /// Create a contact; returns the new id
    pub async fn add_contact(&self, fields: &Value) -> anyhow::Result<Option<String>> {
        Ok(self.create_record(CONTACT_COLLECTION, fields).await?.id)
    }

    pub async fn update_contact(&self, contact_id: &str, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.update_record(CONTACT_COLLECTION, contact_id, fields).await
    }
}
