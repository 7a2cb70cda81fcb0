//! Accounts and their addresses

use serde::Deserialize;
use serde_json::Value;

use super::{deserialize_guid_opt, WriteOutcome};
use crate::api::client::CreatioClient;
use crate::api::query::{Filter, QueryBuilder};

pub const ACCOUNT_COLLECTION: &str = "AccountCollection";
pub const ACCOUNT_ADDRESS_COLLECTION: &str = "AccountAddressCollection";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub primary_contact_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// GPS latitude
    #[serde(rename = "GPSN", default)]
    pub gps_north: Option<String>,
    /// GPS longitude
    #[serde(rename = "GPSE", default)]
    pub gps_east: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountAddress {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub address_type_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub country_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub region_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub city_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl CreatioClient {
    pub async fn account_by_id(&self, id: &str) -> anyhow::Result<Option<Account>> {
        let query = QueryBuilder::new(ACCOUNT_COLLECTION)
            .select(&["Id", "Name", "OwnerId", "PrimaryContactId", "Phone", "GPSN", "GPSE"])
            .by_id(id)
            .build();
        self.fetch_first(query).await
    }

    pub async fn account_id_by_name(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(QueryBuilder::new(ACCOUNT_COLLECTION).filter(Filter::eq("Name", name)))
            .await
    }

    pub async fn account_primary_contact_id(&self, account_id: &str) -> anyhow::Result<Option<String>> {
        let id = self
            .fetch_field(QueryBuilder::new(ACCOUNT_COLLECTION).by_id(account_id), "PrimaryContactId")
            .await?;
        Ok(id.filter(|id| !super::is_unset(Some(id.as_str()))))
    }

    /// Create an account; returns the new id
    pub async fn add_account(&self, fields: &Value) -> anyhow::Result<Option<String>> {
        Ok(self.create_record(ACCOUNT_COLLECTION, fields).await?.id)
    }

    pub async fn update_account(&self, account_id: &str, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.update_record(ACCOUNT_COLLECTION, account_id, fields).await
    }

    /// Billing address attached to an order
    pub async fn order_billing_address_id(&self, order_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(QueryBuilder::new(ACCOUNT_ADDRESS_COLLECTION).filter(Filter::guid("orderId", order_id)))
            .await
    }

    pub async fn account_address_by_id(&self, address_id: &str) -> anyhow::Result<Option<AccountAddress>> {
        let query = QueryBuilder::new(ACCOUNT_ADDRESS_COLLECTION)
            .select(&["Id", "AddressTypeId", "CountryId", "RegionId", "CityId", "Address", "Zip"])
            .by_id(address_id)
            .build();
        self.fetch_first(query).await
    }

    /// Create an address; returns the new id
    pub async fn add_address(&self, fields: &Value) -> anyhow::Result<Option<String>> {
        Ok(self.create_record(ACCOUNT_ADDRESS_COLLECTION, fields).await?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_deserialization() {
        let account: Account = serde_json::from_value(json!({
            "Id": "a-1",
            "Name": "Acme",
            "PrimaryContactId": "00000000-0000-0000-0000-000000000000",
            "GPSN": "48.85",
            "GPSE": "2.35"
        }))
        .unwrap();

        assert_eq!(account.name.as_deref(), Some("Acme"));
        assert!(account.primary_contact_id.is_none());
        assert_eq!(account.gps_north.as_deref(), Some("48.85"));
    }
}
