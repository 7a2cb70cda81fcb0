//! Products and special prices

use serde::Deserialize;
use serde_json::Value;

use super::{deserialize_decimal_opt, deserialize_guid_opt, WriteOutcome};
use crate::api::client::CreatioClient;
use crate::api::query::{Filter, QueryBuilder};

pub const PRODUCT_COLLECTION: &str = "ProductCollection";
/// Account-specific price ranges
pub const SPECIAL_PRICE_COLLECTION: &str = "AccountRangeCollection";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub unit_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdRow {
    id: String,
}

impl CreatioClient {
    pub async fn product_by_id(&self, product_id: &str) -> anyhow::Result<Option<Product>> {
        let query = QueryBuilder::new(PRODUCT_COLLECTION)
            .select(&["Id", "Code", "Name", "UnitId", "Price", "TaxId", "Description"])
            .by_id(product_id)
            .build();
        self.fetch_first(query).await
    }

    pub async fn update_product(&self, product_id: &str, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.update_record(PRODUCT_COLLECTION, product_id, fields).await
    }

    pub async fn create_product(&self, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.create_record(PRODUCT_COLLECTION, fields).await
    }

    /// Ids of the special prices attached to a tariff code
    pub async fn special_prices_by_tariff(&self, tariff_code: &str) -> anyhow::Result<Vec<String>> {
        let query = QueryBuilder::new(SPECIAL_PRICE_COLLECTION)
            .select(&["Id"])
            .filter(Filter::eq("CodeTarifEBP", tariff_code))
            .build();
        let rows: Vec<IdRow> = self.fetch_all(query).await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    pub async fn add_custom_price(&self, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.create_record(SPECIAL_PRICE_COLLECTION, fields).await
    }

    pub async fn delete_special_price(&self, price_id: &str) -> anyhow::Result<WriteOutcome> {
        self.delete_record(SPECIAL_PRICE_COLLECTION, price_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_price_from_decimal_string() {
        let product: Product = serde_json::from_value(json!({
            "Id": "p-1",
            "Code": "SKU-1",
            "Price": "19.90",
            "TaxId": "00000000-0000-0000-0000-000000000000"
        }))
        .unwrap();

        assert_eq!(product.price, Some(19.9));
        assert!(product.tax_id.is_none());
        assert!(product.description.is_none());
    }
}
