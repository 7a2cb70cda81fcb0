//! Orders, order lines and delivery notes

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{dates, deserialize_decimal_opt, deserialize_guid_opt, WriteOutcome};
use crate::api::client::CreatioClient;
use crate::api::query::{Filter, QueryBuilder};

pub const ORDER_COLLECTION: &str = "OrderCollection";
pub const ORDER_STATUS_COLLECTION: &str = "OrderStatusCollection";
pub const ORDER_PRODUCT_COLLECTION: &str = "OrderProductCollection";
pub const ORDER_DELIVERY_COLLECTION: &str = "OrderProductDeliveryCollection";

const ORDER_FIELDS: &[&str] = &[
    "Id", "Number", "OwnerId", "AccountId", "Date", "StatusId", "ActualDate", "Amount",
];
const DELIVERY_FIELDS: &[&str] = &[
    "Id", "numBL", "dateBL", "SocietyId", "Quantity", "OrderProductId", "ProductId", "OrderId",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_opt")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub status_id: Option<String>,
    #[serde(default, deserialize_with = "dates::deserialize_opt")]
    pub actual_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_decimal_opt")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderStatus {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderProduct {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub product_id: Option<String>,
}

/// A delivery note line (`OrderProductDelivery`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDelivery {
    pub id: String,
    #[serde(rename = "numBL", default)]
    pub document_number: Option<String>,
    #[serde(rename = "dateBL", default, deserialize_with = "dates::deserialize_opt")]
    pub document_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub society_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal_opt")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub order_product_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_guid_opt")]
    pub order_id: Option<String>,
}

/// Body of a new delivery note line. Amounts and margins are text columns.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDelivery {
    pub order_id: String,
    pub order_product_id: String,
    pub product_id: String,
    pub society_id: String,
    pub quantity: i64,
    #[serde(rename = "numBL")]
    pub document_number: String,
    #[serde(rename = "dateBL")]
    pub document_date: String,
    #[serde(rename = "numFC")]
    pub invoice_number: String,
    #[serde(rename = "dateFC")]
    pub invoice_date: String,
    pub description: String,
    pub port_fact: String,
    #[serde(rename = "MargePAPourcent")]
    pub marge_pa_pourcent: String,
    #[serde(rename = "MargePA")]
    pub marge_pa: String,
    #[serde(rename = "MargePRPourcent")]
    pub marge_pr_pourcent: String,
    #[serde(rename = "MargePR")]
    pub marge_pr: String,
    #[serde(rename = "PAU")]
    pub pau: String,
    #[serde(rename = "PRU")]
    pub pru: String,
    #[serde(rename = "PVMU")]
    pub pvmu: String,
    #[serde(rename = "PA")]
    pub pa: String,
    #[serde(rename = "PR")]
    pub pr: String,
    #[serde(rename = "PVHT")]
    pub pvht: String,
}

impl CreatioClient {
    pub async fn order_by_id(&self, id: &str) -> anyhow::Result<Option<Order>> {
        let query = QueryBuilder::new(ORDER_COLLECTION)
            .select(ORDER_FIELDS)
            .by_id(id)
            .build();
        self.fetch_first(query).await
    }

    pub async fn order_by_number(&self, number: &str) -> anyhow::Result<Option<Order>> {
        let query = QueryBuilder::new(ORDER_COLLECTION)
            .select(&["Id", "Number", "OwnerId", "AccountId"])
            .filter(Filter::eq("Number", number))
            .build();
        self.fetch_first(query).await
    }

    pub async fn order_status_name(&self, status_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_field(QueryBuilder::new(ORDER_STATUS_COLLECTION).by_id(status_id), "Name")
            .await
    }

    pub async fn order_status_by_id(&self, status_id: &str) -> anyhow::Result<Option<OrderStatus>> {
        let query = QueryBuilder::new(ORDER_STATUS_COLLECTION)
            .select(&["*"])
            .by_id(status_id)
            .build();
        self.fetch_first(query).await
    }

    /// Create an order; returns the new id
    pub async fn add_order(&self, fields: &Value) -> anyhow::Result<Option<String>> {
        Ok(self.create_record(ORDER_COLLECTION, fields).await?.id)
    }

    pub async fn update_order(&self, id: &str, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.update_record(ORDER_COLLECTION, id, fields).await
    }

    pub async fn set_order_state(&self, order_id: &str, status_id: &str) -> anyhow::Result<WriteOutcome> {
        self.update_order(order_id, &json!({ "StatusId": status_id })).await
    }

    pub async fn set_order_state_and_invoice_date(
        &self,
        order_id: &str,
        status_id: &str,
        invoice_date: &NaiveDateTime,
    ) -> anyhow::Result<WriteOutcome> {
        let fields = json!({
            "StatusId": status_id,
            "ActualDate": dates::to_odata(invoice_date),
        });
        self.update_order(order_id, &fields).await
    }

    /// Delivery note lines of an order for one company
    pub async fn order_deliveries(&self, order_id: &str, society_id: &str) -> anyhow::Result<Vec<OrderDelivery>> {
        let query = QueryBuilder::new(ORDER_DELIVERY_COLLECTION)
            .select(DELIVERY_FIELDS)
            .filter(Filter::guid("Order/Id", order_id))
            .filter(Filter::guid("Society/Id", society_id))
            .build();
        self.fetch_all(query).await
    }

    /// Delivery note lines carrying an external document number
    pub async fn deliveries_by_document_number(
        &self,
        document_number: &str,
        society_id: &str,
    ) -> anyhow::Result<Vec<OrderDelivery>> {
        let query = QueryBuilder::new(ORDER_DELIVERY_COLLECTION)
            .select(DELIVERY_FIELDS)
            .filter(Filter::eq("numBL", document_number))
            .filter(Filter::guid("Society/Id", society_id))
            .build();
        self.fetch_all(query).await
    }

    pub async fn delete_delivery(&self, delivery_id: &str) -> anyhow::Result<WriteOutcome> {
        self.delete_record(ORDER_DELIVERY_COLLECTION, delivery_id).await
    }

    pub async fn insert_delivery(&self, delivery: &NewDelivery) -> anyhow::Result<WriteOutcome> {
        self.create_record(ORDER_DELIVERY_COLLECTION, &serde_json::to_value(delivery)?)
            .await
    }

    /// Id of the order line linking `order_id` and `product_id`
    pub async fn order_product_id(&self, order_id: &str, product_id: &str) -> anyhow::Result<Option<String>> {
        let builder = QueryBuilder::new(ORDER_PRODUCT_COLLECTION)
            .filter(Filter::guid("Order/Id", order_id))
            .filter(Filter::guid("Product/Id", product_id));
        self.fetch_id(builder).await
    }

    pub async fn order_products(&self, order_id: &str) -> anyhow::Result<Vec<OrderProduct>> {
        let query = QueryBuilder::new(ORDER_PRODUCT_COLLECTION)
            .select(&["Id", "ProductId"])
            .filter(Filter::guid("Order/Id", order_id))
            .build();
        self.fetch_all(query).await
    }

    /// Add a line to an order; the outcome's `data` holds the created line
    pub async fn add_product_to_order(&self, fields: &Value) -> anyhow::Result<WriteOutcome> {
        self.create_record(ORDER_PRODUCT_COLLECTION, fields).await
    }
}
