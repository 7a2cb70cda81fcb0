//! Country and city lookups

use crate::api::client::CreatioClient;
use crate::api::query::{Filter, QueryBuilder};

pub const COUNTRY_COLLECTION: &str = "CountryCollection";
pub const CITY_COLLECTION: &str = "CityCollection";

/// Countries are keyed by ISO alpha-3 code; France is commonly passed as alpha-2
pub fn normalize_country_code(code: &str) -> String {
    let code = code.trim().to_uppercase();
    match code.as_str() {
        "FR" => "FRA".to_string(),
        _ => code,
    }
}

impl CreatioClient {
    pub async fn country_id_by_iso_code(&self, iso_code: &str) -> anyhow::Result<Option<String>> {
        let code = normalize_country_code(iso_code);
        self.fetch_id(QueryBuilder::new(COUNTRY_COLLECTION).filter(Filter::eq("Code", code)))
            .await
    }

    pub async fn country_name(&self, country_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_field(QueryBuilder::new(COUNTRY_COLLECTION).by_id(country_id), "Name")
            .await
    }

    pub async fn city_id_by_name(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(QueryBuilder::new(CITY_COLLECTION).filter(Filter::eq("Name", name)))
            .await
    }

    pub async fn city_name(&self, city_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_field(QueryBuilder::new(CITY_COLLECTION).by_id(city_id), "Name")
            .await
    }
}
