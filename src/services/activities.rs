//! Activities and generic lookups

use serde_json::json;

use super::WriteOutcome;
use crate::api::client::CreatioClient;
use crate::api::query::QueryBuilder;

pub const ACTIVITY_COLLECTION: &str = "ActivityCollection";

/// `Contact` -> `ContactCollection`
pub fn collection_for(object: &str) -> String {
    if object.ends_with("Collection") {
        object.to_string()
    } else {
        format!("{}Collection", object)
    }
}

impl CreatioClient {
    pub async fn update_activity_notes(&self, activity_id: &str, notes: &str) -> anyhow::Result<WriteOutcome> {
        self.update_record(ACTIVITY_COLLECTION, activity_id, &json!({ "Notes": notes }))
            .await
    }

    /// `Name` of any record given its object name (`Account`, `City`, ...)
    pub async fn lookup_name(&self, object: &str, id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_field(QueryBuilder::new(collection_for(object)).by_id(id), "Name")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(collection_for("Contact"), "ContactCollection");
        assert_eq!(collection_for("AccountCollection"), "AccountCollection");
    }
}
