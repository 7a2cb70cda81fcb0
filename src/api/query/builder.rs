//! QueryBuilder for fluent query construction
//!
//! Provides a fluent API that builds Query objects for execution

use super::filters::Filter;
use super::orderby::OrderBy;
use super::query::Query;
use super::result::QueryResult;
use crate::api::client::CreatioClient;

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            query: Query::new(collection),
        }
    }

    /// Select specific fields
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.query.select = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Add filter condition; a second call ANDs with the first
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            None => filter,
            Some(Filter::And(mut existing)) => {
                existing.push(filter);
                Filter::And(existing)
            }
            Some(existing) => Filter::and(vec![existing, filter]),
        });
        self
    }

    /// Add ordering
    pub fn orderby(mut self, order: OrderBy) -> Self {
        self.query.orderby = self.query.orderby.add(order);
        self
    }

    /// Expand related entities
    pub fn expand(mut self, expansions: &[&str]) -> Self {
        self.query.expand = Some(expansions.iter().map(|e| e.to_string()).collect());
        self
    }

    /// Limit number of results
    pub fn top(mut self, top: u32) -> Self {
        self.query.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Zero-based page of `per_page` rows
    pub fn page(self, page: u32, per_page: u32) -> Self {
        self.top(per_page).skip(page.saturating_mul(per_page))
    }

    /// Build the final Query object (reusable)
    pub fn build(self) -> Query {
        self.query
    }

    /// Build and execute immediately
    pub async fn execute(self, client: &CreatioClient) -> anyhow::Result<QueryResult> {
        let query = self.build();
        client.execute_query(&query).await
    }
}

// Convenience methods for common patterns
impl QueryBuilder {
    /// Match a single record by primary key
    pub fn by_id(self, id: impl Into<String>) -> Self {
        self.filter(Filter::id(id))
    }

    /// Most recently modified first
    pub fn newest_first(self) -> Self {
        self.orderby(OrderBy::desc("ModifiedOn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_query_builder() {
        let query = QueryBuilder::new("ContactCollection")
            .select(&["Id", "Name"])
            .filter(Filter::eq("Name", "Jane"))
            .orderby(OrderBy::desc("CreatedOn"))
            .top(10)
            .build();

        assert_eq!(query.collection, "ContactCollection");
        assert_eq!(query.select, Some(vec!["Id".to_string(), "Name".to_string()]));
        assert!(query.filter.is_some());
        assert_eq!(query.top, Some(10));
    }

    #[test]
    fn test_filters_accumulate() {
        let query = QueryBuilder::new("OrderProductCollection")
            .filter(Filter::guid("Order/Id", "o-1"))
            .filter(Filter::guid("Product/Id", "p-1"))
            .filter(Filter::eq("Quantity", 1))
            .build();

        assert_eq!(
            query.filter.unwrap().to_odata_string(),
            "(Order/Id eq guid'o-1' and Product/Id eq guid'p-1' and Quantity eq 1)"
        );
    }

    #[test]
    fn test_paging() {
        let query = QueryBuilder::new("GlbInterviewCollection").page(2, 20).build();
        assert_eq!(query.top, Some(20));
        assert_eq!(query.skip, Some(40));
    }

    #[test]
    fn test_convenience_methods() {
        let query = QueryBuilder::new("OrderCollection")
            .by_id("51d67a11-703f-4f86-9814-e079ee362cab")
            .newest_first()
            .build();

        assert_eq!(
            query.filter.unwrap().to_odata_string(),
            "Id eq guid'51d67a11-703f-4f86-9814-e079ee362cab'"
        );
        assert_eq!(query.orderby.to_odata_string(), Some("ModifiedOn desc".to_string()));
    }
}
