//! Reusable Query object
//!
//! Represents a complete read against one collection. Every read carries
//! `$top` and `$skip`; they default to the service-wide limit and zero.

use anyhow::{bail, Context};

use super::filters::Filter;
use super::orderby::OrderByClause;
use crate::api::constants::{self, DEFAULT_READ_LIMIT};

#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub select: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub orderby: OrderByClause,
    pub expand: Option<Vec<String>>,
    /// Caller options in order; names go out as given, values percent-encoded
    pub options: Vec<(String, String)>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            select: None,
            filter: None,
            orderby: OrderByClause::new(),
            expand: None,
            options: Vec::new(),
            top: None,
            skip: None,
        }
    }

    /// Clone and modify - useful for creating variations of base queries
    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add caller-supplied `name -> value` options.
    ///
    /// `$top` and `$skip` set the paging fields, so they appear once. A name
    /// given twice, or one the typed fields already render, is rejected.
    pub fn with_options(mut self, options: &[(&str, &str)]) -> anyhow::Result<Self> {
        for &(name, value) in options {
            if self.has_option(name) {
                bail!("Query option '{}' given more than once for {}", name, self.collection);
            }
            match name {
                "$top" => {
                    let top = value.trim().parse().with_context(|| format!("Invalid $top '{}'", value))?;
                    self.top = Some(top);
                }
                "$skip" => {
                    let skip = value.trim().parse().with_context(|| format!("Invalid $skip '{}'", value))?;
                    self.skip = Some(skip);
                }
                _ => self.options.push((name.to_string(), value.to_string())),
            }
        }
        Ok(self)
    }

    fn has_option(&self, name: &str) -> bool {
        let typed = match name {
            "$select" => self.select.is_some(),
            "$filter" => self.filter.is_some(),
            "$expand" => self.expand.is_some(),
            "$orderby" => self.orderby.to_odata_string().is_some(),
            "$top" => self.top.is_some(),
            "$skip" => self.skip.is_some(),
            _ => false,
        };
        typed || self.options.iter().any(|(existing, _)| existing == name)
    }

    pub fn effective_top(&self) -> u32 {
        self.top.unwrap_or(DEFAULT_READ_LIMIT)
    }

    pub fn effective_skip(&self) -> u32 {
        self.skip.unwrap_or(0)
    }

    /// Query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();

        if let Some(select) = &self.select {
            params.push(format!("$select={}", select.join(",")));
        }

        if let Some(filter) = &self.filter {
            let expression = filter.to_odata_string();
            if !expression.is_empty() {
                params.push(format!("$filter={}", urlencoding::encode(&expression)));
            }
        }

        if let Some(expand) = &self.expand {
            params.push(format!("$expand={}", expand.join(",")));
        }

        for (name, value) in &self.options {
            params.push(format!("{}={}", name, encode_option_value(value)));
        }

        if let Some(orderby) = self.orderby.to_odata_string() {
            params.push(format!("$orderby={}", urlencoding::encode(&orderby)));
        }

        params.push(format!("$top={}", self.effective_top()));
        params.push(format!("$skip={}", self.effective_skip()));

        params.join("&")
    }

    /// Generate the full OData query URL
    pub fn to_url(&self, base_url: &str) -> String {
        format!(
            "{}?{}",
            constants::entity_endpoint(base_url, &self.collection),
            self.to_query_string()
        )
    }
}

/// Percent-encode an option value, keeping list commas readable
fn encode_option_value(value: &str) -> String {
    value
        .split(',')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}
