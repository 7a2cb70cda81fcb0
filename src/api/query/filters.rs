//! OData Filter building
//!
//! Provides type-safe filter construction for Creatio's OData v3 service.
//! String literals have their single quotes doubled here and nowhere else.

use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub enum Filter {
    // Comparison operators
    Eq(String, FilterValue),
    Ne(String, FilterValue),
    Gt(String, FilterValue),
    Ge(String, FilterValue),
    Lt(String, FilterValue),
    Le(String, FilterValue),

    // String functions
    Contains(String, String),
    StartsWith(String, String),
    EndsWith(String, String),

    // Logical operators
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),

    // Raw OData filter for advanced cases
    Raw(String),
}

#[derive(Debug, Clone)]
pub enum FilterValue {
    String(String),
    Guid(String),
    DateTime(NaiveDateTime),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl Filter {
    // Comparison operators
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Ge(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Le(field.into(), value.into())
    }

    /// `field eq guid'<id>'`, the usual way records and lookups are matched
    pub fn guid(field: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Eq(field.into(), FilterValue::Guid(id.into()))
    }

    /// `Id eq guid'<id>'`
    pub fn id(id: impl Into<String>) -> Self {
        Self::guid("Id", id)
    }

    // String functions
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains(field.into(), value.into())
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith(field.into(), value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EndsWith(field.into(), value.into())
    }

    // Logical operators
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    // Raw filter for advanced cases
    pub fn raw(filter: impl Into<String>) -> Self {
        Self::Raw(filter.into())
    }

    /// Convert filter to an OData expression (not yet percent-encoded)
    pub fn to_odata_string(&self) -> String {
        match self {
            Filter::Eq(field, value) => format!("{} eq {}", field, value.to_odata_string()),
            Filter::Ne(field, value) => format!("{} ne {}", field, value.to_odata_string()),
            Filter::Gt(field, value) => format!("{} gt {}", field, value.to_odata_string()),
            Filter::Ge(field, value) => format!("{} ge {}", field, value.to_odata_string()),
            Filter::Lt(field, value) => format!("{} lt {}", field, value.to_odata_string()),
            Filter::Le(field, value) => format!("{} le {}", field, value.to_odata_string()),

            // OData v3 has substringof instead of contains
            Filter::Contains(field, value) => format!("substringof({}, {})", quote(value), field),
            Filter::StartsWith(field, value) => format!("startswith({}, {})", field, quote(value)),
            Filter::EndsWith(field, value) => format!("endswith({}, {})", field, quote(value)),

            // A single clause needs no parentheses; Creatio accepts both.
            Filter::And(filters) => join(filters, " and "),
            Filter::Or(filters) => join(filters, " or "),
            Filter::Not(filter) => format!("not ({})", filter.to_odata_string()),

            Filter::Raw(raw) => raw.clone(),
        }
    }
}

fn join(filters: &[Filter], separator: &str) -> String {
    let filter_strings: Vec<String> = filters.iter().map(|f| f.to_odata_string()).collect();
    match filter_strings.len() {
        0 => String::new(),
        1 => filter_strings.into_iter().next().unwrap_or_default(),
        _ => format!("({})", filter_strings.join(separator)),
    }
}

/// Quote an OData string literal, doubling embedded single quotes
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl FilterValue {
    pub fn to_odata_string(&self) -> String {
        match self {
            FilterValue::String(s) => quote(s),
            FilterValue::Guid(id) => format!("guid'{}'", id.replace('\'', "")),
            FilterValue::DateTime(dt) => format!("datetime'{}'", dt.format("%Y-%m-%dT%H:%M:%S")),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Integer(i) => i.to_string(),
            FilterValue::Boolean(b) => b.to_string(),
            FilterValue::Null => "null".to_string(),
        }
    }
}

// Convenient From implementations for FilterValue
impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        FilterValue::String(value.clone())
    }
}

impl From<uuid::Uuid> for FilterValue {
    fn from(value: uuid::Uuid) -> Self {
        FilterValue::Guid(value.to_string())
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(value: NaiveDateTime) -> Self {
        FilterValue::DateTime(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value as i64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}
