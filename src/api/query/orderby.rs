//! OData OrderBy building

#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Asc(String),
    Desc(String),
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self::Asc(field.into())
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::Desc(field.into())
    }

    pub fn field(&self) -> &str {
        match self {
            OrderBy::Asc(field) | OrderBy::Desc(field) => field,
        }
    }

    /// Convert to OData orderby string
    pub fn to_odata_string(&self) -> String {
        match self {
            OrderBy::Asc(field) => format!("{} asc", field),
            OrderBy::Desc(field) => format!("{} desc", field),
        }
    }
}

/// Helper to combine multiple OrderBy clauses
#[derive(Debug, Clone, Default)]
pub struct OrderByClause {
    clauses: Vec<OrderBy>,
}

impl OrderByClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, order: OrderBy) -> Self {
        self.clauses.push(order);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn to_odata_string(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            let order_strings: Vec<String> = self.clauses.iter().map(|o| o.to_odata_string()).collect();
            Some(order_strings.join(","))
        }
    }
}
