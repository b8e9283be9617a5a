//! Read-only access to the relational store behind the report engine.
//!
//! Defines the [`Store`] trait and a small query model that every backend
//! understands: ANDed comparison predicates, one OR-combined substring search,
//! single-column ordering and a row limit.

pub mod supabase;

#[cfg(test)]
pub mod memory;

use crate::report::Row;
use serde_json::Value;

/// A single ANDed predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: String },
    Gte { field: String, value: String },
    Lte { field: String, value: String },
    In { field: String, values: Vec<String> },
}

/// Case-insensitive substring match; a row qualifies if ANY field matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    pub term: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

/// A filtered, sorted, capped read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub search: Option<TextSearch>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            search: None,
            order: None,
            limit: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Gte {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Lte {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in(mut self, field: impl Into<String>, values: Vec<String>) -> Self {
        self.filters.push(Filter::In {
            field: field.into(),
            values,
        });
        self
    }

    pub fn search(mut self, term: impl Into<String>, fields: &[&str]) -> Self {
        self.search = Some(TextSearch {
            term: term.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
        self
    }

    pub fn order(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            field: field.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Relational store collaborator. Implementations must be cheap to share
/// across concurrent requests.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Run a filtered read. Errors carry the backend's message verbatim.
    async fn select(&self, query: &TableQuery) -> anyhow::Result<Vec<Row>>;

    /// Resolve a caller access token to a user id. `None` means no valid session.
    async fn resolve_session(&self, access_token: &str) -> anyhow::Result<Option<String>>;
}

/// String form of an id-like JSON value. Null and structured values have none.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
