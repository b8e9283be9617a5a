//! In-memory [`Store`] for tests. Evaluates the query model the same way the
//! PostgREST backend does and records every query it receives.

use super::{id_string, Filter, Store, TableQuery};
use crate::report::Row;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Row>>,
    sessions: HashMap<String, String>,
    failing: HashSet<String>,
    queries: Mutex<Vec<TableQuery>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table from JSON objects.
    pub fn with_table(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.into_iter().map(row));
        self
    }

    pub fn with_session(mut self, token: &str, user_id: &str) -> Self {
        self.sessions.insert(token.to_string(), user_id.to_string());
        self
    }

    /// Make every read of `table` fail with a backend-style error.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    pub fn queries(&self) -> Vec<TableQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queried_tables(&self) -> Vec<String> {
        self.queries().into_iter().map(|q| q.table).collect()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn select(&self, query: &TableQuery) -> anyhow::Result<Vec<Row>> {
        self.queries.lock().unwrap().push(query.clone());

        if self.failing.contains(&query.table) {
            anyhow::bail!("relation \"{}\" is unavailable", query.table);
        }

        let mut rows: Vec<Row> = self
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.field), b.get(&order.field));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn resolve_session(&self, access_token: &str) -> anyhow::Result<Option<String>> {
        Ok(self.sessions.get(access_token).cloned())
    }
}

/// Build a [`Row`] from a JSON object literal.
pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

fn matches(row: &Row, query: &TableQuery) -> bool {
    let field_str = |field: &str| row.get(field).and_then(id_string);

    let filters_pass = query.filters.iter().all(|filter| match filter {
        Filter::Eq { field, value } => field_str(field).as_deref() == Some(value.as_str()),
        Filter::Gte { field, value } => field_str(field).is_some_and(|v| v.as_str() >= value.as_str()),
        Filter::Lte { field, value } => field_str(field).is_some_and(|v| v.as_str() <= value.as_str()),
        Filter::In { field, values } => field_str(field).is_some_and(|v| values.contains(&v)),
    });

    let search_pass = query.search.as_ref().map_or(true, |search| {
        let needle = search.term.to_lowercase();
        search.fields.iter().any(|field| {
            row.get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle))
        })
    });

    filters_pass && search_pass
}

/// Postgres-like ordering: NULL sorts after every value.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => id_string(x).cmp(&id_string(y)),
    }
}
