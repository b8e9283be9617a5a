//! Supabase client: PostgREST reads and Auth session lookup.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{Filter, Store, TableQuery};
use crate::config::ServiceConfig;
use crate::report::Row;

/// Supabase client authenticated with the service-role key.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            service_role_key: service_role_key.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.supabase_url, &config.service_role_key)
    }

    /// Helper: GET from the Supabase REST API with PostgREST query params.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        params: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .send()
            .await
            .with_context(|| format!("Supabase GET {} failed to send", table))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase GET {} failed: {} - {}", table, status, text));
        }

        resp.json()
            .await
            .with_context(|| format!("Supabase GET {} returned malformed JSON", table))
    }
}

#[async_trait::async_trait]
impl Store for SupabaseClient {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Row>> {
        let params = query_params(query);
        debug!("Supabase select {} {:?}", query.table, params);
        let rows: Vec<Row> = self.get_json(&query.table, &params).await?;
        debug!("Supabase select {} returned {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn resolve_session(&self, access_token: &str) -> Result<Option<String>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .context("Supabase auth lookup failed to send")?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => {
                let text = resp.text().await.unwrap_or_default();
                return Err(anyhow!("Supabase auth lookup failed: {} - {}", status, text));
            }
            _ => {}
        }

        let user: AuthUser = resp
            .json()
            .await
            .context("Supabase auth lookup returned malformed JSON")?;
        Ok(Some(user.id).filter(|id| !id.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

// ============================================================================
// PostgREST query encoding
// ============================================================================

/// Render a [`TableQuery`] as PostgREST query parameters.
fn query_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];

    for filter in &query.filters {
        params.push(match filter {
            Filter::Eq { field, value } => (field.clone(), format!("eq.{}", value)),
            Filter::Gte { field, value } => (field.clone(), format!("gte.{}", value)),
            Filter::Lte { field, value } => (field.clone(), format!("lte.{}", value)),
            Filter::In { field, values } => {
                let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
                (field.clone(), format!("in.({})", list.join(",")))
            }
        });
    }

    if let Some(search) = &query.search {
        let pattern = quote(&format!("*{}*", like_literal(&search.term)));
        let clauses: Vec<String> = search
            .fields
            .iter()
            .map(|f| format!("{}.ilike.{}", f, pattern))
            .collect();
        params.push(("or".to_string(), format!("({})", clauses.join(","))));
    }

    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.field, dir)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Escape LIKE metacharacters so the term matches as a literal substring.
/// PostgREST maps `*` to `%` before the pattern reaches LIKE, so a `*` typed by
/// the user still acts as a wildcard.
fn like_literal(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Double-quote a value for PostgREST list syntax (`in`, `or`), escaping
/// embedded quotes and backslashes so commas and parentheses stay literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_query_params_full() {
        let query = TableQuery::new("cases")
            .eq("org_id", "org-1")
            .eq("status", "new")
            .gte("created_at", "2026-01-01")
            .lte("created_at", "2026-01-31")
            .search("printer", &["title", "description"])
            .order("created_at", false)
            .limit(5000);

        let params = query_params(&query);
        assert_eq!(param(&params, "select"), vec!["*"]);
        assert_eq!(param(&params, "org_id"), vec!["eq.org-1"]);
        assert_eq!(param(&params, "status"), vec!["eq.new"]);
        assert_eq!(
            param(&params, "created_at"),
            vec!["gte.2026-01-01", "lte.2026-01-31"]
        );
        assert_eq!(
            param(&params, "or"),
            vec![r#"(title.ilike."*printer*",description.ilike."*printer*")"#]
        );
        assert_eq!(param(&params, "order"), vec!["created_at.desc"]);
        assert_eq!(param(&params, "limit"), vec!["5000"]);
    }

    #[test]
    fn test_in_list_and_ascending_order() {
        let query = TableQuery::new("profiles")
            .columns("id,full_name,email")
            .is_in("id", vec!["u-1".into(), "u-2".into()])
            .order("full_name", true);

        let params = query_params(&query);
        assert_eq!(param(&params, "select"), vec!["id,full_name,email"]);
        assert_eq!(param(&params, "id"), vec![r#"in.("u-1","u-2")"#]);
        assert_eq!(param(&params, "order"), vec!["full_name.asc"]);
        assert!(param(&params, "limit").is_empty());
    }

    #[test]
    fn test_search_term_is_quoted() {
        let query = TableQuery::new("contacts").search(r#"a,b "c")"#, &["full_name"]);
        let params = query_params(&query);
        assert_eq!(
            param(&params, "or"),
            vec![r#"(full_name.ilike."*a,b \"c\")*")"#]
        );
    }

    #[test]
    fn test_search_term_like_wildcards_are_literal() {
        let query = TableQuery::new("cases").search("in_progress 100%", &["title"]);
        let params = query_params(&query);
        assert_eq!(
            param(&params, "or"),
            vec![r#"(title.ilike."*in\\_progress 100\\%*")"#]
        );
        assert_eq!(like_literal(r"a\b"), r"a\\b");
    }
}
