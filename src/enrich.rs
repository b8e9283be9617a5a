//! User reference enrichment.
//!
//! Resolves user id fields to display names with one batched lookup and adds a
//! `<field>_name` sibling for each named field. Report-agnostic: callers pass
//! the field names, this module knows nothing about which report asked.

use crate::report::Row;
use crate::store::{id_string, Store, TableQuery};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const PROFILES_TABLE: &str = "profiles";

/// Distinct non-null ids found in `fields` across all rows, sorted.
pub fn collect_ids(rows: &[Row], fields: &[&str]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| fields.iter().filter_map(|f| row.get(*f).and_then(id_string)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Return new rows carrying `<field>_name` for every field in `user_fields`.
///
/// Unresolved ids fall back to the raw id; null fields get a null name. When
/// no row references a user no lookup is issued and the rows come back as-is.
pub async fn enrich_users(store: &dyn Store, rows: &[Row], user_fields: &[&str]) -> Result<Vec<Row>> {
    let ids = collect_ids(rows, user_fields);
    if ids.is_empty() {
        return Ok(rows.to_vec());
    }

    debug!("Resolving {} user ids for fields {:?}", ids.len(), user_fields);

    let query = TableQuery::new(PROFILES_TABLE)
        .columns("id,full_name,email")
        .is_in("id", ids);
    let profiles = store
        .select(&query)
        .await
        .context("Failed to resolve user names")?;

    let names: HashMap<String, String> = profiles
        .iter()
        .filter_map(|p| {
            let id = p.get("id").and_then(id_string)?;
            let name = display_name(p).unwrap_or_else(|| id.clone());
            Some((id, name))
        })
        .collect();

    Ok(rows
        .iter()
        .map(|row| with_user_names(row, user_fields, &names))
        .collect())
}

fn with_user_names(row: &Row, user_fields: &[&str], names: &HashMap<String, String>) -> Row {
    let mut enriched = row.clone();
    for field in user_fields {
        let name = match row.get(*field).and_then(id_string) {
            Some(id) => Value::String(names.get(&id).cloned().unwrap_or(id)),
            None => Value::Null,
        };
        enriched.insert(format!("{}_name", field), name);
    }
    enriched
}

fn display_name(profile: &Row) -> Option<String> {
    ["full_name", "email"].iter().find_map(|field| {
        profile
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
