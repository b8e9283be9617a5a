//! Filter/query executor.
//!
//! Builds one capped, sorted query per report, then resolves the report's
//! reference lookups in a second pass: one batched query per reference table,
//! issued concurrently, merged onto fresh copies of the rows.

use crate::enrich::collect_ids;
use crate::error::ExportError;
use crate::registry::{self, Lookup, ReportDefinition};
use crate::report::{ReportFilters, Row, SortSpec, MAX_EXPORT_ROWS};
use crate::store::{id_string, Store, TableQuery};
use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Run the report named `report` for `org_id`.
///
/// Unknown report types fail before the store is touched. At most
/// [`MAX_EXPORT_ROWS`] rows come back, ordered by the requested sort.
pub async fn run_report(
    store: &dyn Store,
    org_id: &str,
    report: &str,
    filters: &ReportFilters,
    sort: &SortSpec,
) -> Result<Vec<Row>, ExportError> {
    let definition = registry::resolve(report)?;
    let query = build_query(definition, org_id, filters, sort);

    let rows = store.select(&query).await?;
    debug!(
        "Report {} for org {}: {} rows (cap {})",
        definition.report,
        org_id,
        rows.len(),
        MAX_EXPORT_ROWS
    );

    Ok(join_references(store, definition, org_id, rows).await?)
}

/// The primary query: org scope, report equality filters, then the shared
/// date range and search filters, sort and row cap.
pub fn build_query(
    definition: &ReportDefinition,
    org_id: &str,
    filters: &ReportFilters,
    sort: &SortSpec,
) -> TableQuery {
    let mut query = TableQuery::new(definition.table).eq("org_id", org_id);

    for field in definition.equality_filters {
        if let Some(value) = filters.equality(field) {
            query = query.eq(*field, value);
        }
    }

    if let Some(from) = filters.date_from() {
        query = query.gte(definition.date_field, from);
    }
    if let Some(to) = filters.date_to() {
        query = query.lte(definition.date_field, to);
    }
    if let Some(term) = filters.search() {
        query = query.search(term, definition.search_fields);
    }

    query
        .order(sort.field(), sort.ascending())
        .limit(MAX_EXPORT_ROWS)
}

async fn join_references(
    store: &dyn Store,
    definition: &ReportDefinition,
    org_id: &str,
    rows: Vec<Row>,
) -> Result<Vec<Row>> {
    if definition.lookups.is_empty() || rows.is_empty() {
        return Ok(rows);
    }

    let resolved = try_join_all(
        definition
            .lookups
            .iter()
            .map(|lookup| fetch_lookup(store, org_id, &rows, lookup)),
    )
    .await?;

    Ok(rows
        .iter()
        .map(|row| apply_lookups(row, definition.lookups, &resolved))
        .collect())
}

/// id → reference row for one lookup. No ids means no query.
async fn fetch_lookup(
    store: &dyn Store,
    org_id: &str,
    rows: &[Row],
    lookup: &Lookup,
) -> Result<HashMap<String, Row>> {
    let ids = collect_ids(rows, &[lookup.foreign_key]);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let query = TableQuery::new(lookup.table)
        .columns(lookup.columns())
        .eq("org_id", org_id)
        .is_in("id", ids);
    let refs = store
        .select(&query)
        .await
        .with_context(|| format!("Failed to resolve {} references", lookup.table))?;

    Ok(refs
        .into_iter()
        .filter_map(|r| Some((r.get("id").and_then(id_string)?, r)))
        .collect())
}

fn apply_lookups(row: &Row, lookups: &[Lookup], resolved: &[HashMap<String, Row>]) -> Row {
    let mut joined = row.clone();
    for (lookup, by_id) in lookups.iter().zip(resolved) {
        let reference = row
            .get(lookup.foreign_key)
            .and_then(id_string)
            .and_then(|id| by_id.get(&id));
        for (source, target) in lookup.fields {
            let value = reference
                .and_then(|r| r.get(*source))
                .cloned()
                .unwrap_or(Value::Null);
            joined.insert(target.to_string(), value);
        }
    }
    joined
}
