//! The export pipeline: validate, authorize, query, enrich, summarize, render.

use crate::auth::{assert_can_export, CallerSession};
use crate::enrich::enrich_users;
use crate::error::ExportError;
use crate::query::run_report;
use crate::registry;
use crate::render::{render, RenderMeta};
use crate::report::{ExportRequest, Locale};
use crate::schema::get_schema;
use crate::store::{Store, TableQuery};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// A rendered report ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub row_count: usize,
}

/// Run one export end to end.
///
/// Missing `orgId`/`report` fail before the store is touched, and the
/// membership check runs before the report type is dispatched.
pub async fn export_report(
    store: &dyn Store,
    session: Option<&CallerSession>,
    request: ExportRequest,
    locale: Locale,
) -> Result<ExportedReport, ExportError> {
    let org_id = required(&request.org_id, "orgId")?;
    let report = required(&request.report, "report")?;

    let export_id = format!("exp_{}", Uuid::new_v4().simple());
    debug!("Export {}: {} for org {} ({:?})", export_id, report, org_id, locale);

    let access = assert_can_export(store, session, org_id).await?;

    let rows = run_report(store, org_id, report, &request.filters, &request.sort).await?;
    let definition = registry::resolve(report)?;

    let (rows, org_name) = tokio::try_join!(
        enrich_users(store, &rows, definition.user_fields),
        fetch_org_name(store, org_id),
    )?;

    let schema = get_schema(report, locale);
    let keys: Vec<&str> = schema.columns.iter().map(|c| c.key).collect();
    debug!("Export {}: {} rows into columns {:?}", export_id, rows.len(), keys);
    let summaries = schema.summarize(&rows);
    let meta = RenderMeta {
        org_name,
        locale,
        generated_at: Utc::now(),
        date_from: request.filters.date_from().map(str::to_string),
        date_to: request.filters.date_to().map(str::to_string),
    };

    let row_count = rows.len();
    let bytes = tokio::task::spawn_blocking(move || render(&schema, &rows, &summaries, &meta))
        .await
        .map_err(|e| ExportError::Render(e.to_string()))?
        .map_err(|e| ExportError::Render(e.to_string()))?;

    info!(
        "Export {} done: user={} role={} report={} rows={} bytes={}",
        export_id,
        access.user_id,
        access.role,
        report,
        row_count,
        bytes.len()
    );

    Ok(ExportedReport {
        filename: format!("caseflow_{}_report.xlsx", report),
        bytes,
        row_count,
    })
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ExportError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ExportError::MissingField(field))
}

/// Organization display name for the metadata block; falls back to the id.
async fn fetch_org_name(store: &dyn Store, org_id: &str) -> Result<String> {
    let query = TableQuery::new("organizations")
        .columns("id,name")
        .eq("id", org_id)
        .limit(1);
    let org = store
        .select(&query)
        .await
        .context("Failed to load organization")?;

    Ok(org
        .first()
        .and_then(|o| o.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| org_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use calamine::{open_workbook_from_rs, Reader, Xlsx};
    use serde_json::json;
    use std::io::Cursor;

    fn session() -> CallerSession {
        CallerSession {
            access_token: "token-dana".to_string(),
        }
    }

    fn request(json: Value) -> ExportRequest {
        serde_json::from_value(json).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_session("token-dana", "u-1")
            .with_table(
                "org_members",
                vec![json!({"org_id": "org-1", "user_id": "u-1", "role": "admin", "is_active": true})],
            )
            .with_table("organizations", vec![json!({"id": "org-1", "name": "Acme Support"})])
            .with_table(
                "profiles",
                vec![json!({"id": "u-1", "full_name": "Dana Levi", "email": "dana@example.com"})],
            )
            .with_table(
                "cases",
                vec![
                    json!({"id": "k-1", "org_id": "org-1", "case_number": 1, "title": "Printer jam",
                           "status": "new", "priority": "high", "assigned_to": "u-1",
                           "created_at": "2026-01-05T10:00:00Z"}),
                    json!({"id": "k-2", "org_id": "org-1", "case_number": 2, "title": "Login issue",
                           "status": "new", "priority": "low", "assigned_to": null,
                           "created_at": "2026-01-06T10:00:00Z"}),
                    json!({"id": "k-9", "org_id": "org-2", "case_number": 9, "title": "Elsewhere",
                           "status": "closed", "priority": "low", "created_at": "2026-01-07T10:00:00Z"}),
                ],
            )
            .with_table(
                "contacts",
                vec![json!({"id": "c-1", "org_id": "org-1", "full_name": "Noa Cohen",
                            "created_at": "2026-01-01T00:00:00Z"})],
            )
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_before_store() {
        let store = store();
        for body in [
            json!({"report": "cases"}),
            json!({"orgId": "", "report": "cases"}),
            json!({"orgId": "org-1"}),
        ] {
            let err = export_report(&store, Some(&session()), request(body), Locale::En)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, ExportError::MissingField(_)));
        }
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_gate_runs_before_dispatch() {
        let store = store();
        let err = export_report(
            &store,
            None,
            request(json!({"orgId": "org-1", "report": "not_a_real_type"})),
            Locale::En,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::Unauthenticated));
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_report_after_gate() {
        let store = store();
        let err = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-1", "report": "not_a_real_type"})),
            Locale::En,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::UnknownReport(_)));
        assert_eq!(store.queried_tables(), vec!["org_members"]);
    }

    #[tokio::test]
    async fn test_non_member_denied() {
        let store = store();
        let err = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-2", "report": "cases"})),
            Locale::En,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::NoAccess(_)));
        assert!(!store.queried_tables().contains(&"cases".to_string()));
    }

    #[tokio::test]
    async fn test_cases_export_end_to_end() {
        let store = store();
        let exported = export_report(
            &store,
            Some(&session()),
            request(json!({
                "orgId": "org-1",
                "report": "cases",
                "sort": {"field": "case_number", "dir": "asc"}
            })),
            Locale::En,
        )
        .await
        .unwrap();

        assert_eq!(exported.filename, "caseflow_cases_report.xlsx");
        assert_eq!(exported.row_count, 2);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(exported.bytes)).unwrap();
        let range = workbook.worksheet_range("Cases").unwrap();
        let cell = |r: u32, c: u32| range.get_value((r, c)).map(|d| d.to_string()).unwrap_or_default();

        assert_eq!(cell(2, 1), "Acme Support");
        assert_eq!(cell(5, 1), "2");
        // Status breakdown: New 2, the rest zero-filled.
        assert_eq!(cell(8, 0), "New");
        assert_eq!(cell(8, 1), "2");
        assert_eq!(cell(11, 0), "Closed");
        assert_eq!(cell(11, 1), "0");
        // Header at row 19, then data sorted by case number.
        assert_eq!(cell(20, 1), "Printer jam");
        assert_eq!(cell(20, 7), "Dana Levi");
        assert_eq!(cell(21, 7), "—");
    }

    fn three_case_store() -> MemoryStore {
        let case = |n: u32, status: &str, priority: &str| {
            json!({"id": format!("k-{}", n), "org_id": "org-1", "case_number": n,
                   "title": format!("Case {}", n), "status": status, "priority": priority,
                   "created_at": format!("2026-02-0{}T09:00:00Z", n)})
        };
        MemoryStore::new()
            .with_session("token-dana", "u-1")
            .with_table(
                "org_members",
                vec![json!({"org_id": "org-1", "user_id": "u-1", "role": "admin", "is_active": true})],
            )
            .with_table(
                "cases",
                vec![case(1, "new", "high"), case(2, "new", "urgent"), case(3, "resolved", "low")],
            )
    }

    #[tokio::test]
    async fn test_three_cases_status_and_priority_summaries() {
        let store = three_case_store();
        let exported = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-1", "report": "cases"})),
            Locale::En,
        )
        .await
        .unwrap();
        assert_eq!(exported.row_count, 3);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(exported.bytes)).unwrap();
        let range = workbook.worksheet_range("Cases").unwrap();
        let pair = |r: u32| {
            let text = |c: u32| range.get_value((r, c)).map(|d| d.to_string()).unwrap_or_default();
            (text(0), text(1))
        };

        let status: Vec<_> = (8..12).map(pair).collect();
        assert_eq!(
            status,
            vec![
                ("New".to_string(), "2".to_string()),
                ("In Progress".to_string(), "0".to_string()),
                ("Resolved".to_string(), "1".to_string()),
                ("Closed".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(pair(13).0, "Priority Breakdown");
        let priority: Vec<_> = (14..18).map(pair).collect();
        assert_eq!(
            priority,
            vec![
                ("Low".to_string(), "1".to_string()),
                ("Normal".to_string(), "0".to_string()),
                ("High".to_string(), "1".to_string()),
                ("Urgent".to_string(), "1".to_string()),
            ]
        );

        // Header on row 19, exactly three data rows after it.
        assert_eq!(pair(19).0, "Case #");
        for r in 20..23 {
            assert!(!pair(r).1.is_empty(), "row {} should hold a case", r);
        }
        assert_eq!(pair(23), (String::new(), String::new()));
    }

    #[tokio::test]
    async fn test_three_cases_in_hebrew_read_right_to_left() {
        use std::io::Read;

        let store = three_case_store();
        let exported = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-1", "report": "cases"})),
            Locale::He,
        )
        .await
        .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(exported.bytes.clone())).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains(r#"rightToLeft="1""#));

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(exported.bytes)).unwrap();
        let range = workbook.worksheet_range("פניות").unwrap();
        let text = |r: u32, c: u32| range.get_value((r, c)).map(|d| d.to_string()).unwrap_or_default();
        assert_eq!(text(19, 2), "סטטוס");
        assert_eq!(text(8, 0), "חדש");
        assert_eq!(text(8, 1), "2");
    }

    #[tokio::test]
    async fn test_contacts_skip_user_lookup_and_fall_back_to_org_id() {
        let store = store().with_table(
            "org_members",
            vec![json!({"org_id": "org-3", "user_id": "u-1", "role": "agent", "is_active": true})],
        );
        let exported = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-3", "report": "contacts"})),
            Locale::He,
        )
        .await
        .unwrap();

        assert_eq!(exported.row_count, 0);
        assert!(!store.queried_tables().contains(&"profiles".to_string()));

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(exported.bytes)).unwrap();
        let range = workbook.worksheet_range("אנשי קשר").unwrap();
        assert_eq!(range.get_value((2, 1)).map(|d| d.to_string()).unwrap_or_default(), "org-3");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = store().failing_table("organizations");
        let err = export_report(
            &store,
            Some(&session()),
            request(json!({"orgId": "org-1", "report": "cases"})),
            Locale::En,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ExportError::Store(_)));
    }
}
