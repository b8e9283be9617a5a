//! Schema registry: per-report titles, ordered columns and summary generators.
//!
//! Schemas are built per report type and locale and never mutated afterwards.
//! Column value functions are total: nothing a row can contain makes them
//! fail, absent values become an em-dash and objects their JSON text.

use crate::registry;
use crate::report::{Locale, ReportType, Row};
use crate::summary::{breakdown, SummaryBlock};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Placeholder for absent scalar values.
pub const EMPTY_PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Text,
    Date,
}

/// A single rendered cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Empty,
}

pub type ValueFn = Box<dyn Fn(&Row) -> CellValue + Send + Sync>;
pub type SummaryFn = Box<dyn Fn(&[Row]) -> Vec<SummaryBlock> + Send + Sync>;

pub struct ColumnDef {
    pub key: &'static str,
    pub header: String,
    pub width: f64,
    pub cell_type: CellType,
    value: ValueFn,
}

impl ColumnDef {
    pub fn new(
        key: &'static str,
        header: &str,
        width: f64,
        cell_type: CellType,
        value: impl Fn(&Row) -> CellValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            header: header.to_string(),
            width,
            cell_type,
            value: Box::new(value),
        }
    }

    /// Plain field rendered through [`display_value`].
    fn text(key: &'static str, header: &str, width: f64, locale: Locale) -> Self {
        Self::new(key, header, width, CellType::Text, move |row| {
            display_value(row.get(key), locale)
        })
    }

    /// Timestamp field; yields a date or an empty cell.
    fn date(key: &'static str, header: &str, width: f64) -> Self {
        Self::new(key, header, width, CellType::Date, move |row| {
            date_value(row.get(key))
        })
    }

    /// Categorical field translated through a static label map.
    fn labelled(
        key: &'static str,
        header: &str,
        width: f64,
        labels: &'static [Label],
        locale: Locale,
    ) -> Self {
        Self::new(key, header, width, CellType::Text, move |row| {
            match row.get(key) {
                Some(Value::String(raw)) => CellValue::Text(translate(labels, raw, locale)),
                other => display_value(other, locale),
            }
        })
    }

    pub fn value(&self, row: &Row) -> CellValue {
        (self.value)(row)
    }
}

pub struct ReportSchema {
    pub title: String,
    pub sheet_name: String,
    pub columns: Vec<ColumnDef>,
    pub summary: Option<SummaryFn>,
}

impl ReportSchema {
    /// Summary blocks for `rows`; empty when the report defines none.
    pub fn summarize(&self, rows: &[Row]) -> Vec<SummaryBlock> {
        self.summary.as_ref().map(|f| f(rows)).unwrap_or_default()
    }
}

/// Look up the schema for a report identifier. Unknown identifiers get a
/// one-column placeholder schema rather than an error.
pub fn get_schema(report: &str, locale: Locale) -> ReportSchema {
    match ReportType::parse(report) {
        Some(report) => (registry::definition(report).schema)(locale),
        None => empty_schema(locale),
    }
}

fn empty_schema(locale: Locale) -> ReportSchema {
    ReportSchema {
        title: locale.pick("Report", "דוח").to_string(),
        sheet_name: locale.pick("Report", "דוח").to_string(),
        columns: vec![ColumnDef::text("value", locale.pick("Value", "ערך"), 30.0, locale)],
        summary: None,
    }
}

// ============================================================================
// Value coercion
// ============================================================================

/// Coerce any JSON value to a cell: absent → em-dash, booleans → Yes/No,
/// numbers stay numeric, objects and arrays → JSON text.
pub fn display_value(value: Option<&Value>, locale: Locale) -> CellValue {
    match value {
        None | Some(Value::Null) => CellValue::Text(EMPTY_PLACEHOLDER.to_string()),
        Some(Value::Bool(b)) => {
            let text = if *b {
                locale.pick("Yes", "כן")
            } else {
                locale.pick("No", "לא")
            };
            CellValue::Text(text.to_string())
        }
        Some(Value::Number(n)) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        Some(Value::String(s)) => CellValue::Text(s.clone()),
        Some(other) => CellValue::Text(other.to_string()),
    }
}

/// Date cells carry a parsed timestamp or nothing, never preformatted text.
pub fn date_value(value: Option<&Value>) -> CellValue {
    value
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .map(CellValue::Date)
        .unwrap_or(CellValue::Empty)
}

/// Parse the timestamp shapes the store emits, normalised to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ============================================================================
// Label maps
// ============================================================================

/// Display labels for one stored categorical value.
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub raw: &'static str,
    pub en: &'static str,
    pub he: &'static str,
}

const fn label(raw: &'static str, en: &'static str, he: &'static str) -> Label {
    Label { raw, en, he }
}

/// Translate a stored value; unmapped values render as themselves.
pub fn translate(labels: &[Label], raw: &str, locale: Locale) -> String {
    labels
        .iter()
        .find(|l| l.raw == raw)
        .map(|l| locale.pick(l.en, l.he).to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub const CASE_STATUS: &[Label] = &[
    label("new", "New", "חדש"),
    label("in_progress", "In Progress", "בטיפול"),
    label("resolved", "Resolved", "נפתר"),
    label("closed", "Closed", "סגור"),
];

pub const CASE_PRIORITY: &[Label] = &[
    label("low", "Low", "נמוכה"),
    label("normal", "Normal", "רגילה"),
    label("high", "High", "גבוהה"),
    label("urgent", "Urgent", "דחופה"),
];

pub const CASE_SOURCE: &[Label] = &[
    label("email", "Email", "אימייל"),
    label("phone", "Phone", "טלפון"),
    label("web", "Web", "אתר"),
    label("walk_in", "Walk-in", "פנייה פרונטלית"),
    label("other", "Other", "אחר"),
];

pub const ACTIVITY_TYPE: &[Label] = &[
    label("note", "Note", "הערה"),
    label("call", "Call", "שיחה"),
    label("email", "Email", "אימייל"),
    label("status_change", "Status Change", "שינוי סטטוס"),
    label("assignment", "Assignment", "הקצאה"),
    label("meeting", "Meeting", "פגישה"),
];

pub const AUDIT_ACTION: &[Label] = &[
    label("create", "Created", "נוצר"),
    label("update", "Updated", "עודכן"),
    label("delete", "Deleted", "נמחק"),
    label("login", "Signed In", "התחברות"),
    label("export", "Exported", "ייצוא"),
];

pub const EVENT_TYPE: &[Label] = &[
    label("meeting", "Meeting", "פגישה"),
    label("call", "Call", "שיחה"),
    label("deadline", "Deadline", "מועד אחרון"),
    label("reminder", "Reminder", "תזכורת"),
    label("other", "Other", "אחר"),
];

// ============================================================================
// Report schemas
// ============================================================================

pub fn cases_schema(locale: Locale) -> ReportSchema {
    let l = locale;
    ReportSchema {
        title: l.pick("Cases Report", "דוח פניות").to_string(),
        sheet_name: l.pick("Cases", "פניות").to_string(),
        columns: vec![
            ColumnDef::text("case_number", l.pick("Case #", "מס׳ פנייה"), 12.0, l),
            ColumnDef::text("title", l.pick("Title", "כותרת"), 36.0, l),
            ColumnDef::labelled("status", l.pick("Status", "סטטוס"), 14.0, CASE_STATUS, l),
            ColumnDef::labelled("priority", l.pick("Priority", "עדיפות"), 12.0, CASE_PRIORITY, l),
            ColumnDef::labelled("source", l.pick("Source", "מקור"), 14.0, CASE_SOURCE, l),
            ColumnDef::text("queue_name", l.pick("Queue", "תור"), 18.0, l),
            ColumnDef::text("contact_name", l.pick("Contact", "איש קשר"), 22.0, l),
            ColumnDef::text("assigned_to_name", l.pick("Assigned To", "משויך ל"), 22.0, l),
            ColumnDef::text("created_by_name", l.pick("Created By", "נוצר על ידי"), 22.0, l),
            ColumnDef::date("created_at", l.pick("Created", "נוצר"), 20.0),
            ColumnDef::date("updated_at", l.pick("Updated", "עודכן"), 20.0),
        ],
        summary: Some(Box::new(move |rows: &[Row]| {
            vec![
                breakdown(
                    l.pick("Status Breakdown", "פילוח לפי סטטוס"),
                    rows,
                    "status",
                    CASE_STATUS,
                    l,
                ),
                breakdown(
                    l.pick("Priority Breakdown", "פילוח לפי עדיפות"),
                    rows,
                    "priority",
                    CASE_PRIORITY,
                    l,
                ),
            ]
        })),
    }
}

pub fn activities_schema(locale: Locale) -> ReportSchema {
    let l = locale;
    ReportSchema {
        title: l.pick("Activity Report", "דוח פעילויות").to_string(),
        sheet_name: l.pick("Activities", "פעילויות").to_string(),
        columns: vec![
            ColumnDef::text("case_number", l.pick("Case #", "מס׳ פנייה"), 12.0, l),
            ColumnDef::text("case_title", l.pick("Case", "פנייה"), 30.0, l),
            ColumnDef::labelled("activity_type", l.pick("Type", "סוג"), 16.0, ACTIVITY_TYPE, l),
            ColumnDef::text("description", l.pick("Description", "תיאור"), 48.0, l),
            ColumnDef::text("created_by_name", l.pick("By", "בוצע על ידי"), 22.0, l),
            ColumnDef::date("created_at", l.pick("Date", "תאריך"), 20.0),
        ],
        summary: None,
    }
}

pub fn contacts_schema(locale: Locale) -> ReportSchema {
    let l = locale;
    ReportSchema {
        title: l.pick("Contacts Report", "דוח אנשי קשר").to_string(),
        sheet_name: l.pick("Contacts", "אנשי קשר").to_string(),
        columns: vec![
            ColumnDef::text("full_name", l.pick("Name", "שם"), 26.0, l),
            ColumnDef::text("email", l.pick("Email", "אימייל"), 28.0, l),
            ColumnDef::text("phone", l.pick("Phone", "טלפון"), 16.0, l),
            ColumnDef::text("company", l.pick("Company", "חברה"), 22.0, l),
            ColumnDef::text("tags", l.pick("Tags", "תגיות"), 20.0, l),
            ColumnDef::text("notes", l.pick("Notes", "הערות"), 36.0, l),
            ColumnDef::date("created_at", l.pick("Created", "נוצר"), 20.0),
        ],
        summary: None,
    }
}

pub fn audit_schema(locale: Locale) -> ReportSchema {
    let l = locale;
    ReportSchema {
        title: l.pick("Audit Log", "יומן ביקורת").to_string(),
        sheet_name: l.pick("Audit", "ביקורת").to_string(),
        columns: vec![
            ColumnDef::date("created_at", l.pick("Time", "זמן"), 20.0),
            ColumnDef::text("actor_user_id_name", l.pick("User", "משתמש"), 22.0, l),
            ColumnDef::labelled("action", l.pick("Action", "פעולה"), 16.0, AUDIT_ACTION, l),
            ColumnDef::text("entity_type", l.pick("Entity", "ישות"), 16.0, l),
            ColumnDef::text("entity_id", l.pick("Entity ID", "מזהה ישות"), 38.0, l),
            ColumnDef::text("details", l.pick("Details", "פרטים"), 50.0, l),
        ],
        summary: None,
    }
}

pub fn calendar_schema(locale: Locale) -> ReportSchema {
    let l = locale;
    ReportSchema {
        title: l.pick("Calendar Report", "דוח יומן").to_string(),
        sheet_name: l.pick("Calendar", "יומן").to_string(),
        columns: vec![
            ColumnDef::text("title", l.pick("Title", "כותרת"), 30.0, l),
            ColumnDef::labelled("event_type", l.pick("Type", "סוג"), 14.0, EVENT_TYPE, l),
            ColumnDef::date("start_at", l.pick("Start", "התחלה"), 20.0),
            ColumnDef::date("end_at", l.pick("End", "סיום"), 20.0),
            ColumnDef::text("all_day", l.pick("All Day", "כל היום"), 10.0, l),
            ColumnDef::text("location", l.pick("Location", "מיקום"), 22.0, l),
            ColumnDef::text("case_number", l.pick("Case #", "מס׳ פנייה"), 12.0, l),
            ColumnDef::text("created_by_name", l.pick("Organizer", "מארגן"), 22.0, l),
        ],
        summary: None,
    }
}
