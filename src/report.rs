//! Export request types shared by every pipeline stage.

use serde::Deserialize;
use std::fmt;

/// A plain record fetched from the store. Enrichment adds derived display
/// fields next to the raw foreign keys.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Hard cap on rows fetched (and therefore rendered) per export.
pub const MAX_EXPORT_ROWS: usize = 5000;

/// Default sort column when the request names none (or an invalid one).
pub const DEFAULT_SORT_FIELD: &str = "created_at";

/// The entity domains the export engine can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    Cases,
    Activities,
    Contacts,
    Audit,
    Calendar,
}

impl ReportType {
    pub const ALL: [ReportType; 5] = [
        Self::Cases,
        Self::Activities,
        Self::Contacts,
        Self::Audit,
        Self::Calendar,
    ];

    /// Parse the wire identifier used in request bodies.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|report| report.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Activities => "activities",
            Self::Contacts => "contacts",
            Self::Audit => "audit",
            Self::Calendar => "calendar",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output language. Hebrew also flips the sheet to right-to-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    He,
}

impl Locale {
    /// Resolve the locale hint header. Anything but `he` is English.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("he") => Self::He,
            _ => Self::En,
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Self::He)
    }

    /// Pick the string for this locale from an English/Hebrew pair.
    pub fn pick<'a>(&self, en: &'a str, he: &'a str) -> &'a str {
        match self {
            Self::En => en,
            Self::He => he,
        }
    }
}

/// JSON body of `POST /api/reports/export`.
///
/// `org_id` and `report` are optional at the serde level so that a missing
/// value surfaces as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub filters: ReportFilters,
    #[serde(default)]
    pub sort: SortSpec,
}

/// Shared and report-specific filters. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub queue_id: Option<String>,
}

impl ReportFilters {
    pub fn date_from(&self) -> Option<&str> {
        non_empty(&self.date_from)
    }

    pub fn date_to(&self) -> Option<&str> {
        non_empty(&self.date_to)
    }

    pub fn search(&self) -> Option<&str> {
        non_empty(&self.search)
    }

    /// Value of a named equality filter, if the request carries one.
    pub fn equality(&self, field: &str) -> Option<&str> {
        match field {
            "status" => non_empty(&self.status),
            "priority" => non_empty(&self.priority),
            "queue_id" => non_empty(&self.queue_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

impl SortSpec {
    /// Requested sort column, falling back to `created_at` when absent or not
    /// a plain column identifier.
    pub fn field(&self) -> &str {
        match non_empty(&self.field) {
            Some(field) if is_identifier(field) => field,
            Some(field) => {
                tracing::warn!("Ignoring invalid sort field {:?}", field);
                DEFAULT_SORT_FIELD
            }
            None => DEFAULT_SORT_FIELD,
        }
    }

    pub fn ascending(&self) -> bool {
        non_empty(&self.dir)
            .map(|d| d.eq_ignore_ascii_case("asc"))
            .unwrap_or(false)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_identifier(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
