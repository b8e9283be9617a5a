//! Report registrations.
//!
//! One [`ReportDefinition`] per report type describes everything the pipeline
//! needs: where rows come from, how they are filtered, which foreign keys get
//! resolved and which schema renders them. Adding a report means adding one
//! entry here and its schema constructor.

use crate::error::ExportError;
use crate::report::{Locale, ReportType};
use crate::schema::{self, ReportSchema};

/// A batched id → fields join against a reference table.
#[derive(Debug)]
pub struct Lookup {
    pub table: &'static str,
    /// Field on the report row holding the referenced id.
    pub foreign_key: &'static str,
    /// `(source field on the reference row, target field on the report row)`.
    pub fields: &'static [(&'static str, &'static str)],
}

impl Lookup {
    /// PostgREST `select` list: the id plus every copied field.
    pub fn columns(&self) -> String {
        std::iter::once("id")
            .chain(self.fields.iter().map(|(source, _)| *source))
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub struct ReportDefinition {
    pub report: ReportType,
    pub table: &'static str,
    /// Column the `date_from` / `date_to` range applies to.
    pub date_field: &'static str,
    /// Fields searched (OR-combined) by the `search` filter.
    pub search_fields: &'static [&'static str],
    /// Request equality filters this report honours.
    pub equality_filters: &'static [&'static str],
    pub lookups: &'static [Lookup],
    /// Fields holding user ids resolved to display names.
    pub user_fields: &'static [&'static str],
    pub schema: fn(Locale) -> ReportSchema,
}

const QUEUES: Lookup = Lookup {
    table: "queues",
    foreign_key: "queue_id",
    fields: &[("name", "queue_name")],
};

const CONTACTS: Lookup = Lookup {
    table: "contacts",
    foreign_key: "contact_id",
    fields: &[("full_name", "contact_name")],
};

const CASES: Lookup = Lookup {
    table: "cases",
    foreign_key: "case_id",
    fields: &[("case_number", "case_number"), ("title", "case_title")],
};

static DEFINITIONS: [ReportDefinition; 5] = [
    ReportDefinition {
        report: ReportType::Cases,
        table: "cases",
        date_field: "created_at",
        search_fields: &["title", "description"],
        equality_filters: &["status", "priority", "queue_id"],
        lookups: &[QUEUES, CONTACTS],
        user_fields: &["assigned_to", "created_by"],
        schema: schema::cases_schema,
    },
    ReportDefinition {
        report: ReportType::Activities,
        table: "case_activities",
        date_field: "created_at",
        search_fields: &["description"],
        equality_filters: &[],
        lookups: &[CASES],
        user_fields: &["created_by"],
        schema: schema::activities_schema,
    },
    ReportDefinition {
        report: ReportType::Contacts,
        table: "contacts",
        date_field: "created_at",
        search_fields: &["full_name", "email", "phone", "company"],
        equality_filters: &[],
        lookups: &[],
        user_fields: &[],
        schema: schema::contacts_schema,
    },
    ReportDefinition {
        report: ReportType::Audit,
        table: "audit_logs",
        date_field: "created_at",
        search_fields: &["action", "entity_type"],
        equality_filters: &[],
        lookups: &[],
        user_fields: &["actor_user_id"],
        schema: schema::audit_schema,
    },
    ReportDefinition {
        report: ReportType::Calendar,
        table: "calendar_events",
        date_field: "start_at",
        search_fields: &["title", "description", "location"],
        equality_filters: &[],
        lookups: &[CASES],
        user_fields: &["created_by"],
        schema: schema::calendar_schema,
    },
];

pub fn definition(report: ReportType) -> &'static ReportDefinition {
    match report {
        ReportType::Cases => &DEFINITIONS[0],
        ReportType::Activities => &DEFINITIONS[1],
        ReportType::Contacts => &DEFINITIONS[2],
        ReportType::Audit => &DEFINITIONS[3],
        ReportType::Calendar => &DEFINITIONS[4],
    }
}

/// Resolve a wire identifier, failing with the offending name when unknown.
pub fn resolve(report: &str) -> Result<&'static ReportDefinition, ExportError> {
    ReportType::parse(report)
        .map(definition)
        .ok_or_else(|| ExportError::UnknownReport(report.to_string()))
}
