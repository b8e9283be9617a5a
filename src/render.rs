//! Spreadsheet rendering for report exports.
//!
//! One worksheet, top to bottom: merged title, metadata pairs, optional
//! summary blocks, the table header and the zebra-striped data rows. The
//! header row position depends on how many summary rows precede it.

use crate::report::{Locale, Row};
use crate::schema::{parse_timestamp, CellType, CellValue, ReportSchema};
use crate::style::{
    Styles, HEADER_ROW_HEIGHT, MAX_CELL_CHARS, METADATA_MIN_WIDTHS, TITLE_MIN_COLUMNS,
    TITLE_ROW_HEIGHT,
};
use crate::summary::SummaryBlock;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

/// First metadata row; row 1 stays blank under the title.
const METADATA_FIRST_ROW: u32 = 2;
const METADATA_ROWS: u32 = 4;

/// Request context shown in the metadata block.
#[derive(Debug, Clone)]
pub struct RenderMeta {
    pub org_name: String,
    pub locale: Locale,
    pub generated_at: DateTime<Utc>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Render the report to `.xlsx` bytes.
pub fn render(
    schema: &ReportSchema,
    rows: &[Row],
    summaries: &[SummaryBlock],
    meta: &RenderMeta,
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_sheet(sheet, schema, rows, summaries, meta)?;
    workbook.save_to_buffer()
}

/// Zero-based index of the table header row.
pub fn header_row(summaries: &[SummaryBlock]) -> u32 {
    let summary_rows: u32 = summaries
        .iter()
        .map(|block| block.items.len() as u32 + 2)
        .sum();
    METADATA_FIRST_ROW + METADATA_ROWS + 1 + summary_rows
}

fn write_sheet(
    sheet: &mut Worksheet,
    schema: &ReportSchema,
    rows: &[Row],
    summaries: &[SummaryBlock],
    meta: &RenderMeta,
) -> Result<(), XlsxError> {
    let styles = Styles::new(meta.locale);
    let column_count = schema.columns.len().max(1) as u16;

    sheet.set_name(&schema.sheet_name)?;
    sheet.set_right_to_left(meta.locale.is_rtl());

    // Title
    let title_last_col = column_count.max(TITLE_MIN_COLUMNS) - 1;
    sheet.merge_range(0, 0, 0, title_last_col, &schema.title, &styles.title)?;
    sheet.set_row_height(0, TITLE_ROW_HEIGHT)?;

    // Metadata
    let labels = MetaLabels::for_locale(meta.locale);
    let mut row = METADATA_FIRST_ROW;
    let pairs = [
        (labels.organization, meta.org_name.clone()),
        (labels.generated, format_generated(meta.generated_at, meta.locale)),
        (labels.date_range, describe_range(meta)),
    ];
    for (label, value) in pairs {
        sheet.write_string_with_format(row, 0, label, &styles.meta_label)?;
        sheet.write_string_with_format(row, 1, clamp_text(&value), &styles.meta_value)?;
        row += 1;
    }
    sheet.write_string_with_format(row, 0, labels.total_rows, &styles.meta_label)?;
    sheet.write_number_with_format(row, 1, rows.len() as f64, &styles.meta_value)?;

    row = METADATA_FIRST_ROW + METADATA_ROWS + 1;

    // Summary blocks, each followed by a blank row
    for block in summaries {
        sheet.write_string_with_format(row, 0, clamp_text(&block.title), &styles.summary_title)?;
        row += 1;
        for (label, count) in &block.items {
            sheet.write_string_with_format(row, 0, clamp_text(label), &styles.summary_label)?;
            sheet.write_number_with_format(row, 1, *count as f64, &styles.summary_value)?;
            row += 1;
        }
        row += 1;
    }

    // Table header
    let header = header_row(summaries);
    debug_assert_eq!(row, header);
    for (col, column) in schema.columns.iter().enumerate() {
        sheet.write_string_with_format(header, col as u16, clamp_text(&column.header), &styles.header)?;
    }
    sheet.set_row_height(header, HEADER_ROW_HEIGHT)?;

    // Data rows
    for (index, data) in rows.iter().enumerate() {
        let row = header + 1 + index as u32;
        let striped = index % 2 == 1;
        for (col, column) in schema.columns.iter().enumerate() {
            let value = column.value(data);
            let format = match value {
                CellValue::Date(_) => styles.data(CellType::Date, striped),
                _ => styles.data(column.cell_type, striped),
            };
            write_cell(sheet, row, col as u16, value, format)?;
        }
    }

    let last_row = header + rows.len() as u32;
    sheet.autofilter(header, 0, last_row, column_count - 1)?;
    sheet.set_freeze_panes(header + 1, 0)?;

    // Column widths
    let width_count = schema.columns.len().max(METADATA_MIN_WIDTHS.len());
    for col in 0..width_count {
        let schema_width = schema.columns.get(col).map(|c| c.width).unwrap_or(0.0);
        let min_width = METADATA_MIN_WIDTHS.get(col).copied().unwrap_or(0.0);
        sheet.set_column_width(col as u16, schema_width.max(min_width))?;
    }

    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: CellValue,
    format: &Format,
) -> Result<(), XlsxError> {
    match value {
        CellValue::Text(s) => {
            sheet.write_string_with_format(row, col, clamp_text(&s), format)?;
        }
        CellValue::Number(n) if n.is_finite() => {
            sheet.write_number_with_format(row, col, n, format)?;
        }
        CellValue::Number(n) => {
            sheet.write_string_with_format(row, col, n.to_string(), format)?;
        }
        CellValue::Date(dt) => {
            sheet.write_number_with_format(row, col, excel_serial(&dt), format)?;
        }
        CellValue::Empty => {
            sheet.write_blank(row, col, format)?;
        }
    }
    Ok(())
}

/// Excel serial date (days since 1899-12-30, fractional time of day).
fn excel_serial(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / 86_400_000.0 + 25_569.0
}

fn clamp_text(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        s.to_string()
    } else {
        s.chars().take(MAX_CELL_CHARS).collect()
    }
}

// ============================================================================
// Metadata text
// ============================================================================

struct MetaLabels {
    organization: &'static str,
    generated: &'static str,
    date_range: &'static str,
    total_rows: &'static str,
    all_time: &'static str,
    from: &'static str,
    until: &'static str,
}

impl MetaLabels {
    fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::En => Self {
                organization: "Organization",
                generated: "Generated",
                date_range: "Date range",
                total_rows: "Total rows",
                all_time: "All time",
                from: "From",
                until: "Until",
            },
            Locale::He => Self {
                organization: "ארגון",
                generated: "הופק בתאריך",
                date_range: "טווח תאריכים",
                total_rows: "סה״כ שורות",
                all_time: "כל הזמנים",
                from: "מתאריך",
                until: "עד תאריך",
            },
        }
    }
}

fn format_generated(at: DateTime<Utc>, locale: Locale) -> String {
    at.format(locale.pick("%Y-%m-%d %H:%M", "%d/%m/%Y %H:%M"))
        .to_string()
}

fn format_day(raw: &str, locale: Locale) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format(locale.pick("%Y-%m-%d", "%d/%m/%Y")).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn describe_range(meta: &RenderMeta) -> String {
    let labels = MetaLabels::for_locale(meta.locale);
    let from = meta.date_from.as_deref().map(|d| format_day(d, meta.locale));
    let to = meta.date_to.as_deref().map(|d| format_day(d, meta.locale));
    match (from, to) {
        (Some(from), Some(to)) => format!("{} – {}", from, to),
        (Some(from), None) => format!("{} {}", labels.from, from),
        (None, Some(to)) => format!("{} {}", labels.until, to),
        (None, None) => labels.all_time.to_string(),
    }
}
