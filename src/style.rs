//! Visual constants for rendered reports, and the formats built from them.

use crate::report::Locale;
use crate::schema::CellType;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern};

pub const TITLE_FONT_SIZE: f64 = 16.0;
pub const TITLE_FONT_COLOR: u32 = 0x1F4E79;
pub const TITLE_ROW_HEIGHT: f64 = 28.0;
/// The title is merged across at least this many columns.
pub const TITLE_MIN_COLUMNS: u16 = 4;

pub const META_LABEL_COLOR: u32 = 0x595959;
pub const SUMMARY_TITLE_COLOR: u32 = 0x2F75B5;

pub const HEADER_FILL: u32 = 0x2F75B5;
pub const HEADER_FONT_COLOR: u32 = 0xFFFFFF;
pub const HEADER_ROW_HEIGHT: f64 = 22.0;

pub const STRIPE_FILL: u32 = 0xEAF3FB;
pub const DATA_BORDER_COLOR: u32 = 0xD9D9D9;

pub const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm";

/// Minimum widths of the leading columns, which also hold the metadata and
/// summary label/value pairs.
pub const METADATA_MIN_WIDTHS: [f64; 5] = [22.0, 30.0, 18.0, 18.0, 18.0];

/// Excel rejects longer cell strings.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Every format the renderer writes with, built once per document.
pub struct Styles {
    pub title: Format,
    pub meta_label: Format,
    pub meta_value: Format,
    pub summary_title: Format,
    pub summary_label: Format,
    pub summary_value: Format,
    pub header: Format,
    cell: Format,
    cell_striped: Format,
    date: Format,
    date_striped: Format,
}

impl Styles {
    pub fn new(locale: Locale) -> Self {
        // Labels and values hug the reading edge of the sheet.
        let edge = if locale.is_rtl() {
            FormatAlign::Right
        } else {
            FormatAlign::Left
        };

        let title = Format::new()
            .set_bold()
            .set_font_size(TITLE_FONT_SIZE)
            .set_font_color(Color::RGB(TITLE_FONT_COLOR))
            .set_align(edge)
            .set_align(FormatAlign::VerticalCenter);

        let meta_label = Format::new()
            .set_bold()
            .set_font_color(Color::RGB(META_LABEL_COLOR))
            .set_align(edge);
        let meta_value = Format::new().set_align(edge);

        let summary_title = Format::new()
            .set_bold()
            .set_font_color(Color::RGB(SUMMARY_TITLE_COLOR))
            .set_align(edge);
        let summary_label = Format::new().set_align(edge);
        let summary_value = Format::new().set_align(edge);

        let header = Format::new()
            .set_bold()
            .set_font_color(Color::RGB(HEADER_FONT_COLOR))
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_pattern(FormatPattern::Solid)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);

        let cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(DATA_BORDER_COLOR));
        let cell_striped = cell
            .clone()
            .set_background_color(Color::RGB(STRIPE_FILL))
            .set_pattern(FormatPattern::Solid);
        let date = cell.clone().set_num_format(DATE_TIME_FORMAT);
        let date_striped = cell_striped.clone().set_num_format(DATE_TIME_FORMAT);

        Self {
            title,
            meta_label,
            meta_value,
            summary_title,
            summary_label,
            summary_value,
            header,
            cell,
            cell_striped,
            date,
            date_striped,
        }
    }

    /// Format for a data cell of `cell_type`, tinted on striped rows.
    pub fn data(&self, cell_type: CellType, striped: bool) -> &Format {
        match (cell_type, striped) {
            (CellType::Text, false) => &self.cell,
            (CellType::Text, true) => &self.cell_striped,
            (CellType::Date, false) => &self.date,
            (CellType::Date, true) => &self.date_striped,
        }
    }
}
