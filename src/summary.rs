//! Count-based summary blocks computed over the exported rows.

use crate::report::{Locale, Row};
use crate::schema::{translate, Label};
use serde_json::Value;

/// A titled list of label/count pairs rendered above the data table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryBlock {
    pub title: String,
    pub items: Vec<(String, usize)>,
}

/// Count rows per category of `field`, in the order of `categories`.
///
/// Every category appears even when no row carries it, so the rendered layout
/// is stable across exports. Values outside the category list are not counted.
pub fn count_by(rows: &[Row], field: &str, categories: &[&str]) -> Vec<(String, usize)> {
    categories
        .iter()
        .map(|category| {
            let count = rows
                .iter()
                .filter(|row| row.get(field).and_then(Value::as_str) == Some(*category))
                .count();
            (category.to_string(), count)
        })
        .collect()
}

/// A zero-filled breakdown of `field` over the categories of a label map,
/// with localized item labels.
pub fn breakdown(
    title: &str,
    rows: &[Row],
    field: &str,
    labels: &[Label],
    locale: Locale,
) -> SummaryBlock {
    let categories: Vec<&str> = labels.iter().map(|l| l.raw).collect();
    let items = count_by(rows, field, &categories)
        .into_iter()
        .map(|(raw, count)| (translate(labels, &raw, locale), count))
        .collect();

    SummaryBlock {
        title: title.to_string(),
        items,
    }
}
