//! Normalization of Megaplan rich text and dates for the report.

use chrono::{DateTime, Datelike, FixedOffset};
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Genitive month names, index 0 is January.
const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// Decodes HTML entities and strips the markup Megaplan puts into subjects and comments.
pub fn clean_html(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    decoded
        .replace("<br />", "\n")
        .replace("</p>", "\n")
        .replace("<p>", "")
        .replace("</strong>", "")
        .replace("<strong>", "")
        .trim()
        .to_string()
}

/// Decimal digit of any script (category Nd). Roman numerals and vulgar fractions are not digits.
pub fn is_digit(c: char) -> bool {
    c.general_category() == GeneralCategory::DecimalNumber
}

/// A line describes a product iff it carries at least one digit (volume, SKU, article).
pub fn is_product(text: &str) -> bool {
    text.chars().any(is_digit)
}

/// Splits a cleaned subject into candidate product entries.
///
/// Products are normally separated by blank lines. A listing that collapses
/// into a single block whose lines are all numbered is split per line instead.
pub fn split_products(cleaned: &str) -> Vec<&str> {
    let blocks: Vec<&str> = cleaned.split("\n\n").collect();
    if blocks.len() == 1 && all_lines_numbered(cleaned) {
        return cleaned.split('\n').collect();
    }
    blocks
}

fn all_lines_numbered(text: &str) -> bool {
    text.split('\n')
        .filter(|line| !line.is_empty())
        .all(|line| line.chars().next().is_some_and(is_digit))
}

/// Product entries of a raw development task subject, in listing order.
pub fn product_lines(subject: &str) -> Vec<String> {
    let cleaned = clean_html(subject);
    split_products(&cleaned)
        .into_iter()
        .filter(|candidate| is_product(candidate))
        .map(|candidate| candidate.trim().to_string())
        .collect()
}

pub fn parse_megaplan_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .or_else(|| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z").ok())
}

/// Renders a timestamp as `"<day> <month>"` in the timestamp's own offset, e.g. `"5 марта"`.
pub fn format_launch_date(value: &str) -> Option<String> {
    let date = parse_megaplan_datetime(value)?;
    let month = MONTHS_GENITIVE[date.month0() as usize];
    Some(format!("{} {}", date.day(), month))
}
