//! Spreadsheet rendering of report rows.
//!
//! Rendering happens in two steps: [`ReportBuilder::layout`] turns rows into a
//! plain [`SheetLayout`] (cell text, alignment and column widths), and
//! [`ReportBuilder::render`] writes that layout into a temporary `.xlsx` file.

use log::debug;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::Result;

pub const SHEET_NAME: &str = "Задачи";

pub const HEADERS: [&str; COLUMN_COUNT] = [
    "№",
    "Бренд",
    "Линейка",
    "Наименование",
    "Дата запуска работы",
    "Ответственный БМ",
    "Ответственный ОЗ",
    "Сырье",
    "Упаковка",
    "Примечание",
];

pub const COLUMN_COUNT: usize = 10;

const HEADER_FILL: u32 = 0xFFEB84;
const MAX_COLUMN_WIDTH: f64 = 50.0;
const INDEX_COLUMN_WIDTH: f64 = 5.0;
const WIDTH_PADDING: usize = 2;

/// One product line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub index: usize,
    pub project_name: String,
    pub issue_name: String,
    pub product_line: String,
    pub launch_date: String,
    pub bm_responsible: String,
    pub oz_responsible: String,
    pub raw_materials_note: String,
    pub packaging_note: String,
    pub last_comment: String,
}

impl ReportRow {
    /// Cell values in header order.
    pub fn cells(&self) -> [String; COLUMN_COUNT] {
        [
            self.index.to_string(),
            self.project_name.clone(),
            self.issue_name.clone(),
            self.product_line.clone(),
            self.launch_date.clone(),
            self.bm_responsible.clone(),
            self.oz_responsible.clone(),
            self.raw_materials_note.clone(),
            self.packaging_note.clone(),
            self.last_comment.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAlign {
    /// Centered both ways.
    Center,
    /// Left/top with wrapping, for long free text.
    WrapTop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WidthRule {
    Fixed(f64),
    Auto,
}

struct ColumnSpec {
    align: CellAlign,
    width: WidthRule,
}

const COLUMNS: [ColumnSpec; COLUMN_COUNT] = [
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Fixed(INDEX_COLUMN_WIDTH) },
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Auto },
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Auto },
    ColumnSpec { align: CellAlign::WrapTop, width: WidthRule::Fixed(MAX_COLUMN_WIDTH) },
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Auto },
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Auto },
    ColumnSpec { align: CellAlign::Center, width: WidthRule::Auto },
    ColumnSpec { align: CellAlign::WrapTop, width: WidthRule::Fixed(MAX_COLUMN_WIDTH) },
    ColumnSpec { align: CellAlign::WrapTop, width: WidthRule::Fixed(MAX_COLUMN_WIDTH) },
    ColumnSpec { align: CellAlign::WrapTop, width: WidthRule::Fixed(MAX_COLUMN_WIDTH) },
];

/// Everything needed to write the sheet, independent of the xlsx backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub header: [&'static str; COLUMN_COUNT],
    pub rows: Vec<[String; COLUMN_COUNT]>,
    pub alignments: [CellAlign; COLUMN_COUNT],
    pub widths: [f64; COLUMN_COUNT],
}

pub struct ReportBuilder;

impl ReportBuilder {
    pub fn layout(rows: &[ReportRow]) -> SheetLayout {
        let cells: Vec<[String; COLUMN_COUNT]> = rows.iter().map(ReportRow::cells).collect();

        let mut widths = [0.0; COLUMN_COUNT];
        for (column, spec) in COLUMNS.iter().enumerate() {
            widths[column] = match spec.width {
                WidthRule::Fixed(width) => width,
                WidthRule::Auto => auto_width(HEADERS[column], cells.iter().map(|row| row[column].as_str())),
            };
        }

        SheetLayout {
            header: HEADERS,
            rows: cells,
            alignments: COLUMNS.map(|spec| spec.align),
            widths,
        }
    }

    /// Writes the layout into a fresh temporary `.xlsx` file.
    pub fn render(layout: &SheetLayout) -> Result<NamedTempFile> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let header_format = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin);
        let center_format = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let wrap_format = Format::new()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::Top)
            .set_text_wrap();

        for (column, title) in layout.header.iter().enumerate() {
            sheet.write_string_with_format(0, column as u16, *title, &header_format)?;
        }

        for (offset, cells) in layout.rows.iter().enumerate() {
            let row = offset as u32 + 1;
            for (column, value) in cells.iter().enumerate() {
                let format = match layout.alignments[column] {
                    CellAlign::Center => &center_format,
                    CellAlign::WrapTop => &wrap_format,
                };
                // The index column is numeric in the sheet.
                if let (0, Ok(number)) = (column, value.parse::<f64>()) {
                    sheet.write_number_with_format(row, 0, number, format)?;
                } else {
                    sheet.write_string_with_format(row, column as u16, value.as_str(), format)?;
                }
            }
        }

        for (column, width) in layout.widths.iter().enumerate() {
            sheet.set_column_width(column as u16, *width)?;
        }

        let artifact = tempfile::Builder::new()
            .prefix("report-")
            .suffix(".xlsx")
            .tempfile()?;
        workbook.save(artifact.path())?;
        debug!("Rendered {} rows into {}", layout.rows.len(), artifact.path().display());
        Ok(artifact)
    }

    pub fn build(rows: &[ReportRow]) -> Result<NamedTempFile> {
        Self::render(&Self::layout(rows))
    }
}

/// Longest value in the column (header included) plus padding, capped.
fn auto_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> f64 {
    let longest = values
        .map(|value| value.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);
    ((longest + WIDTH_PADDING) as f64).min(MAX_COLUMN_WIDTH)
}
