//! Inspection sheet workbook
//!
//! One row per balloon with blank Actual/Result/Notes columns for the
//! inspector to fill in.

use crate::balloon::Balloon;
use crate::error::BalloonError;
use crate::sheet::by_page_and_number;
use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::Path;

pub const SHEET_NAME: &str = "Inspection Sheet";

pub const COLUMNS: [(&str, f64); 7] = [
    ("#", 6.0),
    ("Page", 7.0),
    ("Characteristic / Description", 55.0),
    ("Nominal / Spec", 22.0),
    ("Actual", 14.0),
    ("Result", 12.0),
    ("Notes", 22.0),
];

const HEADER_BLUE: u32 = 0x1F4E79;
const ALT_ROW_BLUE: u32 = 0xD6E4F0;
const BORDER_GREY: u32 = 0xAAAAAA;

/// Zero-based row of the column headers; data starts on the next row
const HEADER_ROW: u32 = 3;

struct Styles {
    title: Format,
    drawing: Format,
    date: Format,
    header: Format,
    body_center: Format,
    body_left: Format,
}

impl Styles {
    fn new() -> Self {
        let base = Format::new().set_font_name("Calibri").set_font_size(10);
        let cell = base
            .clone()
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(BORDER_GREY))
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap();
        Self {
            title: base
                .clone()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_BLUE))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            drawing: base
                .clone()
                .set_bold()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter),
            date: base
                .clone()
                .set_align(FormatAlign::Right)
                .set_align(FormatAlign::VerticalCenter),
            header: cell
                .clone()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_BLUE))
                .set_align(FormatAlign::Center),
            body_center: cell.clone().set_align(FormatAlign::Center),
            body_left: cell.set_align(FormatAlign::Left),
        }
    }

    fn body(&self, column: u16, shaded: bool) -> Format {
        let format = if matches!(column, 0 | 1 | 4 | 5) {
            self.body_center.clone()
        } else {
            self.body_left.clone()
        };
        if shaded {
            format.set_background_color(Color::RGB(ALT_ROW_BLUE))
        } else {
            format
        }
    }
}

/// Build the workbook in memory.
pub fn inspection_workbook<'a, I>(
    balloons: I,
    drawing_name: &str,
    date: NaiveDate,
) -> Result<Workbook, BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    let mut sorted: Vec<&Balloon> = balloons.into_iter().collect();
    sorted.sort_by(|a, b| by_page_and_number(a, b));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    write_sheet(sheet, &sorted, drawing_name, date)?;
    Ok(workbook)
}

fn write_sheet(
    sheet: &mut Worksheet,
    balloons: &[&Balloon],
    drawing_name: &str,
    date: NaiveDate,
) -> Result<(), BalloonError> {
    let styles = Styles::new();
    let last_col = (COLUMNS.len() - 1) as u16;

    for (col, (_, width)) in COLUMNS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    sheet.merge_range(0, 0, 0, last_col, "INSPECTION SHEET", &styles.title)?;
    sheet.set_row_height(0, 28)?;

    let drawing = if drawing_name.is_empty() {
        "Drawing:".to_string()
    } else {
        format!("Drawing: {}", drawing_name)
    };
    sheet.merge_range(1, 0, 1, 3, &drawing, &styles.drawing)?;
    sheet.merge_range(
        1,
        4,
        1,
        last_col,
        &format!("Date: {}", date.format("%Y-%m-%d")),
        &styles.date,
    )?;
    sheet.set_row_height(1, 18)?;
    sheet.set_row_height(2, 6)?;

    for (col, (title, _)) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(HEADER_ROW, col as u16, *title, &styles.header)?;
    }
    sheet.set_row_height(HEADER_ROW, 20)?;

    for (i, balloon) in balloons.iter().enumerate() {
        let row = HEADER_ROW + 1 + i as u32;
        let shaded = i % 2 == 0;
        sheet.write_number_with_format(row, 0, balloon.number, &styles.body(0, shaded))?;
        sheet.write_number_with_format(row, 1, balloon.page + 1, &styles.body(1, shaded))?;
        sheet.write_string_with_format(
            row,
            2,
            balloon.description.as_str(),
            &styles.body(2, shaded),
        )?;
        for col in 3..=last_col {
            sheet.write_blank(row, col, &styles.body(col, shaded))?;
        }
        sheet.set_row_height(row, 16)?;
    }

    sheet.set_freeze_panes(HEADER_ROW + 1, 0)?;
    Ok(())
}

pub fn export_xlsx<'a, I>(
    path: &Path,
    balloons: I,
    drawing_name: &str,
    date: NaiveDate,
) -> Result<(), BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    let mut workbook = inspection_workbook(balloons, drawing_name, date)?;
    workbook.save(path)?;
    tracing::info!(path = %path.display(), drawing = drawing_name, "exported inspection sheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balloon::DocPoint;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn balloon(number: u32, page: u32, description: &str) -> Balloon {
        let mut b = Balloon::new(number, page, DocPoint::new(0.0, 0.0), DocPoint::new(1.0, 1.0));
        b.description = description.to_string();
        b
    }

    /// Unpacked XML parts of a saved workbook
    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    /// The `<c>` element for `cell`, e.g. "A5"
    fn cell<'x>(sheet: &'x str, cell: &str) -> &'x str {
        let start = sheet
            .find(&format!("<c r=\"{}\"", cell))
            .unwrap_or_else(|| panic!("no cell {}", cell));
        let rest = &sheet[start..];
        let end = rest
            .find("</c>")
            .map(|i| i + 4)
            .into_iter()
            .chain(rest.find("/>").map(|i| i + 2))
            .min()
            .unwrap();
        &rest[..end]
    }

    fn style_index(element: &str) -> &str {
        let at = element.find(" s=\"").unwrap() + 4;
        element[at..].split('"').next().unwrap()
    }

    fn saved(balloons: &[Balloon], name: &str) -> Vec<u8> {
        let mut workbook = inspection_workbook(balloons, name, date()).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        assert!(bytes.starts_with(b"PK"));
        bytes
    }

    #[test]
    fn test_sheet_layout() {
        let bytes = saved(&[balloon(1, 0, "⌀12 H7")], "part-7");

        let workbook = part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("name=\"Inspection Sheet\""));

        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        for range in ["A1:G1", "A2:D2", "E2:G2"] {
            assert!(sheet.contains(&format!("<mergeCell ref=\"{}\"/>", range)), "{}", range);
        }
        assert!(sheet.contains("ySplit=\"4\""));
        assert!(sheet.contains("topLeftCell=\"A5\""));

        // Excel stores widths with the digit padding added
        for (col, (_, width)) in COLUMNS.iter().enumerate() {
            let n = col + 1;
            let prefix = format!("<col min=\"{}\" max=\"{}\" width=\"{}.7", n, n, *width as u32);
            assert!(sheet.contains(&prefix), "column {} width {}", n, width);
        }

        let strings = part(&bytes, "xl/sharedStrings.xml");
        for text in ["INSPECTION SHEET", "Drawing: part-7", "Date: 2024-03-09", "⌀12 H7"] {
            assert!(strings.contains(text), "{}", text);
        }
        for (title, _) in COLUMNS {
            assert!(strings.contains(&format!(">{}<", title)), "{}", title);
        }
    }

    #[test]
    fn test_headers_on_row_four_and_data_from_row_five() {
        let bytes = saved(&[balloon(2, 1, "b"), balloon(1, 0, "a")], "part");
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");

        for col in ["A", "B", "C", "D", "E", "F", "G"] {
            let header = cell(&sheet, &format!("{}4", col));
            assert!(header.contains("t=\"s\""), "{}", header);
        }
        // Sorted by page then number, pages shown 1-based
        assert!(cell(&sheet, "A5").contains("<v>1</v>"));
        assert!(cell(&sheet, "B5").contains("<v>1</v>"));
        assert!(cell(&sheet, "A6").contains("<v>2</v>"));
        assert!(cell(&sheet, "B6").contains("<v>2</v>"));
        // Inspector columns are present but empty
        assert!(!cell(&sheet, "E5").contains("<v>"));
        assert!(!sheet.contains("<c r=\"A7\""));
    }

    #[test]
    fn test_alternate_rows_shaded() {
        let balloons: Vec<Balloon> = (1..=3).map(|n| balloon(n, 0, "")).collect();
        let bytes = saved(&balloons, "part");
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");

        let first = style_index(cell(&sheet, "C5"));
        let second = style_index(cell(&sheet, "C6"));
        let third = style_index(cell(&sheet, "C7"));
        assert_eq!(first, third);
        assert_ne!(first, second);

        let styles = part(&bytes, "xl/styles.xml");
        assert!(styles.contains("FFD6E4F0"));
        assert!(styles.contains("FF1F4E79"));
        assert!(styles.contains("FFAAAAAA"));
    }

    #[test]
    fn test_empty_workbook_still_has_headers() {
        let bytes = saved(&[], "");
        let strings = part(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("Characteristic / Description"));
        assert!(strings.contains(">Drawing:<"));
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(!sheet.contains("<row r=\"5\""));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.xlsx");
        export_xlsx(&path, std::iter::empty(), "part", date()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(part(&bytes, "xl/worksheets/sheet1.xml").contains("A1:G1"));
    }
}
