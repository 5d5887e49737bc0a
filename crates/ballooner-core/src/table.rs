//! Rows for the balloon list shown next to the drawing

use crate::balloon::Balloon;
use crate::error::BalloonError;
use crate::sheet::Sheet;
use serde::Serialize;
use uuid::Uuid;

pub const HEADERS: [&str; 5] = ["#", "Page", "X", "Y", "Description"];

/// Index of the only editable column
pub const DESCRIPTION_COLUMN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub uid: Uuid,
    pub number: u32,
    /// 1-based
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub description: String,
}

impl TableRow {
    pub fn from_balloon(balloon: &Balloon) -> Self {
        Self {
            uid: balloon.uid,
            number: balloon.number,
            page: balloon.page + 1,
            x: balloon.balloon_center.x,
            y: balloon.balloon_center.y,
            description: balloon.description.clone(),
        }
    }

    /// Display text of each column
    pub fn cells(&self) -> [String; 5] {
        [
            self.number.to_string(),
            self.page.to_string(),
            format!("{:.1}", self.x),
            format!("{:.1}", self.y),
            self.description.clone(),
        ]
    }
}

pub fn rows(sheet: &Sheet) -> Vec<TableRow> {
    sheet.sorted().into_iter().map(TableRow::from_balloon).collect()
}

pub fn is_editable(column: usize) -> bool {
    column == DESCRIPTION_COLUMN
}

/// Commit a cell edit. Only the description column accepts edits; other
/// columns are ignored and return `Ok(false)`.
pub fn edit_cell(
    sheet: &mut Sheet,
    row: &TableRow,
    column: usize,
    text: &str,
) -> Result<bool, BalloonError> {
    if !is_editable(column) || sheet.get(row.uid)?.description == text {
        return Ok(false);
    }
    sheet.set_description(row.uid, text)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balloon::DocPoint;
    use pretty_assertions::assert_eq;

    fn sheet() -> Sheet {
        let mut sheet = Sheet::default();
        sheet.place(1, DocPoint::new(10.0, 10.0)).unwrap();
        sheet.place(0, DocPoint::new(100.04, 200.06)).unwrap();
        sheet
    }

    #[test]
    fn test_rows_sorted_with_one_based_pages() {
        let rows = rows(&sheet());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].page, 1);
        assert_eq!(rows[0].number, 2);
        assert_eq!(
            rows[0].cells(),
            [
                "2".to_string(),
                "1".to_string(),
                "140.0".to_string(),
                "240.1".to_string(),
                String::new()
            ]
        );
    }

    #[test]
    fn test_only_description_is_editable() {
        let mut sheet = sheet();
        let row = rows(&sheet)[0].clone();
        assert!(!edit_cell(&mut sheet, &row, 0, "9").unwrap());
        assert!(edit_cell(&mut sheet, &row, DESCRIPTION_COLUMN, "Ø12 H7").unwrap());
        assert_eq!(sheet.get(row.uid).unwrap().description, "Ø12 H7");
        // Unchanged text does not create an undo step
        assert!(!edit_cell(&mut sheet, &row, DESCRIPTION_COLUMN, "Ø12 H7").unwrap());
        sheet.undo().unwrap();
        assert_eq!(sheet.get(row.uid).unwrap().description, "");
    }
}
