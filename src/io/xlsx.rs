//! Worksheet loading for `.xlsx` workbooks.

use crate::row::{SheetCell, SheetRow};
use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, Xlsx, open_workbook};
use std::path::Path;

/// Read every row of the worksheet at `index` (zero-based).
///
/// Integer and float cells become [`SheetCell::Number`]; dates, durations and
/// error cells are kept as their display text.
///
/// # Errors
///
/// Returns an error if the workbook cannot be opened or has no such sheet.
pub fn read_sheet(path: impl AsRef<Path>, index: usize) -> Result<Vec<SheetRow>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("open workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(index)
        .ok_or_else(|| anyhow!("no worksheet #{index} in {}", path.display()))?
        .with_context(|| format!("read worksheet #{index} in {}", path.display()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(sheet_cell).collect())
        .collect())
}

#[allow(clippy::cast_precision_loss)]
fn sheet_cell(cell: &Data) -> SheetCell {
    match cell {
        Data::Empty => SheetCell::Empty,
        Data::String(text) => SheetCell::Text(text.clone()),
        Data::Float(n) => SheetCell::Number(*n),
        Data::Int(n) => SheetCell::Number(*n as f64),
        Data::Bool(b) => SheetCell::Bool(*b),
        other => SheetCell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_keep_their_kind() {
        assert_eq!(sheet_cell(&Data::Int(7)), SheetCell::Number(7.0));
        assert_eq!(sheet_cell(&Data::Float(1.5)), SheetCell::Number(1.5));
        assert_eq!(sheet_cell(&Data::Bool(true)), SheetCell::Bool(true));
        assert_eq!(sheet_cell(&Data::Empty), SheetCell::Empty);
        assert_eq!(
            sheet_cell(&Data::String("Ada".into())),
            SheetCell::Text("Ada".into())
        );
    }

    #[test]
    fn missing_workbooks_name_the_path() {
        let err = read_sheet("/no/such/book.xlsx", 0).unwrap_err();
        assert!(format!("{err:#}").contains("book.xlsx"));
    }
}
