//! The row capability: anything indexable by slot with a known cell count.

use std::fmt;

/// A borrowed view of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellRef<'a> {
    Empty,
    Text(&'a str),
    Number(f64),
    Bool(bool),
}

/// A raw row as produced by a row source.
pub trait Row {
    fn cell_count(&self) -> usize;

    /// The cell at `slot`; `CellRef::Empty` past the end of the row.
    fn cell(&self, slot: usize) -> CellRef<'_>;

    /// Cell contents as header names.
    fn header_names(&self) -> Vec<String> {
        (0..self.cell_count())
            .map(|slot| match self.cell(slot) {
                CellRef::Empty => String::new(),
                CellRef::Text(text) => text.to_string(),
                CellRef::Number(n) => number_text(n),
                CellRef::Bool(b) => b.to_string(),
            })
            .collect()
    }
}

impl Row for Vec<String> {
    fn cell_count(&self) -> usize {
        self.len()
    }

    fn cell(&self, slot: usize) -> CellRef<'_> {
        self.get(slot).map_or(CellRef::Empty, |s| CellRef::Text(s))
    }
}

impl Row for Vec<&str> {
    fn cell_count(&self) -> usize {
        self.len()
    }

    fn cell(&self, slot: usize) -> CellRef<'_> {
        self.get(slot).map_or(CellRef::Empty, |s| CellRef::Text(s))
    }
}

#[cfg(feature = "io-csv")]
impl Row for csv::StringRecord {
    fn cell_count(&self) -> usize {
        self.len()
    }

    fn cell(&self, slot: usize) -> CellRef<'_> {
        self.get(slot).map_or(CellRef::Empty, CellRef::Text)
    }
}

/// A typed spreadsheet cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SheetCell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for SheetCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => f.write_str(&number_text(*n)),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for SheetCell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for SheetCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for SheetCell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One spreadsheet row of typed cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetRow(pub Vec<SheetCell>);

impl FromIterator<SheetCell> for SheetRow {
    fn from_iter<I: IntoIterator<Item = SheetCell>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Row for SheetRow {
    fn cell_count(&self) -> usize {
        self.0.len()
    }

    fn cell(&self, slot: usize) -> CellRef<'_> {
        match self.0.get(slot) {
            None | Some(SheetCell::Empty) => CellRef::Empty,
            Some(SheetCell::Text(text)) => CellRef::Text(text),
            Some(SheetCell::Number(n)) => CellRef::Number(*n),
            Some(SheetCell::Bool(b)) => CellRef::Bool(*b),
        }
    }
}

/// Render a numeric cell the way a spreadsheet displays it: integral values
/// without a fractional part.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(number_text(42.0), "42");
        assert_eq!(number_text(-3.0), "-3");
        assert_eq!(number_text(2.5), "2.5");
    }

    #[test]
    fn sheet_rows_expose_typed_cells() {
        let row = SheetRow(vec!["a".into(), 1.0.into(), SheetCell::Empty, true.into()]);
        assert_eq!(row.cell_count(), 4);
        assert_eq!(row.cell(1), CellRef::Number(1.0));
        assert_eq!(row.cell(2), CellRef::Empty);
        assert_eq!(row.cell(9), CellRef::Empty);
        assert_eq!(row.header_names(), vec!["a", "1", "", "true"]);
    }
}
