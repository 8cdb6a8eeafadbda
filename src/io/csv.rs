//! Quote-aware delimited text.
//!
//! Plain delimited sources split each line on the separator string. When
//! fields may contain the separator, a newline or quotes, the `csv` crate does
//! the splitting and joining instead. It needs a single-byte delimiter.

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::Read;

const BOM: char = '\u{feff}';

/// The single byte `sep` consists of.
///
/// # Errors
///
/// Returns an error if `sep` is not exactly one byte long.
pub fn delimiter_byte(sep: &str) -> Result<u8> {
    match sep.as_bytes() {
        [b] => Ok(*b),
        _ => bail!("quoted splitting needs a single-byte separator, got {sep:?}"),
    }
}

/// Iterate the records of `reader` as owned cell lists.
///
/// Records may have different lengths. A leading UTF-8 BOM is dropped.
pub fn quoted_records(
    reader: Box<dyn Read>,
    delimiter: u8,
) -> impl Iterator<Item = Result<Vec<String>>> {
    let rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    rdr.into_records().enumerate().map(|(i, rec)| {
        let rec = rec.with_context(|| format!("parse delimited record #{}", i + 1))?;
        let mut cells = record_cells(&rec);
        if i == 0
            && let Some(first) = cells.first_mut()
            && let Some(stripped) = first.strip_prefix(BOM)
        {
            *first = stripped.to_string();
        }
        Ok(cells)
    })
}

fn record_cells(rec: &StringRecord) -> Vec<String> {
    rec.iter().map(str::to_string).collect()
}

/// Join cells into one line, quoting where needed. No line terminator.
///
/// # Errors
///
/// Returns an error if the csv writer fails.
pub fn quote_join<S: AsRef<str>>(cells: &[S], delimiter: u8) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(cells.iter().map(AsRef::as_ref))
        .context("format delimited record")?;
    let bytes = wtr.into_inner().context("flush delimited record")?;
    let mut line = String::from_utf8(bytes).context("delimited record is not UTF-8")?;
    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
    Ok(line)
}
