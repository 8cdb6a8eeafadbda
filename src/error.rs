//! Error types.
//!
//! Two typed tiers live here:
//!
//! - [`MapError`]: configuration errors raised while a plan, converter, joiner
//!   or session binding is being built. These are fatal and surface before any
//!   data row is decoded.
//! - [`ParseError`]: per-cell failures. They never escape
//!   [`RowConverter::to_record`](crate::RowConverter::to_record); the affected
//!   field keeps its default value.
//!
//! Everything that touches the filesystem returns [`anyhow::Result`] with
//! context attached, the same way the `io` modules do.

use thiserror::Error;

/// Configuration error raised while building a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A field type has no built-in codec and no registered parser.
    #[error(
        "cannot parse field `{field}` of `{record}`: no parser for type `{type_name}`, \
         register one with Conversions::parser"
    )]
    NoParser {
        record: &'static str,
        field: &'static str,
        type_name: &'static str,
    },

    /// A field type has no built-in codec and no registered formatter.
    #[error(
        "cannot format field `{field}` of `{record}`: no formatter for type `{type_name}`, \
         register one with Conversions::formatter"
    )]
    NoFormatter {
        record: &'static str,
        field: &'static str,
        type_name: &'static str,
    },

    /// A requested column name is not present in the header row.
    #[error("column `{column}` not found in header {header:?}")]
    MissingColumn { column: String, header: Vec<String> },

    /// A spreadsheet-style column specifier could not be decoded.
    #[error("invalid column letters `{0}`")]
    InvalidColumn(String),

    /// A selection regex failed to compile.
    #[error("invalid field regex `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// The column binding was changed after rows had already been converted.
    #[error("column binding of `{0}` cannot change once conversion has started")]
    BindingLocked(&'static str),

    /// The decoder works on whole lines and cannot be bound to columns.
    #[error("decoder `{0}` does not support column binding")]
    BindingUnsupported(&'static str),

    /// Quote-aware splitting was requested with a multi-byte separator.
    #[error("quoted fields need a single-byte separator, got {0:?}")]
    QuotedSeparator(String),
}

/// Per-cell decode failure.
///
/// `Absent` and `Malformed` are reported separately to diagnostic hooks even
/// though both leave the field at its default value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The slot is past the end of the row, or the cell is empty.
    #[error("cell is absent")]
    Absent,

    /// The cell has content the field codec rejected.
    #[error("cannot parse {value:?}: {reason}")]
    Malformed { value: String, reason: String },

    /// A conversion produced a value of the wrong type for the field.
    #[error("conversion produced a value that is not `{expected}`")]
    TypeMismatch { expected: &'static str },
}

impl ParseError {
    pub(crate) fn malformed(value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
