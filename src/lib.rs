//! # lineio
//!
//! A **record mapping library** for line- and row-oriented data. lineio binds
//! text lines, delimited rows and spreadsheet rows to plain Rust structs, and
//! writes them back, with optional file-backed memoization of expensive
//! sequences.
//!
//! ## Key Features
//!
//! - **Explicit field tables** - the [`record!`] macro declares which fields a
//!   struct exposes and with which modifiers
//! - **Selection policies** - include or exclude fields by name or anchored regex
//! - **Per-type conversions** - register parsers, formatters and post-parse mappers
//! - **Lenient row conversion** - bad cells leave a field at its default
//! - **Column bindings** - reorder by index, by spreadsheet letters or by header names
//! - **Lazy read sessions** - configure, then iterate; restartable when the
//!   source can be reopened
//! - **Memoization** - replay a sequence from a CSV or JSON-lines side file
//!
//! ## Quick Start
//!
//! ```
//! use lineio::{record, DataMapper};
//! # use anyhow::Result;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: String,
//! }
//!
//! record!(Point { x, y, label });
//!
//! # fn main() -> Result<()> {
//! let mapper = DataMapper::<Point>::new(",")?;
//! let p = mapper.parse("3,4,origin")?;
//! assert_eq!(p, Point { x: 3, y: 4, label: "origin".into() });
//! assert_eq!(mapper.format(&p)?, "3,4,origin");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Records and plans
//!
//! A [`Record`] declares its fields once in a [`Schema`]. A [`SelectionPolicy`]
//! picks a subset of them, and the resulting [`FieldPlan`] fixes the column
//! order. Plans are built once per record type and policy and shared.
//!
//! ### Conversion
//!
//! A [`RowConverter`] turns any [`Row`] into a record and a [`RowJoiner`]
//! turns a record back into cells. Conversion never fails on cell contents:
//! missing and malformed cells are reported through a hook and leave the
//! field at its default.
//!
//! ### Sessions
//!
//! [`LineReader`] creates a [`Session`] over a [`RowSource`]. Sessions are
//! configured (skip lines, column binding, ignored errors) before the first
//! row is pulled, and yield `anyhow::Result` values.
//!
//! ### Memoization
//!
//! [`Cacheable`] is implemented for [`DataSeq`] and [`Session`]. The first
//! call computes and persists; later calls replay the file.
//!
//! ## Feature Flags
//!
//! - `io-jsonl` - JSON-lines reading, writing and caching
//! - `io-csv` - quoted delimited fields via the `csv` crate
//! - `io-xlsx` - workbook sheets via `calamine`
//! - `compression-gzip`, `compression-zstd` - transparent compression by file extension

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod codec;
pub mod columns;
pub mod converter;
pub mod error;
pub mod field;
pub mod io;
pub mod mapper;
pub mod plan;
pub mod reader;
pub mod row;
pub mod selection;
pub mod seq;
pub mod session;
pub mod source;
pub mod testing;

// General re-exports
pub use cache::{Cache, CacheConfig, Cacheable, TabularCache, WriteMode, cache_path};
pub use codec::{Attr, Conversions};
pub use columns::{ColumnBinding, column_index};
pub use converter::{FieldIssue, RowConverter, RowJoiner};
pub use error::{MapError, ParseError};
pub use field::{
    Boxed, Codec, FieldDef, FieldKind, FieldMark, FieldType, Modifiers, Record, Schema, Visibility,
};
pub use io::writer::{LineWriter, WriterConfig};
pub use mapper::{DEFAULT_SEP, DataMapper, DataMapperBuilder};
pub use plan::{FieldDescriptor, FieldPlan};
pub use reader::{
    DelimitedReader, DelimitedSession, LineReader, SheetReader, SheetSession, SimpleReader,
};
pub use row::{CellRef, Row, SheetCell, SheetRow, number_text};
pub use selection::{Selection, SelectionPolicy};
pub use seq::DataSeq;
pub use session::{Decode, FnDecoder, Session, SessionConfig};
pub use source::{DelimitedSource, LineSource, RowSource, Rows, SheetSource, TextInput};

// Gated re-exports
#[cfg(feature = "io-jsonl")]
pub use cache::JsonLinesCache;

#[cfg(feature = "io-jsonl")]
pub use io::jsonl::{JsonDecoder, to_json_line};

#[cfg(feature = "io-jsonl")]
pub use reader::{JsonReader, JsonSession};
