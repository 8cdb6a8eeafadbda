//! Raw row sources.
//!
//! A [`RowSource`] opens a fresh iterator of raw rows each time a session
//! starts. Path-backed and in-memory inputs can be opened any number of times;
//! a reader-backed input is consumed by its first opening and yields nothing
//! afterwards.

use crate::io::compression::auto_detect_reader;
use crate::row::SheetRow;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Boxed iterator of raw rows.
pub type Rows<W> = Box<dyn Iterator<Item = Result<W>>>;

/// Something that yields raw rows of one shape.
pub trait RowSource {
    type Row: 'static;

    /// Start a new pass over the rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying input cannot be opened.
    fn open(&mut self) -> Result<Rows<Self::Row>>;
}

/// Byte-oriented text input.
pub enum TextInput {
    /// A file, decompressed transparently by extension or magic bytes.
    Path(PathBuf),
    /// A stream that can only be read once.
    Reader(Option<Box<dyn Read + Send>>),
    /// In-memory text.
    Text(String),
}

impl TextInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Some(Box::new(reader)))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Open the raw byte stream for one pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a path input cannot be opened.
    pub fn open_read(&mut self) -> Result<Box<dyn Read>> {
        match self {
            Self::Path(path) => {
                let f = File::open(&*path).with_context(|| format!("open {}", path.display()))?;
                auto_detect_reader(f, &*path)
                    .with_context(|| format!("setup decompression for {}", path.display()))
            }
            Self::Reader(reader) => Ok(match reader.take() {
                Some(reader) => Box::new(reader),
                None => Box::new(std::io::empty()),
            }),
            Self::Text(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
        }
    }

    /// Open the input as lines, dropping a leading UTF-8 BOM.
    ///
    /// # Errors
    ///
    /// Returns an error if a path input cannot be opened.
    pub fn lines(&mut self) -> Result<Rows<String>> {
        let label = self.to_string();
        let reader = BufReader::new(self.open_read()?);
        Ok(Box::new(reader.lines().enumerate().map(move |(i, line)| {
            let line = line.with_context(|| format!("read line {} in {label}", i + 1))?;
            Ok(match line.strip_prefix('\u{feff}') {
                Some(stripped) if i == 0 => stripped.to_string(),
                _ => line,
            })
        })))
    }
}

impl fmt::Display for TextInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Reader(_) => f.write_str("<reader>"),
            Self::Text(_) => f.write_str("<text>"),
        }
    }
}

impl fmt::Debug for TextInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextInput({self})")
    }
}

impl From<PathBuf> for TextInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for TextInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Whole lines, for decoders that read a line at a time.
#[derive(Debug)]
pub struct LineSource {
    input: TextInput,
}

impl LineSource {
    pub fn new(input: impl Into<TextInput>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl RowSource for LineSource {
    type Row = String;

    fn open(&mut self) -> Result<Rows<String>> {
        self.input.lines()
    }
}

/// Lines split into cells by a separator.
#[derive(Debug)]
pub struct DelimitedSource {
    input: TextInput,
    sep: String,
    quoted: bool,
}

impl DelimitedSource {
    pub fn new(input: impl Into<TextInput>, sep: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            sep: sep.into(),
            quoted: false,
        }
    }

    /// Split with quote handling; the separator must be a single byte.
    #[cfg(feature = "io-csv")]
    #[must_use]
    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }
}

impl DelimitedSource {
    #[cfg(feature = "io-csv")]
    fn open_quoted(&mut self) -> Result<Option<Rows<Vec<String>>>> {
        if !self.quoted {
            return Ok(None);
        }
        let delimiter = crate::io::csv::delimiter_byte(&self.sep)?;
        let reader = self.input.open_read()?;
        Ok(Some(Box::new(crate::io::csv::quoted_records(reader, delimiter))))
    }

    #[cfg(not(feature = "io-csv"))]
    fn open_quoted(&mut self) -> Result<Option<Rows<Vec<String>>>> {
        Ok(None)
    }
}

impl RowSource for DelimitedSource {
    type Row = Vec<String>;

    fn open(&mut self) -> Result<Rows<Vec<String>>> {
        if let Some(rows) = self.open_quoted()? {
            return Ok(rows);
        }
        let sep = self.sep.clone();
        let lines = self.input.lines()?;
        Ok(Box::new(lines.map(move |line| {
            line.map(|line| line.split(sep.as_str()).map(str::to_string).collect())
        })))
    }
}

enum SheetInput {
    Rows(Vec<SheetRow>),
    #[cfg(feature = "io-xlsx")]
    Workbook { path: PathBuf, sheet: usize },
}

/// Typed spreadsheet rows, in memory or from a workbook on disk.
pub struct SheetSource {
    input: SheetInput,
}

impl SheetSource {
    #[must_use]
    pub fn rows(rows: Vec<SheetRow>) -> Self {
        Self {
            input: SheetInput::Rows(rows),
        }
    }

    /// The worksheet at `sheet` (zero-based) of an `.xlsx` workbook, loaded on
    /// every opening.
    #[cfg(feature = "io-xlsx")]
    pub fn workbook(path: impl Into<PathBuf>, sheet: usize) -> Self {
        Self {
            input: SheetInput::Workbook {
                path: path.into(),
                sheet,
            },
        }
    }
}

impl RowSource for SheetSource {
    type Row = SheetRow;

    fn open(&mut self) -> Result<Rows<SheetRow>> {
        let rows = match &self.input {
            SheetInput::Rows(rows) => rows.clone(),
            #[cfg(feature = "io-xlsx")]
            SheetInput::Workbook { path, sheet } => crate::io::xlsx::read_sheet(path, *sheet)?,
        };
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
