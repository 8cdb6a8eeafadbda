//! Reader factories.
//!
//! Each reader holds a configured decoder and opens a fresh [`Session`] per
//! call to `read`. Sessions are lazy, so building one never touches the input.

use crate::converter::RowConverter;
use crate::error::MapError;
use crate::field::Record;
use crate::mapper::DataMapper;
use crate::row::SheetRow;
use crate::session::{FnDecoder, Session};
use crate::source::{DelimitedSource, LineSource, SheetSource, TextInput};
use anyhow::Result;

#[cfg(feature = "io-jsonl")]
use crate::io::jsonl::JsonDecoder;

pub type DelimitedSession<R> = Session<DelimitedSource, RowConverter<R>>;
pub type SheetSession<R> = Session<SheetSource, RowConverter<R>>;
#[cfg(feature = "io-jsonl")]
pub type JsonSession<T> = Session<LineSource, JsonDecoder<T>>;

/// Entry points for reading records.
pub struct LineReader;

impl LineReader {
    /// Separator-delimited lines decoded into `R`.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if `R` cannot be parsed.
    pub fn csv<R: Record>(sep: impl Into<String>) -> Result<DelimitedReader<R>, MapError> {
        Ok(DelimitedReader::new(RowConverter::new()?, sep))
    }

    /// Delimited lines decoded with the policy, conversions and separator of
    /// `mapper`.
    #[must_use]
    pub fn with_mapper<R: Record>(mapper: &DataMapper<R>) -> DelimitedReader<R> {
        mapper.reader()
    }

    /// One JSON document per line.
    #[cfg(feature = "io-jsonl")]
    #[must_use]
    pub fn json<T: serde::de::DeserializeOwned>() -> JsonReader<T> {
        JsonReader {
            _out: std::marker::PhantomData,
        }
    }

    /// Whole lines decoded by a closure.
    pub fn simple<T, F>(decode: F) -> SimpleReader<F>
    where
        F: FnMut(String) -> Result<T> + Clone,
    {
        SimpleReader { decode }
    }

    /// Typed spreadsheet rows decoded into `R`.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if `R` cannot be parsed.
    pub fn sheet<R: Record>() -> Result<SheetReader<R>, MapError> {
        Ok(SheetReader {
            converter: RowConverter::new()?,
        })
    }
}

/// Reads separator-delimited text.
pub struct DelimitedReader<R> {
    converter: RowConverter<R>,
    sep: String,
    quoted: bool,
}

impl<R> Clone for DelimitedReader<R> {
    fn clone(&self) -> Self {
        Self {
            converter: self.converter.clone(),
            sep: self.sep.clone(),
            quoted: self.quoted,
        }
    }
}

impl<R: Record> DelimitedReader<R> {
    pub fn new(converter: RowConverter<R>, sep: impl Into<String>) -> Self {
        Self {
            converter,
            sep: sep.into(),
            quoted: false,
        }
    }

    /// Honor quoted fields; needs a single-byte separator.
    #[cfg(feature = "io-csv")]
    #[must_use]
    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    #[must_use]
    pub fn converter(&self) -> &RowConverter<R> {
        &self.converter
    }

    pub fn read(&self, input: impl Into<TextInput>) -> DelimitedSession<R> {
        let source = DelimitedSource::new(input, self.sep.as_str());
        #[cfg(feature = "io-csv")]
        let source = source.quoted(self.quoted);
        Session::new(source, self.converter.clone())
    }
}

/// Reads JSON lines.
#[cfg(feature = "io-jsonl")]
pub struct JsonReader<T> {
    _out: std::marker::PhantomData<fn() -> T>,
}

#[cfg(feature = "io-jsonl")]
impl<T: serde::de::DeserializeOwned> JsonReader<T> {
    pub fn read(&self, input: impl Into<TextInput>) -> JsonSession<T> {
        Session::new(LineSource::new(input), JsonDecoder::new())
    }
}

/// Reads whole lines through a closure.
#[derive(Clone)]
pub struct SimpleReader<F> {
    decode: F,
}

impl<F: Clone> SimpleReader<F> {
    pub fn read<T>(&self, input: impl Into<TextInput>) -> Session<LineSource, FnDecoder<F>>
    where
        F: FnMut(String) -> Result<T>,
    {
        Session::new(LineSource::new(input), FnDecoder(self.decode.clone()))
    }
}

/// Reads typed spreadsheet rows.
pub struct SheetReader<R> {
    converter: RowConverter<R>,
}

impl<R> Clone for SheetReader<R> {
    fn clone(&self) -> Self {
        Self {
            converter: self.converter.clone(),
        }
    }
}

impl<R: Record> SheetReader<R> {
    pub fn read(&self, rows: Vec<SheetRow>) -> SheetSession<R> {
        Session::new(SheetSource::rows(rows), self.converter.clone())
    }

    /// The worksheet at `sheet` (zero-based) of an `.xlsx` workbook.
    #[cfg(feature = "io-xlsx")]
    pub fn read_xlsx(&self, path: impl Into<std::path::PathBuf>, sheet: usize) -> SheetSession<R> {
        Session::new(SheetSource::workbook(path, sheet), self.converter.clone())
    }
}
