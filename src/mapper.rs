//! The [`DataMapper`] facade: one record type, one policy, one separator.

use crate::codec::Conversions;
use crate::converter::{RowConverter, RowJoiner};
use crate::error::MapError;
use crate::field::Record;
use crate::io::writer::LineWriter;
use crate::reader::DelimitedReader;
use crate::selection::SelectionPolicy;
use anyhow::Result;
use std::marker::PhantomData;

/// Separator used when none is given: U+02CC, which rarely occurs in data.
pub const DEFAULT_SEP: &str = "\u{02cc}";

/// Bundles the converter and joiner of `R` with a line separator.
pub struct DataMapper<R> {
    policy: SelectionPolicy,
    conversions: Conversions,
    sep: String,
    delimiter: Option<u8>,
    converter: RowConverter<R>,
    joiner: RowJoiner<R>,
}

impl<R> Clone for DataMapper<R> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            conversions: self.conversions.clone(),
            sep: self.sep.clone(),
            delimiter: self.delimiter,
            converter: self.converter.clone(),
            joiner: self.joiner.clone(),
        }
    }
}

impl<R: Record> DataMapper<R> {
    /// Mapper over the type-level policy of `R`.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if `R` cannot be both parsed and formatted.
    pub fn new(sep: impl Into<String>) -> Result<Self, MapError> {
        Self::builder().sep(sep).build()
    }

    #[must_use]
    pub fn builder() -> DataMapperBuilder<R> {
        DataMapperBuilder {
            policy: R::selection(),
            conversions: Conversions::new(),
            sep: DEFAULT_SEP.to_string(),
            quoted: false,
            _record: PhantomData,
        }
    }

    /// Same policy and conversions, different separator.
    ///
    /// # Errors
    ///
    /// [`MapError::QuotedSeparator`] if this mapper quotes and `sep` is not a
    /// single byte.
    pub fn with_sep(&self, sep: impl Into<String>) -> Result<Self, MapError> {
        let sep = sep.into();
        if sep == self.sep {
            return Ok(self.clone());
        }
        let delimiter = match self.delimiter {
            Some(_) => Some(single_byte(&sep)?),
            None => None,
        };
        Ok(Self {
            sep,
            delimiter,
            ..self.clone()
        })
    }

    /// Decode one line.
    ///
    /// # Errors
    ///
    /// Only quoted mappers fail, on malformed quoting.
    pub fn parse(&self, line: &str) -> Result<R> {
        let cells = self.split(line)?;
        Ok(self.converter.to_record(&cells))
    }

    /// Encode one record as a line.
    ///
    /// # Errors
    ///
    /// Only quoted mappers fail.
    pub fn format(&self, record: &R) -> Result<String> {
        self.join(&self.joiner.to_row(record))
    }

    /// Field names joined by the separator, for a header line.
    ///
    /// # Errors
    ///
    /// Only quoted mappers fail.
    pub fn join_fields(&self) -> Result<String> {
        self.join(&self.joiner.field_names())
    }

    /// Reader over this mapper's converter and separator.
    #[must_use]
    pub fn reader(&self) -> DelimitedReader<R> {
        let reader = DelimitedReader::new(self.converter.clone(), self.sep.as_str());
        #[cfg(feature = "io-csv")]
        let reader = reader.quoted(self.delimiter.is_some());
        reader
    }

    /// Writer formatting through [`DataMapper::format`];
    /// [`LineWriter::auto_header`] writes the field names.
    #[must_use]
    pub fn writer(&self) -> LineWriter<R> {
        let mapper = self.clone();
        let writer = LineWriter::try_new(move |record: &R| mapper.format(record));
        match self.join_fields() {
            Ok(header) => writer.with_field_header(header),
            Err(_) => writer,
        }
    }

    fn split(&self, line: &str) -> Result<Vec<String>> {
        #[cfg(feature = "io-csv")]
        if let Some(delimiter) = self.delimiter {
            let reader = Box::new(std::io::Cursor::new(line.to_owned()));
            return crate::io::csv::quoted_records(reader, delimiter)
                .next()
                .unwrap_or_else(|| Ok(Vec::new()));
        }
        Ok(line.split(self.sep.as_str()).map(str::to_string).collect())
    }

    fn join<S: AsRef<str>>(&self, cells: &[S]) -> Result<String> {
        #[cfg(feature = "io-csv")]
        if let Some(delimiter) = self.delimiter {
            return crate::io::csv::quote_join(cells, delimiter);
        }
        Ok(cells
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(&self.sep))
    }
}

impl<R> DataMapper<R> {
    #[must_use]
    pub fn sep(&self) -> &str {
        &self.sep
    }

    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.delimiter.is_some()
    }

    #[must_use]
    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    #[must_use]
    pub fn converter(&self) -> &RowConverter<R> {
        &self.converter
    }

    #[must_use]
    pub fn joiner(&self) -> &RowJoiner<R> {
        &self.joiner
    }
}

fn single_byte(sep: &str) -> Result<u8, MapError> {
    match sep.as_bytes() {
        [b] => Ok(*b),
        _ => Err(MapError::QuotedSeparator(sep.to_string())),
    }
}

/// Builder for [`DataMapper`]. Starts from the type-level selection of `R`.
pub struct DataMapperBuilder<R> {
    policy: SelectionPolicy,
    conversions: Conversions,
    sep: String,
    quoted: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DataMapperBuilder<R> {
    #[must_use]
    pub fn policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn private_fields(mut self) -> Self {
        self.policy = self.policy.private_fields();
        self
    }

    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = self.policy.include(names);
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = self.policy.exclude(names);
        self
    }

    #[must_use]
    pub fn include_regex(mut self, pattern: impl Into<String>) -> Self {
        self.policy = self.policy.include_regex(pattern);
        self
    }

    #[must_use]
    pub fn exclude_regex(mut self, pattern: impl Into<String>) -> Self {
        self.policy = self.policy.exclude_regex(pattern);
        self
    }

    /// Add conversions after any registered earlier.
    #[must_use]
    pub fn conversions(mut self, conversions: Conversions) -> Self {
        self.conversions = self.conversions.merge(conversions);
        self
    }

    #[must_use]
    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// Quote fields that contain the separator, quotes or newlines.
    #[cfg(feature = "io-csv")]
    #[must_use]
    pub fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    /// # Errors
    ///
    /// Returns a [`MapError`] if `R` cannot be both parsed and formatted under
    /// the policy, or if quoting is on with a multi-byte separator.
    pub fn build(self) -> Result<DataMapper<R>, MapError> {
        let delimiter = if self.quoted {
            Some(single_byte(&self.sep)?)
        } else {
            None
        };
        let converter = RowConverter::with(&self.policy, &self.conversions)?;
        let joiner = RowJoiner::with(&self.policy, &self.conversions)?;
        Ok(DataMapper {
            policy: self.policy,
            conversions: self.conversions,
            sep: self.sep,
            delimiter,
            converter,
            joiner,
        })
    }
}
