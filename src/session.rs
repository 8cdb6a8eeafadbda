//! Lazy, restartable decoding sessions.
//!
//! A [`Session`] pairs a [`RowSource`] with a [`Decode`] implementation and a
//! [`SessionConfig`]. Nothing is opened until the first pull: that pull opens
//! the source, discards the configured number of rows, resolves the column
//! binding (from the header row when named columns are requested) and then
//! decodes one row per pull.
//!
//! Errors whose cause chain matches a registered filter end the sequence
//! cleanly; everything already yielded stays valid. Any other error is
//! yielded once and ends the sequence. Configuration errors ([`MapError`])
//! are never filtered.

use crate::columns::ColumnBinding;
use crate::converter::RowConverter;
use crate::error::MapError;
use crate::field::Record;
use crate::row::Row;
use crate::seq::DataSeq;
use crate::source::{RowSource, Rows};
use anyhow::Result;
use std::error::Error as StdError;
use std::sync::Arc;

/// Turns one raw row into an output value.
pub trait Decode<V> {
    type Output;

    /// Decode one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be decoded at all.
    fn decode(&mut self, raw: V) -> Result<Self::Output>;

    /// Rows dropped without decoding, such as blank lines.
    fn skips(&self, _raw: &V) -> bool {
        false
    }

    /// Short label used in binding errors.
    fn name(&self) -> &'static str {
        "decoder"
    }

    /// Apply an explicit column binding.
    ///
    /// # Errors
    ///
    /// [`MapError::BindingUnsupported`] unless the decoder works on columns.
    fn bind(&mut self, _binding: ColumnBinding) -> Result<(), MapError> {
        Err(MapError::BindingUnsupported(self.name()))
    }

    /// Bind `requested` names against the header row.
    ///
    /// # Errors
    ///
    /// [`MapError::BindingUnsupported`] unless the decoder works on columns.
    fn bind_header(&mut self, _header: &V, _requested: &[String]) -> Result<(), MapError> {
        Err(MapError::BindingUnsupported(self.name()))
    }
}

impl<R: Record, W: Row> Decode<W> for RowConverter<R> {
    type Output = R;

    fn decode(&mut self, raw: W) -> Result<R> {
        Ok(self.to_record(&raw))
    }

    fn name(&self) -> &'static str {
        self.plan().record()
    }

    fn bind(&mut self, binding: ColumnBinding) -> Result<(), MapError> {
        self.reset_order(binding)
    }

    fn bind_header(&mut self, header: &W, requested: &[String]) -> Result<(), MapError> {
        RowConverter::bind_header(self, &header.header_names(), requested)
    }
}

/// Decoder backed by a closure over whole rows.
#[derive(Clone)]
pub struct FnDecoder<F>(pub F);

impl<V, T, F> Decode<V> for FnDecoder<F>
where
    F: FnMut(V) -> Result<T>,
{
    type Output = T;

    fn decode(&mut self, raw: V) -> Result<T> {
        (self.0)(raw)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}

/// Settings applied when a session starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Rows discarded before anything else is read.
    pub skip: usize,
    /// Header names to bind, in plan order. Takes precedence over `slots`.
    pub columns: Vec<String>,
    /// Explicit column binding.
    pub slots: Option<ColumnBinding>,
}

type ErrorFilter = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

enum State<W> {
    Configuring,
    Iterating(Rows<W>),
    Exhausted,
}

/// Lazy decoding of a row source.
pub struct Session<S: RowSource, D> {
    source: S,
    decoder: D,
    config: SessionConfig,
    filters: Vec<ErrorFilter>,
    state: State<S::Row>,
}

impl<S, D> Session<S, D>
where
    S: RowSource,
    D: Decode<S::Row>,
{
    pub fn new(source: S, decoder: D) -> Self {
        Self {
            source,
            decoder,
            config: SessionConfig::default(),
            filters: Vec::new(),
            state: State::Configuring,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn skip_lines(mut self, n: usize) -> Self {
        self.config.skip = n;
        self
    }

    /// Bind fields to these header names; the first row after skipping is
    /// read as the header.
    #[must_use]
    pub fn columns<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.config.columns = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn slots(mut self, binding: impl Into<ColumnBinding>) -> Self {
        self.config.slots = Some(binding.into());
        self
    }

    /// Read fields from slots `start..before`.
    #[must_use]
    pub fn columns_range(self, start: usize, before: usize) -> Self {
        self.slots(ColumnBinding::range(start, before))
    }

    /// Read fields from slots `0..n`.
    #[must_use]
    pub fn columns_before(self, n: usize) -> Self {
        self.slots(ColumnBinding::before(n))
    }

    /// Read fields from spreadsheet columns such as `"A,C,AA"`. Blank input
    /// leaves the binding unchanged.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidColumn`] for malformed letters.
    pub fn excel_columns(mut self, letters: &str) -> Result<Self, MapError> {
        if let Some(binding) = ColumnBinding::from_letters(letters)? {
            self.config.slots = Some(binding);
        }
        Ok(self)
    }

    /// End the sequence cleanly when an error of type `E` appears anywhere in
    /// the cause chain.
    #[must_use]
    pub fn ignore_error<E>(self) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.ignore_errors_where(|e| e.chain().any(|cause| cause.is::<E>()))
    }

    /// End the sequence cleanly when `filter` accepts an error.
    #[must_use]
    pub fn ignore_errors_where<F>(mut self, filter: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Open the source, skip rows and resolve the binding.
    ///
    /// Called by the first pull; calling it directly surfaces configuration
    /// errors such as a missing header column before any value is requested.
    ///
    /// # Errors
    ///
    /// Returns the open, skip or binding error. Filters do not apply here.
    pub fn start(&mut self) -> Result<()> {
        let mut rows = self.source.open()?;
        for _ in 0..self.config.skip {
            match rows.next() {
                Some(row) => drop(row?),
                None => break,
            }
        }
        if !self.config.columns.is_empty() {
            if let Some(header) = rows.next() {
                self.decoder.bind_header(&header?, &self.config.columns)?;
            }
        } else if let Some(binding) = &self.config.slots {
            self.decoder.bind(binding.clone())?;
        }
        tracing::debug!(
            decoder = self.decoder.name(),
            skip = self.config.skip,
            columns = ?self.config.columns,
            "session started"
        );
        self.state = State::Iterating(rows);
        Ok(())
    }

    /// Return to the configuring state; the next pull reopens the source.
    ///
    /// Path and in-memory inputs replay from the beginning. A reader input
    /// has already been consumed and yields nothing.
    pub fn restart(&mut self) {
        self.state = State::Configuring;
    }

    /// Collect every decoded value.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not filtered.
    pub fn collect_vec(self) -> Result<Vec<D::Output>> {
        self.collect()
    }

    fn suppressed(&self, error: &anyhow::Error) -> bool {
        let config_error = error.chain().any(|cause| cause.is::<MapError>());
        !config_error && self.filters.iter().any(|filter| filter(error))
    }

    fn surface(&mut self, error: anyhow::Error) -> Option<Result<D::Output>> {
        if self.suppressed(&error) {
            tracing::debug!(error = %error, "session ended by ignored error");
            self.state = State::Exhausted;
            None
        } else {
            self.state = State::Exhausted;
            Some(Err(error))
        }
    }
}

impl<S, D> Session<S, D>
where
    S: RowSource + 'static,
    D: Decode<S::Row> + 'static,
    D::Output: 'static,
{
    /// Hand the session over as a one-shot sequence.
    pub fn into_seq(self) -> DataSeq<D::Output> {
        DataSeq::from_results(self)
    }
}

impl<S, D> Iterator for Session<S, D>
where
    S: RowSource,
    D: Decode<S::Row>,
{
    type Item = Result<D::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Configuring)
            && let Err(error) = self.start()
        {
            self.state = State::Exhausted;
            return self.surface(error);
        }
        loop {
            let State::Iterating(rows) = &mut self.state else {
                return None;
            };
            let raw = match rows.next() {
                None => {
                    self.state = State::Exhausted;
                    return None;
                }
                Some(Err(error)) => return self.surface(error),
                Some(Ok(raw)) => raw,
            };
            if self.decoder.skips(&raw) {
                continue;
            }
            return match self.decoder.decode(raw) {
                Ok(value) => Some(Ok(value)),
                Err(error) => self.surface(error),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{LineSource, TextInput};

    fn numbers(text: &str) -> Session<LineSource, FnDecoder<impl FnMut(String) -> Result<i32>>> {
        Session::new(
            LineSource::new(TextInput::text(text)),
            FnDecoder(|line: String| Ok(line.trim().parse::<i32>()?)),
        )
    }

    #[test]
    fn nothing_happens_before_first_pull() {
        let mut session = Session::new(
            LineSource::new(std::path::PathBuf::from("/no/such/file")),
            FnDecoder(|line: String| Ok(line)),
        );
        assert!(session.next().unwrap().is_err());
        assert!(session.next().is_none());
    }

    #[test]
    fn skip_then_decode() {
        let values = numbers("header\n1\n2").skip_lines(1).collect_vec().unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn filtered_error_ends_cleanly() {
        let values = numbers("1\n2\nx\n3")
            .ignore_error::<std::num::ParseIntError>()
            .collect_vec()
            .unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn unfiltered_error_is_yielded_once_then_ends() {
        let mut session = numbers("1\nx\n3");
        assert_eq!(session.next().unwrap().unwrap(), 1);
        assert!(session.next().unwrap().is_err());
        assert!(session.next().is_none());
    }

    #[test]
    fn closures_reject_binding() {
        let mut session = numbers("1").columns_before(1).ignore_errors_where(|_| true);
        let err = session.next().unwrap().unwrap_err();
        assert_eq!(
            err.downcast_ref::<MapError>(),
            Some(&MapError::BindingUnsupported("closure"))
        );
    }

    #[test]
    fn restart_replays_text() {
        let mut session = numbers("1\n2");
        assert_eq!(session.by_ref().count(), 2);
        session.restart();
        assert_eq!(session.count(), 2);
    }
}
