//! File-backed memoization of expensive sequences.
//!
//! [`Cacheable::cache_by`] checks the cache once. When the side file exists
//! the result is replayed from it and the upstream is never pulled. Otherwise
//! the upstream is materialized, written out if it produced anything, and the
//! in-memory list is returned as a reusable sequence.
//!
//! ```no_run
//! use lineio::{Cacheable, DataMapper, DataSeq};
//! # use lineio::testing::fixtures::{sample_people, Person};
//! # fn main() -> anyhow::Result<()> {
//! let mapper = DataMapper::<Person>::new(",")?;
//! let people = DataSeq::defer(|| sample_people().into_iter().map(Ok))
//!     .cache_csv("/tmp/people", &mapper)?;
//! # Ok(())
//! # }
//! ```

use crate::field::Record;
use crate::io::writer::LineWriter;
use crate::mapper::DataMapper;
use crate::seq::DataSeq;
use crate::session::{Decode, Session};
use crate::source::RowSource;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(feature = "io-jsonl")]
use serde::{Serialize, de::DeserializeOwned};

/// A persisted copy of a sequence.
pub trait Cache<T> {
    fn exists(&self) -> bool;

    /// Replay the persisted values.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be opened.
    fn read(&self) -> Result<DataSeq<T>>;

    /// Persist `items`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be written.
    fn write(&self, items: &[T]) -> Result<()>;
}

/// How cache files are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Written before the computed values are returned.
    #[default]
    Sync,
    /// Lines are formatted on the caller thread and written on a rayon worker.
    /// An immediate re-read of the same path may see a partial file.
    Async,
}

/// Options of the file caches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Write a field-name header; it is matched by name on replay.
    pub header: bool,
    pub write_mode: WriteMode,
    /// Prefix the file with a UTF-8 byte order mark.
    pub utf8_bom: bool,
}

/// A lazy or materialized sequence that can be memoized.
pub trait Cacheable<T: 'static>: Sized {
    /// Pull every value.
    ///
    /// # Errors
    ///
    /// Returns the first upstream error.
    fn materialize(self) -> Result<Vec<T>>;

    /// Replay `cache` if it exists, otherwise compute, persist and return.
    ///
    /// # Errors
    ///
    /// Returns upstream, read or write errors.
    fn cache_by<C: Cache<T> + ?Sized>(self, cache: &C) -> Result<DataSeq<T>> {
        if cache.exists() {
            tracing::debug!("cache hit, replaying");
            return cache.read();
        }
        tracing::debug!("cache miss, computing upstream");
        let items = self.materialize()?;
        if !items.is_empty() {
            cache.write(&items)?;
        }
        Ok(DataSeq::Reusable(items))
    }

    /// Memoize as delimited text at `base` plus `.csv`.
    ///
    /// # Errors
    ///
    /// See [`Cacheable::cache_by`].
    fn cache_csv(self, base: impl AsRef<Path>, mapper: &DataMapper<T>) -> Result<DataSeq<T>>
    where
        T: Record,
    {
        self.cache_by(&TabularCache::new(base, mapper.clone()))
    }

    /// Memoize as JSON lines at `base` plus `.jsonl`.
    ///
    /// # Errors
    ///
    /// See [`Cacheable::cache_by`].
    #[cfg(feature = "io-jsonl")]
    fn cache_jsonl(self, base: impl AsRef<Path>) -> Result<DataSeq<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.cache_by(&JsonLinesCache::new(base))
    }
}

impl<T: 'static> Cacheable<T> for DataSeq<T> {
    fn materialize(self) -> Result<Vec<T>> {
        self.to_vec()
    }
}

impl<S, D> Cacheable<D::Output> for Session<S, D>
where
    S: RowSource,
    D: Decode<S::Row>,
    D::Output: 'static,
{
    fn materialize(self) -> Result<Vec<D::Output>> {
        self.collect_vec()
    }
}

/// `base` with `suffix` appended unless it already ends with it.
#[must_use]
pub fn cache_path(base: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let base = base.as_ref();
    if base.to_string_lossy().ends_with(suffix) {
        return base.to_path_buf();
    }
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_with<T>(writer: LineWriter<T>, path: &Path, mode: WriteMode, items: &[T]) -> Result<()> {
    match mode {
        WriteMode::Sync => {
            let n = writer.write(path, items)?;
            tracing::debug!(path = %path.display(), records = n, "cache written");
            Ok(())
        }
        WriteMode::Async => writer.write_async(path, items),
    }
}

/// Delimited-text cache decoded and encoded through a [`DataMapper`].
pub struct TabularCache<R> {
    path: PathBuf,
    mapper: DataMapper<R>,
    config: CacheConfig,
}

impl<R: Record> TabularCache<R> {
    pub fn new(base: impl AsRef<Path>, mapper: DataMapper<R>) -> Self {
        Self {
            path: cache_path(base, ".csv"),
            mapper,
            config: CacheConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Record> Cache<R> for TabularCache<R> {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<DataSeq<R>> {
        let mut session = self.mapper.reader().read(self.path.clone());
        if self.config.header {
            session = session.columns(self.mapper.joiner().field_names());
        }
        Ok(session.into_seq())
    }

    fn write(&self, items: &[R]) -> Result<()> {
        let mut writer = self.mapper.writer().utf8_bom(self.config.utf8_bom);
        if self.config.header {
            writer = writer.auto_header();
        }
        write_with(writer, &self.path, self.config.write_mode, items)
    }
}

/// JSON-lines cache, one serialized record per line.
#[cfg(feature = "io-jsonl")]
pub struct JsonLinesCache<T> {
    path: PathBuf,
    write_mode: WriteMode,
    _record: std::marker::PhantomData<fn() -> T>,
}

#[cfg(feature = "io-jsonl")]
impl<T> JsonLinesCache<T> {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            path: cache_path(base, ".jsonl"),
            write_mode: WriteMode::Sync,
            _record: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(feature = "io-jsonl")]
impl<T> Cache<T> for JsonLinesCache<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<DataSeq<T>> {
        Ok(crate::reader::LineReader::json::<T>()
            .read(self.path.clone())
            .into_seq())
    }

    fn write(&self, items: &[T]) -> Result<()> {
        write_with(LineWriter::json(), &self.path, self.write_mode, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_appended_once() {
        assert_eq!(cache_path("out/people", ".csv"), PathBuf::from("out/people.csv"));
        assert_eq!(cache_path("out/people.csv", ".csv"), PathBuf::from("out/people.csv"));
        assert_eq!(cache_path("a.b", ".jsonl"), PathBuf::from("a.b.jsonl"));
    }
}
