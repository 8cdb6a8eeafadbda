//! Line-oriented output.
//!
//! A [`LineWriter`] formats each record into one line and writes the lines
//! to a file, optionally preceded by header lines and a UTF-8 BOM. Headers and
//! the BOM are only written when the file is created, never when appending.

use crate::io::compression::auto_detect_writer;
use anyhow::{Context, Result};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Formatter<T> = Arc<dyn Fn(&T) -> Result<String> + Send + Sync>;

/// Output options of a [`LineWriter`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriterConfig {
    /// Lines written before the records.
    pub headers: Vec<String>,
    /// Prefix `.csv` files with a UTF-8 byte order mark.
    pub utf8_bom: bool,
    pub append: bool,
}

/// Writes records as lines.
pub struct LineWriter<T> {
    format: Formatter<T>,
    field_header: Option<String>,
    config: WriterConfig,
}

impl<T> Clone for LineWriter<T> {
    fn clone(&self) -> Self {
        Self {
            format: Arc::clone(&self.format),
            field_header: self.field_header.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> LineWriter<T> {
    pub fn new<F>(format: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::try_new(move |item| Ok(format(item)))
    }

    /// Writer whose formatter can fail; the first failure aborts the write.
    pub fn try_new<F>(format: F) -> Self
    where
        F: Fn(&T) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            format: Arc::new(format),
            field_header: None,
            config: WriterConfig::default(),
        }
    }

    /// One JSON document per line.
    #[cfg(feature = "io-jsonl")]
    #[must_use]
    pub fn json() -> Self
    where
        T: serde::Serialize + 'static,
    {
        Self::try_new(crate::io::jsonl::to_json_line::<T>)
    }

    /// Remember the header that [`LineWriter::auto_header`] writes.
    #[must_use]
    pub(crate) fn with_field_header(mut self, header: String) -> Self {
        self.field_header = Some(header);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a header line.
    #[must_use]
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.config.headers.push(line.into());
        self
    }

    /// Add the field-name header line, if this writer knows one.
    #[must_use]
    pub fn auto_header(mut self) -> Self {
        if let Some(header) = self.field_header.clone() {
            self.config.headers.push(header);
        }
        self
    }

    #[must_use]
    pub fn utf8_bom(mut self, on: bool) -> Self {
        self.config.utf8_bom = on;
        self
    }

    #[must_use]
    pub fn append(mut self, on: bool) -> Self {
        self.config.append = on;
        self
    }

    #[must_use]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Format one record.
    ///
    /// # Errors
    ///
    /// Returns the formatter's error.
    pub fn format(&self, item: &T) -> Result<String> {
        (self.format)(item)
    }

    /// Write `items` to `path`, creating parent directories as needed.
    ///
    /// # Returns
    /// The number of records written.
    ///
    /// # Errors
    ///
    /// Returns an error if a record fails to format or the file cannot be
    /// written.
    pub fn write<'a, I>(&self, path: impl AsRef<Path>, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let lines = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                self.format(item)
                    .with_context(|| format!("format record #{}", i + 1))
            });
        write_lines(path.as_ref(), &self.config, lines)
    }

    /// Format `items` now and write them on a rayon worker.
    ///
    /// The caller does not observe completion; write failures are logged.
    ///
    /// # Errors
    ///
    /// Returns an error if a record fails to format.
    pub fn write_async<'a, I>(&self, path: impl Into<PathBuf>, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let lines = items
            .into_iter()
            .map(|item| self.format(item))
            .collect::<Result<Vec<_>>>()?;
        let path = path.into();
        let config = self.config.clone();
        rayon::spawn(move || {
            if let Err(error) = write_lines(&path, &config, lines.into_iter().map(Ok)) {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{error:#}"),
                    "background write failed"
                );
            }
        });
        Ok(())
    }
}

fn write_lines<I>(path: &Path, config: &WriterConfig, lines: I) -> Result<usize>
where
    I: Iterator<Item = Result<String>>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = OpenOptions::new()
        .create(true)
        .write(true)
        .append(config.append)
        .truncate(!config.append)
        .open(path)
        .with_context(|| format!("create {}", path.display()))?;
    let mut w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;

    if !config.append {
        let is_csv = path.extension().is_some_and(|ext| ext == "csv");
        if config.utf8_bom && is_csv {
            w.write_all("\u{feff}".as_bytes())?;
        }
        for header in &config.headers {
            writeln!(w, "{header}").with_context(|| format!("write header to {}", path.display()))?;
        }
    }

    let mut n = 0;
    for line in lines {
        writeln!(w, "{}", line?).with_context(|| format!("write line to {}", path.display()))?;
        n += 1;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn headers_and_bom_only_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let writer = LineWriter::new(|n: &i32| n.to_string())
            .header("n")
            .utf8_bom(true);

        assert_eq!(writer.write(&path, &[1, 2]).unwrap(), 2);
        writer.clone().append(true).write(&path, &[3]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "\u{feff}n\n1\n2\n3\n");
    }

    #[test]
    fn bom_is_skipped_for_other_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        LineWriter::new(|s: &String| s.clone())
            .utf8_bom(true)
            .write(&path, &["a".to_string()])
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }
}
