//! Temporary files and directories for I/O tests.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// A temporary directory removed on drop.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside this directory; the file is not created.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// A temporary file removed on drop.
pub struct TempFilePath {
    #[allow(dead_code)]
    temp_file: NamedTempFile,
    path: PathBuf,
}

impl TempFilePath {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `text` to a fresh temporary file ending in `.{extension}`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
///
/// ```
/// use lineio::testing::write_temp_text;
///
/// let file = write_temp_text("a,b\n", "csv").unwrap();
/// assert!(file.path().to_string_lossy().ends_with(".csv"));
/// ```
pub fn write_temp_text(text: &str, extension: &str) -> std::io::Result<TempFilePath> {
    let mut temp_file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    temp_file.write_all(text.as_bytes())?;
    temp_file.flush()?;
    let path = temp_file.path().to_path_buf();
    Ok(TempFilePath { temp_file, path })
}
