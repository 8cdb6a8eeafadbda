//! JSON Lines decoding and encoding.
//!
//! Each line is one JSON document. Blank lines are skipped on read; records
//! are written one per line with no framing beyond the newline.

use crate::field::short_type_name;
use crate::session::Decode;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Decodes whole JSON lines into `T`.
pub struct JsonDecoder<T> {
    line: usize,
    _out: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: 0,
            _out: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Whether `line` has no JSON document to decode.
pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

impl<T: DeserializeOwned> Decode<String> for JsonDecoder<T> {
    type Output = T;

    fn decode(&mut self, line: String) -> Result<T> {
        self.line += 1;
        serde_json::from_str(&line).with_context(|| {
            format!(
                "parse JSON line {} as {}: {}",
                self.line,
                short_type_name::<T>(),
                line
            )
        })
    }

    fn skips(&self, line: &String) -> bool {
        is_blank(line)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Encode one record as a single JSON line (without the newline).
///
/// # Errors
///
/// Returns an error if `T` fails to serialize.
pub fn to_json_line<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .with_context(|| format!("serialize {} as JSON", short_type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn decodes_lines_and_numbers_errors() {
        let mut decoder = JsonDecoder::<Point>::new();
        assert_eq!(
            decoder.decode(r#"{"x":1,"y":2}"#.to_string()).unwrap(),
            Point { x: 1, y: 2 }
        );
        let err = decoder.decode("{".to_string()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn rejects_column_binding() {
        let mut decoder = JsonDecoder::<Point>::new();
        assert_eq!(
            decoder.bind(crate::ColumnBinding::before(2)),
            Err(crate::MapError::BindingUnsupported("json"))
        );
    }

    #[test]
    fn encodes_one_line() {
        assert_eq!(to_json_line(&Point { x: 3, y: 4 }).unwrap(), r#"{"x":3,"y":4}"#);
    }
}
