//! Column bindings: which raw slot feeds which planned field.
//!
//! Field `i` of a plan reads slot `slots[i]`. A converter without a binding
//! reads slot `i` for field `i`.

use crate::error::MapError;

/// Slot array mapping plan ordinals to row slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColumnBinding {
    slots: Vec<usize>,
}

impl ColumnBinding {
    #[must_use]
    pub fn new(slots: Vec<usize>) -> Self {
        Self { slots }
    }

    /// Slots `start..before`.
    #[must_use]
    pub fn range(start: usize, before: usize) -> Self {
        Self::new((start..before).collect())
    }

    /// Slots `0..n`.
    #[must_use]
    pub fn before(n: usize) -> Self {
        Self::range(0, n)
    }

    /// Parse spreadsheet-style column letters, e.g. `"A, C, AA"`.
    ///
    /// Returns `Ok(None)` for blank input, meaning no binding.
    ///
    /// # Errors
    ///
    /// [`MapError::InvalidColumn`] if any entry is not a run of `A`-`Z`.
    pub fn from_letters(spec: &str) -> Result<Option<Self>, MapError> {
        if spec.trim().is_empty() {
            return Ok(None);
        }
        let slots = spec
            .split(',')
            .map(|letters| column_index(letters.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Self::new(slots)))
    }

    /// Resolve `requested` names against a header row by exact match.
    ///
    /// # Errors
    ///
    /// [`MapError::MissingColumn`] for the first requested name not in `header`.
    pub fn from_header<S: AsRef<str>>(
        header: &[String],
        requested: &[S],
    ) -> Result<Self, MapError> {
        let slots = requested
            .iter()
            .map(|name| {
                let name = name.as_ref();
                header
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| MapError::MissingColumn {
                        column: name.to_string(),
                        header: header.to_vec(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(slots))
    }

    #[must_use]
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Slot for plan ordinal `ordinal`.
    #[must_use]
    pub fn slot(&self, ordinal: usize) -> Option<usize> {
        self.slots.get(ordinal).copied()
    }
}

impl From<Vec<usize>> for ColumnBinding {
    fn from(slots: Vec<usize>) -> Self {
        Self::new(slots)
    }
}

/// Zero-based index of spreadsheet column letters (bijective base 26).
///
/// `A` is 0, `Z` is 25, `AA` is 26, `AZ` is 51, `BA` is 52.
///
/// # Errors
///
/// [`MapError::InvalidColumn`] for empty input or anything outside `A`-`Z`.
pub fn column_index(letters: &str) -> Result<usize, MapError> {
    if letters.is_empty() {
        return Err(MapError::InvalidColumn(letters.to_string()));
    }
    let mut number: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return Err(MapError::InvalidColumn(letters.to_string()));
        }
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(usize::from(b - b'A') + 1))
            .ok_or_else(|| MapError::InvalidColumn(letters.to_string()))?;
    }
    Ok(number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_bijective_base_26() {
        for (letters, index) in [("A", 0), ("Z", 25), ("AA", 26), ("AZ", 51), ("BA", 52)] {
            assert_eq!(column_index(letters).unwrap(), index, "{letters}");
        }
    }

    #[test]
    fn letter_lists_are_trimmed() {
        let binding = ColumnBinding::from_letters(" A, C ,AA").unwrap().unwrap();
        assert_eq!(binding.slots(), &[0, 2, 26]);
        assert_eq!(ColumnBinding::from_letters("  ").unwrap(), None);
    }

    #[test]
    fn bad_letters_are_rejected() {
        assert!(matches!(
            ColumnBinding::from_letters("A,b"),
            Err(MapError::InvalidColumn(s)) if s == "b"
        ));
        assert!(ColumnBinding::from_letters("A,,B").is_err());
    }

    #[test]
    fn header_match_reorders() {
        let header = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let binding = ColumnBinding::from_header(&header, &["a", "b"]).unwrap();
        assert_eq!(binding.slots(), &[1, 0]);
    }

    #[test]
    fn ranges() {
        assert_eq!(ColumnBinding::range(2, 5).slots(), &[2, 3, 4]);
        assert_eq!(ColumnBinding::before(2).slots(), &[0, 1]);
    }
}
