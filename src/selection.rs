//! Field selection policies.
//!
//! A [`SelectionPolicy`] carries four mutually exclusive knobs plus the
//! private-fields toggle. Only one knob is honored, resolved in this order:
//! include names, exclude names, include regex, exclude regex, otherwise every
//! field. Empty lists and empty patterns count as unset.

use crate::error::MapError;
use regex::Regex;
use std::collections::HashSet;

/// Which fields of a record participate in mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectionPolicy {
    /// Use private fields instead of public ones.
    pub private_fields: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_regex: Option<String>,
    pub exclude_regex: Option<String>,
}

impl SelectionPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn private_fields(mut self) -> Self {
        self.private_fields = true;
        self
    }

    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn include_regex(mut self, pattern: impl Into<String>) -> Self {
        self.include_regex = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn exclude_regex(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_regex = Some(pattern.into());
        self
    }

    /// Compile the single active predicate.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidRegex`] if the active pattern does not compile.
    pub fn compile(&self) -> Result<Selection, MapError> {
        if !self.include.is_empty() {
            return Ok(Selection::Include(self.include.iter().cloned().collect()));
        }
        if !self.exclude.is_empty() {
            return Ok(Selection::Exclude(self.exclude.iter().cloned().collect()));
        }
        if let Some(pattern) = self.include_regex.as_deref().filter(|p| !p.is_empty()) {
            return Ok(Selection::IncludeRegex(whole_match(pattern)?));
        }
        if let Some(pattern) = self.exclude_regex.as_deref().filter(|p| !p.is_empty()) {
            return Ok(Selection::ExcludeRegex(whole_match(pattern)?));
        }
        Ok(Selection::All)
    }
}

/// Compiled predicate of a [`SelectionPolicy`].
#[derive(Clone, Debug)]
pub enum Selection {
    All,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
    IncludeRegex(Regex),
    ExcludeRegex(Regex),
}

impl Selection {
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(names) => names.contains(name),
            Self::Exclude(names) => !names.contains(name),
            Self::IncludeRegex(re) => re.is_match(name),
            Self::ExcludeRegex(re) => !re.is_match(name),
        }
    }
}

// Field names must match the pattern as a whole, not a substring of it.
fn whole_match(pattern: &str) -> Result<Regex, MapError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| MapError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_takes_precedence_over_everything() {
        let sel = SelectionPolicy::new()
            .include(["a"])
            .exclude(["a"])
            .include_regex("b.*")
            .compile()
            .unwrap();
        assert!(sel.matches("a"));
        assert!(!sel.matches("b1"));
    }

    #[test]
    fn empty_knobs_fall_through() {
        let sel = SelectionPolicy::new()
            .include(Vec::<String>::new())
            .include_regex("")
            .exclude_regex("tmp_.*")
            .compile()
            .unwrap();
        assert!(sel.matches("name"));
        assert!(!sel.matches("tmp_x"));
    }

    #[test]
    fn regex_is_anchored() {
        let sel = SelectionPolicy::new().include_regex("na").compile().unwrap();
        assert!(sel.matches("na"));
        assert!(!sel.matches("name"));
    }

    #[test]
    fn bad_regex_is_a_configuration_error() {
        let err = SelectionPolicy::new().include_regex("(").compile().unwrap_err();
        assert!(matches!(err, MapError::InvalidRegex { .. }));
    }
}
