//! Row to record conversion and its inverse.
//!
//! [`RowConverter`] fills a fresh record from a raw row, reading field `i` from
//! the slot its [`ColumnBinding`] names. Cell failures never abort a row: the
//! field keeps its default value and the failure is reported to the optional
//! diagnostic hook. [`RowJoiner`] formats a record back into ordered cells.

use crate::codec::{Attr, Conversions, bind_attrs};
use crate::columns::ColumnBinding;
use crate::error::{MapError, ParseError};
use crate::field::Record;
use crate::plan::FieldPlan;
use crate::row::Row;
use crate::selection::SelectionPolicy;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cell that could not be assigned to its field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldIssue {
    pub record: &'static str,
    pub field: &'static str,
    /// Row slot the field was read from.
    pub slot: Option<usize>,
    pub error: ParseError,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Some(slot) => write!(
                f,
                "{}.{} (slot {slot}): {}",
                self.record, self.field, self.error
            ),
            None => write!(f, "{}.{} (unbound): {}", self.record, self.field, self.error),
        }
    }
}

type IssueHook = Arc<dyn Fn(&FieldIssue) + Send + Sync>;

fn build_attrs<R: Record>(
    policy: &SelectionPolicy,
    conversions: &Conversions,
) -> Result<(Arc<FieldPlan<R>>, Arc<[Attr<R>]>), MapError> {
    let plan = FieldPlan::<R>::build(policy)?;
    let conversions = R::conversions().merge(conversions.clone());
    let attrs = bind_attrs(plan.descriptors(), plan.fields(), &conversions)?;
    Ok((plan, attrs.into()))
}

/// Decodes raw rows into records of type `R`.
pub struct RowConverter<R> {
    plan: Arc<FieldPlan<R>>,
    attrs: Arc<[Attr<R>]>,
    binding: Option<ColumnBinding>,
    started: AtomicBool,
    on_issue: Option<IssueHook>,
}

impl<R> Clone for RowConverter<R> {
    /// The clone has the same binding but has not converted any row yet.
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
            attrs: Arc::clone(&self.attrs),
            binding: self.binding.clone(),
            started: AtomicBool::new(false),
            on_issue: self.on_issue.clone(),
        }
    }
}

impl<R: Record> RowConverter<R> {
    /// Converter for the type-level selection and conversions of `R`.
    ///
    /// # Errors
    ///
    /// [`MapError::NoParser`] if a planned field has no way to be parsed.
    pub fn new() -> Result<Self, MapError> {
        Self::with(&R::selection(), &Conversions::new())
    }

    /// Converter for an explicit policy. `conversions` are registered after
    /// the type-level ones of `R`, so they take precedence.
    ///
    /// # Errors
    ///
    /// [`MapError::NoParser`] if a planned field has no way to be parsed, or
    /// [`MapError::InvalidRegex`] for a bad selection pattern.
    pub fn with(policy: &SelectionPolicy, conversions: &Conversions) -> Result<Self, MapError> {
        let (plan, attrs) = build_attrs::<R>(policy, conversions)?;
        if let Some(attr) = attrs.iter().find(|a| !a.can_parse()) {
            return Err(MapError::NoParser {
                record: plan.record(),
                field: attr.name(),
                type_name: attr.type_name(),
            });
        }
        Ok(Self {
            plan,
            attrs,
            binding: None,
            started: AtomicBool::new(false),
            on_issue: None,
        })
    }

    /// Build a fresh record from `row`.
    ///
    /// Fields whose slot is past the end of the row, or whose cell fails to
    /// decode, keep their default value.
    pub fn to_record<W: Row + ?Sized>(&self, row: &W) -> R {
        self.started.store(true, Ordering::Relaxed);
        let mut record = R::default();
        for (ordinal, attr) in self.attrs.iter().enumerate() {
            let slot = match &self.binding {
                Some(binding) => binding.slot(ordinal),
                None => Some(ordinal),
            };
            let outcome = match slot {
                Some(slot) => attr
                    .decode(row.cell(slot))
                    .and_then(|value| attr.assign(&mut record, value)),
                None => Err(ParseError::Absent),
            };
            if let Err(error) = outcome {
                self.report(FieldIssue {
                    record: self.plan.record(),
                    field: attr.name(),
                    slot,
                    error,
                });
            }
        }
        record
    }
}

impl<R> RowConverter<R> {
    /// Install a diagnostic hook called for every cell left at its default.
    #[must_use]
    pub fn on_field_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldIssue) + Send + Sync + 'static,
    {
        self.on_issue = Some(Arc::new(hook));
        self
    }

    /// Replace the column binding.
    ///
    /// # Errors
    ///
    /// [`MapError::BindingLocked`] if a row has already been converted and the
    /// new binding differs from the active one.
    pub fn reset_order(&mut self, binding: impl Into<ColumnBinding>) -> Result<(), MapError> {
        let binding = binding.into();
        if self.started.load(Ordering::Relaxed) && self.binding.as_ref() != Some(&binding) {
            return Err(MapError::BindingLocked(self.plan.record()));
        }
        self.binding = Some(binding);
        Ok(())
    }

    /// Bind `requested` column names against a header row.
    ///
    /// # Errors
    ///
    /// [`MapError::MissingColumn`] for the first name not in `header`, or
    /// [`MapError::BindingLocked`] as for [`RowConverter::reset_order`].
    pub fn bind_header<S: AsRef<str>>(
        &mut self,
        header: &[String],
        requested: &[S],
    ) -> Result<(), MapError> {
        let binding = ColumnBinding::from_header(header, requested)?;
        tracing::debug!(
            record = self.plan.record(),
            slots = ?binding.slots(),
            "bound columns from header"
        );
        self.reset_order(binding)
    }

    #[must_use]
    pub fn binding(&self) -> Option<&ColumnBinding> {
        self.binding.as_ref()
    }

    #[must_use]
    pub fn plan(&self) -> &FieldPlan<R> {
        &self.plan
    }

    /// Whether any row has been converted.
    #[must_use]
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    fn report(&self, issue: FieldIssue) {
        tracing::trace!(%issue, "field left at default");
        if let Some(hook) = &self.on_issue {
            hook(&issue);
        }
    }
}

/// Formats records of type `R` into ordered cells.
pub struct RowJoiner<R> {
    plan: Arc<FieldPlan<R>>,
    attrs: Arc<[Attr<R>]>,
}

impl<R> Clone for RowJoiner<R> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
            attrs: Arc::clone(&self.attrs),
        }
    }
}

impl<R: Record> RowJoiner<R> {
    /// Joiner for the type-level selection and conversions of `R`.
    ///
    /// # Errors
    ///
    /// [`MapError::NoFormatter`] if a planned field has no way to be formatted.
    pub fn new() -> Result<Self, MapError> {
        Self::with(&R::selection(), &Conversions::new())
    }

    /// Joiner for an explicit policy and extra conversions.
    ///
    /// # Errors
    ///
    /// [`MapError::NoFormatter`] or [`MapError::InvalidRegex`].
    pub fn with(policy: &SelectionPolicy, conversions: &Conversions) -> Result<Self, MapError> {
        let (plan, attrs) = build_attrs::<R>(policy, conversions)?;
        if let Some(attr) = attrs.iter().find(|a| !a.can_format()) {
            return Err(MapError::NoFormatter {
                record: plan.record(),
                field: attr.name(),
                type_name: attr.type_name(),
            });
        }
        Ok(Self { plan, attrs })
    }
}

impl<R> RowJoiner<R> {
    /// Formatted cells of `record` in plan order.
    pub fn to_row(&self, record: &R) -> Vec<String> {
        self.attrs.iter().map(|attr| attr.format(record)).collect()
    }

    pub fn join(&self, record: &R, sep: &str) -> String {
        self.to_row(record).join(sep)
    }

    /// Field names joined by `sep`, for a header line.
    #[must_use]
    pub fn header(&self, sep: &str) -> String {
        self.field_names().join(sep)
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        self.plan.names()
    }

    #[must_use]
    pub fn plan(&self) -> &FieldPlan<R> {
        &self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use std::sync::Mutex;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        a: String,
        b: i32,
    }

    record!(Pair { a, b });

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn short_rows_fill_the_prefix() {
        let converter = RowConverter::<Pair>::new().unwrap();
        assert_eq!(
            converter.to_record(&row(&["x"])),
            Pair {
                a: "x".into(),
                b: 0
            }
        );
    }

    #[test]
    fn issues_reach_the_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let converter = RowConverter::<Pair>::new()
            .unwrap()
            .on_field_error(move |issue| sink.lock().unwrap().push(issue.clone()));

        converter.to_record(&row(&["x", "nope"]));
        converter.to_record(&row(&["x"]));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].error, ParseError::Malformed { .. }));
        assert_eq!(seen[1].error, ParseError::Absent);
        assert_eq!(seen[1].field, "b");
    }

    #[test]
    fn binding_locks_after_first_row() {
        let mut converter = RowConverter::<Pair>::new().unwrap();
        converter.reset_order(vec![1, 0]).unwrap();
        converter.to_record(&row(&["1", "x"]));
        converter.reset_order(vec![1, 0]).unwrap();
        assert_eq!(
            converter.reset_order(vec![0, 1]),
            Err(MapError::BindingLocked("Pair"))
        );
        assert!(!converter.clone().started());
    }

    #[test]
    fn joiner_formats_in_plan_order() {
        let joiner = RowJoiner::<Pair>::new().unwrap();
        let pair = Pair {
            a: "x".into(),
            b: 7,
        };
        assert_eq!(joiner.join(&pair, ","), "x,7");
        assert_eq!(joiner.header("|"), "a|b");
    }
}
