//! Per-field cell codecs and the conversion registry.
//!
//! Every planned field is bound to an [`Attr`]: the field's built-in [`Codec`]
//! (if its type has one), overridden by any matching parser or formatter
//! registered in [`Conversions`], and preceded by the matching text pre-mappers.
//!
//! [`Codec`]: crate::Codec

use crate::error::{MapError, ParseError};
use crate::field::{Boxed, FieldDef, FieldType};
use crate::plan::FieldDescriptor;
use crate::row::{CellRef, number_text};
use crate::selection::{Selection, SelectionPolicy};
use std::any::{Any, TypeId};
use std::fmt::Display;
use std::sync::Arc;

type TextParser = Arc<dyn Fn(&str) -> Result<Boxed, String> + Send + Sync>;
type ValueFormatter = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type TextMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

struct Scoped<F> {
    type_id: Option<TypeId>,
    scope: SelectionPolicy,
    func: F,
}

impl<F: Clone> Clone for Scoped<F> {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            scope: self.scope.clone(),
            func: self.func.clone(),
        }
    }
}

/// Registry of caller-supplied conversions.
///
/// Parsers and formatters apply to fields whose declared type matches exactly;
/// mappers apply to every field in scope. A scope is a [`SelectionPolicy`]
/// over field names (its `private_fields` flag is ignored here). Later
/// registrations override earlier ones; mappers compose in registration order.
#[derive(Clone, Default)]
pub struct Conversions {
    parsers: Vec<Scoped<TextParser>>,
    formatters: Vec<Scoped<ValueFormatter>>,
    mappers: Vec<Scoped<TextMapper>>,
}

impl Conversions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser for every field of type `T`.
    #[must_use]
    pub fn parser<T, E, F>(self, parse: F) -> Self
    where
        T: FieldType,
        E: Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        self.parser_for(SelectionPolicy::default(), parse)
    }

    /// Register a parser for the fields of type `T` selected by `scope`.
    #[must_use]
    pub fn parser_for<T, E, F>(mut self, scope: SelectionPolicy, parse: F) -> Self
    where
        T: FieldType,
        E: Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let func: TextParser = Arc::new(move |text: &str| {
            parse(text)
                .map(|v| Box::new(v) as Boxed)
                .map_err(|e| e.to_string())
        });
        self.parsers.push(Scoped {
            type_id: Some(TypeId::of::<T>()),
            scope,
            func,
        });
        self
    }

    /// Register a formatter for every field of type `T`.
    #[must_use]
    pub fn formatter<T, F>(self, format: F) -> Self
    where
        T: FieldType,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.formatter_for(SelectionPolicy::default(), format)
    }

    /// Register a formatter for the fields of type `T` selected by `scope`.
    #[must_use]
    pub fn formatter_for<T, F>(mut self, scope: SelectionPolicy, format: F) -> Self
    where
        T: FieldType,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let func: ValueFormatter =
            Arc::new(move |value: &dyn Any| value.downcast_ref::<T>().map(&format));
        self.formatters.push(Scoped {
            type_id: Some(TypeId::of::<T>()),
            scope,
            func,
        });
        self
    }

    /// Register a text pre-mapper applied before parsing every field.
    #[must_use]
    pub fn mapper<F>(self, map: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mapper_for(SelectionPolicy::default(), map)
    }

    /// Register a text pre-mapper for the fields selected by `scope`.
    #[must_use]
    pub fn mapper_for<F>(mut self, scope: SelectionPolicy, map: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mappers.push(Scoped {
            type_id: None,
            scope,
            func: Arc::new(map),
        });
        self
    }

    /// Append all registrations of `other` after those of `self`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.parsers.extend(other.parsers);
        self.formatters.extend(other.formatters);
        self.mappers.extend(other.mappers);
        self
    }

    pub(crate) fn compile(&self) -> Result<CompiledConversions, MapError> {
        fn compile_all<F: Clone>(
            list: &[Scoped<F>],
        ) -> Result<Vec<(Option<TypeId>, Selection, F)>, MapError> {
            list.iter()
                .map(|s| Ok((s.type_id, s.scope.compile()?, s.func.clone())))
                .collect()
        }
        Ok(CompiledConversions {
            parsers: compile_all(&self.parsers)?,
            formatters: compile_all(&self.formatters)?,
            mappers: compile_all(&self.mappers)?,
        })
    }
}

pub(crate) struct CompiledConversions {
    parsers: Vec<(Option<TypeId>, Selection, TextParser)>,
    formatters: Vec<(Option<TypeId>, Selection, ValueFormatter)>,
    mappers: Vec<(Option<TypeId>, Selection, TextMapper)>,
}

impl CompiledConversions {
    fn last_for<F: Clone, R>(
        list: &[(Option<TypeId>, Selection, F)],
        field: &FieldDef<R>,
    ) -> Option<F> {
        list.iter()
            .rev()
            .find(|(ty, sel, _)| ty.is_none_or(|t| t == field.type_id) && sel.matches(field.name))
            .map(|(_, _, f)| f.clone())
    }

    fn mappers_for<R>(&self, field: &FieldDef<R>) -> Vec<TextMapper> {
        self.mappers
            .iter()
            .filter(|(_, sel, _)| sel.matches(field.name))
            .map(|(_, _, f)| Arc::clone(f))
            .collect()
    }
}

/// Runtime binding of one planned field to its codec.
pub struct Attr<R> {
    descriptor: FieldDescriptor,
    field: FieldDef<R>,
    parser: Option<TextParser>,
    formatter: Option<ValueFormatter>,
    mappers: Vec<TextMapper>,
}

impl<R> Attr<R> {
    pub(crate) fn bind(
        descriptor: FieldDescriptor,
        field: FieldDef<R>,
        conversions: &CompiledConversions,
    ) -> Self {
        let parser = CompiledConversions::last_for(&conversions.parsers, &field);
        let formatter = CompiledConversions::last_for(&conversions.formatters, &field);
        let mappers = conversions.mappers_for(&field);
        Self {
            descriptor,
            field,
            parser,
            formatter,
            mappers,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.field.name
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.field.type_name
    }

    pub(crate) fn can_parse(&self) -> bool {
        self.parser.is_some() || self.field.has_codec
    }

    pub(crate) fn can_format(&self) -> bool {
        self.formatter.is_some() || self.field.has_codec
    }

    /// Decode one cell into a value for this field.
    ///
    /// # Errors
    ///
    /// [`ParseError::Absent`] for empty cells, [`ParseError::Malformed`] when
    /// the codec rejects the content.
    pub fn decode(&self, cell: CellRef<'_>) -> Result<Boxed, ParseError> {
        match cell {
            CellRef::Empty => Err(ParseError::Absent),
            CellRef::Number(n) if self.parser.is_none() => match self.field.slot.from_number(n) {
                Some(v) => Ok(v),
                None => self.parse_text(&number_text(n)),
            },
            CellRef::Bool(b) if self.parser.is_none() => match self.field.slot.from_bool(b) {
                Some(v) => Ok(v),
                None => self.parse_text(&b.to_string()),
            },
            CellRef::Number(n) => self.parse_text(&number_text(n)),
            CellRef::Bool(b) => self.parse_text(&b.to_string()),
            CellRef::Text(text) => self.parse_text(text),
        }
    }

    /// Run the text path: pre-mappers in order, then the parser.
    ///
    /// # Errors
    ///
    /// See [`Attr::decode`].
    pub fn parse_text(&self, text: &str) -> Result<Boxed, ParseError> {
        let mapped;
        let text = if self.mappers.is_empty() {
            text
        } else {
            mapped = self
                .mappers
                .iter()
                .fold(text.to_string(), |acc, map| map(&acc));
            mapped.as_str()
        };
        if text.is_empty() && self.field.type_id != TypeId::of::<String>() {
            return Err(ParseError::Absent);
        }
        if let Some(parser) = &self.parser {
            return parser(text).map_err(|reason| ParseError::malformed(text, reason));
        }
        self.field
            .slot
            .parse_builtin(text)
            .unwrap_or_else(|| Err(ParseError::malformed(text, "no parser")))
    }

    pub(crate) fn assign(&self, record: &mut R, value: Boxed) -> Result<(), ParseError> {
        self.field.slot.assign(record, value)
    }

    /// Format this field of `record`. Unformattable values render as "".
    pub fn format(&self, record: &R) -> String {
        let value = self.field.slot.read(record);
        let formatted = match &self.formatter {
            Some(format) => format(value),
            None => self.field.slot.format_builtin(value),
        };
        formatted.unwrap_or_default()
    }
}

/// Build attrs for every planned field.
pub(crate) fn bind_attrs<R>(
    descriptors: &[FieldDescriptor],
    fields: &[FieldDef<R>],
    conversions: &Conversions,
) -> Result<Vec<Attr<R>>, MapError> {
    let compiled = conversions.compile()?;
    Ok(descriptors
        .iter()
        .zip(fields)
        .map(|(d, f)| Attr::bind(d.clone(), f.clone(), &compiled))
        .collect())
}
