//! Record schemas: the explicit field table every mapped type declares.
//!
//! A record type implements [`Record`], usually through the [`record!`](crate::record)
//! macro, and lists its fields in declaration order together with their
//! visibility and modifiers. Each field type implements [`FieldType`], which
//! reports its primitive [`FieldKind`] and, for the built-in kinds, the text
//! [`Codec`] used by converters and joiners.
//!
//! ```
//! use lineio::{cell_enum, record, Record};
//!
//! #[derive(Debug, Default, Clone, Copy, PartialEq)]
//! enum Tier { #[default] Free, Pro }
//! cell_enum!(Tier { Free, Pro });
//!
//! #[derive(Debug, Default)]
//! struct Account {
//!     id: i64,
//!     tier: Tier,
//!     password: String,
//!     score: f64,
//! }
//!
//! record!(Account {
//!     id,
//!     tier,
//!     #[private] password,
//!     #[transient] score,
//! });
//!
//! let schema = lineio::Schema::<Account>::of();
//! assert_eq!(schema.fields().len(), 4);
//! ```

use crate::codec::Conversions;
use crate::error::ParseError;
use crate::selection::SelectionPolicy;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A decoded cell value on its way into a record field.
pub type Boxed = Box<dyn Any + Send>;

/// Primitive shape of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Str,
    Bool,
    Int,
    Long,
    Double,
    Enum,
    /// Any other type; needs registered conversions.
    Custom(&'static str),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("string"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::Enum => f.write_str("enum"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Text codec for a field type.
pub struct Codec<T> {
    pub parse: fn(&str) -> Result<T, String>,
    pub format: fn(&T) -> String,
}

/// A type that can live in a mapped record field.
///
/// Built-in impls cover `String`, `bool`, `i32`, `i64` and `f64`; enums get one
/// from [`cell_enum!`](crate::cell_enum). Any other type may implement the trait
/// with the defaults and register its conversions in
/// [`Conversions`](crate::Conversions).
pub trait FieldType: Any + Send + Sync + Sized {
    fn kind() -> FieldKind {
        FieldKind::Custom(type_name::<Self>())
    }

    fn codec() -> Option<Codec<Self>> {
        None
    }

    /// Conversion from a numeric spreadsheet cell.
    fn from_number(_value: f64) -> Option<Self> {
        None
    }

    /// Conversion from a boolean spreadsheet cell.
    fn from_bool(_value: bool) -> Option<Self> {
        None
    }
}

impl FieldType for String {
    fn kind() -> FieldKind {
        FieldKind::Str
    }

    fn codec() -> Option<Codec<Self>> {
        Some(Codec {
            parse: |text| Ok(text.to_string()),
            format: Clone::clone,
        })
    }

    fn from_number(value: f64) -> Option<Self> {
        Some(crate::row::number_text(value))
    }

    fn from_bool(value: bool) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FieldType for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn codec() -> Option<Codec<Self>> {
        Some(Codec {
            parse: |text| {
                if text.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err("expected true or false".to_string())
                }
            },
            format: ToString::to_string,
        })
    }

    fn from_bool(value: bool) -> Option<Self> {
        Some(value)
    }
}

macro_rules! integer_field {
    ($ty:ty, $kind:ident) => {
        impl FieldType for $ty {
            fn kind() -> FieldKind {
                FieldKind::$kind
            }

            fn codec() -> Option<Codec<Self>> {
                Some(Codec {
                    parse: |text| text.parse::<$ty>().map_err(|e| e.to_string()),
                    format: ToString::to_string,
                })
            }

            #[allow(clippy::cast_possible_truncation)]
            fn from_number(value: f64) -> Option<Self> {
                value.is_finite().then(|| value as $ty)
            }
        }
    };
}

integer_field!(i32, Int);
integer_field!(i64, Long);

impl FieldType for f64 {
    fn kind() -> FieldKind {
        FieldKind::Double
    }

    fn codec() -> Option<Codec<Self>> {
        Some(Codec {
            parse: |text| text.parse::<f64>().map_err(|e| e.to_string()),
            format: ToString::to_string,
        })
    }

    fn from_number(value: f64) -> Option<Self> {
        Some(value)
    }
}

/// Implement [`FieldType`] for a unit-only enum, mapping cells by variant name.
///
/// Parsing is exact (case-sensitive); formatting writes the variant name.
#[macro_export]
macro_rules! cell_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::FieldType for $name {
            fn kind() -> $crate::FieldKind {
                $crate::FieldKind::Enum
            }

            fn codec() -> Option<$crate::Codec<Self>> {
                Some($crate::Codec {
                    parse: |text| match text {
                        $(stringify!($variant) => Ok($name::$variant),)+
                        other => Err(format!(
                            "`{}` is not a variant of {}",
                            other,
                            stringify!($name)
                        )),
                    },
                    format: |value| match value {
                        $($name::$variant => stringify!($variant).to_string(),)+
                    },
                })
            }
        }
    };
}

/// Field visibility, deciding which candidate set a field belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Declaration modifiers. Any set modifier excludes the field from every plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Type-level rather than per-instance.
    pub shared: bool,
    pub constant: bool,
    pub transient: bool,
}

impl Modifiers {
    #[must_use]
    pub const fn excludes(&self) -> bool {
        self.shared || self.constant || self.transient
    }
}

/// Marker accepted by [`Schema::field`] and the `record!` macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldMark {
    Private,
    Shared,
    Constant,
    Transient,
}

pub(crate) trait Slot<R>: Send + Sync {
    fn assign(&self, record: &mut R, value: Boxed) -> Result<(), ParseError>;
    fn read<'r>(&self, record: &'r R) -> &'r dyn Any;
    fn parse_builtin(&self, text: &str) -> Option<Result<Boxed, ParseError>>;
    fn format_builtin(&self, value: &dyn Any) -> Option<String>;
    fn from_number(&self, value: f64) -> Option<Boxed>;
    fn from_bool(&self, value: bool) -> Option<Boxed>;
}

struct Lens<F, G, M> {
    get: G,
    get_mut: M,
    codec: Option<Codec<F>>,
    _field: PhantomData<fn() -> F>,
}

impl<R, F, G, M> Slot<R> for Lens<F, G, M>
where
    F: FieldType,
    G: Fn(&R) -> &F + Send + Sync,
    M: Fn(&mut R) -> &mut F + Send + Sync,
{
    fn assign(&self, record: &mut R, value: Boxed) -> Result<(), ParseError> {
        let value = value.downcast::<F>().map_err(|_| ParseError::TypeMismatch {
            expected: type_name::<F>(),
        })?;
        *(self.get_mut)(record) = *value;
        Ok(())
    }

    fn read<'r>(&self, record: &'r R) -> &'r dyn Any {
        (self.get)(record)
    }

    fn parse_builtin(&self, text: &str) -> Option<Result<Boxed, ParseError>> {
        let codec = self.codec.as_ref()?;
        Some(
            (codec.parse)(text)
                .map(|v| Box::new(v) as Boxed)
                .map_err(|reason| ParseError::malformed(text, reason)),
        )
    }

    fn format_builtin(&self, value: &dyn Any) -> Option<String> {
        let codec = self.codec.as_ref()?;
        value.downcast_ref::<F>().map(codec.format)
    }

    fn from_number(&self, value: f64) -> Option<Boxed> {
        F::from_number(value).map(|v| Box::new(v) as Boxed)
    }

    fn from_bool(&self, value: bool) -> Option<Boxed> {
        F::from_bool(value).map(|v| Box::new(v) as Boxed)
    }
}

/// One declared field of a record type.
pub struct FieldDef<R> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub(crate) has_codec: bool,
    pub(crate) slot: Arc<dyn Slot<R>>,
}

impl<R> Clone for FieldDef<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            type_id: self.type_id,
            type_name: self.type_name,
            visibility: self.visibility,
            modifiers: self.modifiers,
            has_codec: self.has_codec,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> fmt::Debug for FieldDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

/// Declared fields of a record type, in declaration order.
pub struct Schema<R> {
    record: &'static str,
    fields: Vec<FieldDef<R>>,
}

impl<R: Record> Schema<R> {
    /// Collect the declaration of `R`.
    #[must_use]
    pub fn of() -> Self {
        let mut schema = Self {
            record: short_type_name::<R>(),
            fields: Vec::new(),
        };
        R::declare(&mut schema);
        schema
    }
}

impl<R: 'static> Schema<R> {
    /// Declare a field with its accessor pair.
    pub fn field<F, G, M>(
        &mut self,
        name: &'static str,
        marks: &[FieldMark],
        get: G,
        get_mut: M,
    ) -> &mut Self
    where
        F: FieldType,
        G: Fn(&R) -> &F + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut F + Send + Sync + 'static,
    {
        let mut visibility = Visibility::Public;
        let mut modifiers = Modifiers::default();
        for mark in marks {
            match mark {
                FieldMark::Private => visibility = Visibility::Private,
                FieldMark::Shared => modifiers.shared = true,
                FieldMark::Constant => modifiers.constant = true,
                FieldMark::Transient => modifiers.transient = true,
            }
        }
        let codec = F::codec();
        self.fields.push(FieldDef {
            name,
            kind: F::kind(),
            type_id: TypeId::of::<F>(),
            type_name: type_name::<F>(),
            visibility,
            modifiers,
            has_codec: codec.is_some(),
            slot: Arc::new(Lens {
                get,
                get_mut,
                codec,
                _field: PhantomData,
            }),
        });
        self
    }

    #[must_use]
    pub fn record(&self) -> &'static str {
        self.record
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef<R>] {
        &self.fields
    }
}

/// A type that can be mapped to and from rows.
///
/// `Default` provides the fresh instance every decoded row starts from.
pub trait Record: Default + Send + 'static {
    /// Declare the fields of this type in order.
    fn declare(schema: &mut Schema<Self>);

    /// Type-level selection applied when no policy is given explicitly.
    fn selection() -> SelectionPolicy {
        SelectionPolicy::default()
    }

    /// Type-level conversions, merged before any caller-supplied ones.
    fn conversions() -> Conversions {
        Conversions::new()
    }
}

/// Implement [`Record`] by listing fields in order.
///
/// Fields can carry `#[private]`, `#[shared]`, `#[constant]` and `#[transient]`
/// markers. Types that also need a type-level selection or conversions
/// implement [`Record`] by hand.
#[macro_export]
macro_rules! record {
    (@mark private) => { $crate::FieldMark::Private };
    (@mark shared) => { $crate::FieldMark::Shared };
    (@mark constant) => { $crate::FieldMark::Constant };
    (@mark transient) => { $crate::FieldMark::Transient };
    ($record:ident { $( $(#[$mark:ident])* $field:ident ),* $(,)? }) => {
        impl $crate::Record for $record {
            fn declare(schema: &mut $crate::Schema<Self>) {
                $(
                    schema.field(
                        stringify!($field),
                        &[$($crate::record!(@mark $mark)),*],
                        |r: &Self| &r.$field,
                        |r: &mut Self| &mut r.$field,
                    );
                )*
            }
        }
    };
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_drop_module_paths() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn bool_codec_is_case_insensitive() {
        let codec = bool::codec().unwrap();
        assert_eq!((codec.parse)("TRUE"), Ok(true));
        assert_eq!((codec.parse)("false"), Ok(false));
        assert!((codec.parse)("yes").is_err());
    }

    #[test]
    fn integer_cells_truncate() {
        assert_eq!(i32::from_number(3.9), Some(3));
        assert_eq!(i64::from_number(f64::NAN), None);
    }
}
