//! Type-directed token conversion.
//!
//! A [`Typer`] knows how to turn one to N command-line tokens into a value
//! of a single Rust type and how many tokens it wants. Scalar conversions
//! are written once as a [`ValueParser`] and lifted into three typers:
//!
//! - [`Scalar`] binds `T` directly; a later match overwrites an earlier one.
//! - [`Optional`] binds `Option<T>`.
//! - [`Repeated`] binds `Vec<T>` and accumulates every match.
//!
//! [`TypeRegistry`] maps a field's declared type to its typer.

mod builtin;
mod network;
mod registry;

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::error::ValueError;

pub use builtin::{Bool, Integer, StringMap, Text, TimeSpan};
pub use network::{IpNetwork, Network};
pub use registry::{TypeKey, TypeRegistry};

/// Converts tokens into a value of one declared type and stores it into a
/// type-erased field.
pub trait Typer: Send + Sync {
    /// [`TypeId`] of the field type this typer binds.
    fn value_type(&self) -> TypeId;

    /// Human-readable name of the bound type.
    fn type_name(&self) -> &'static str;

    /// Minimum and maximum number of value tokens per flag occurrence.
    fn arity(&self) -> (usize, usize);

    /// Whether `token` may be consumed as a value. Greedy flag consumption
    /// stops at the first token this rejects.
    fn can_be_value(&self, token: &str) -> bool;

    /// Placeholder label suggested for usage text.
    fn arg_name(&self) -> Option<&'static str> {
        None
    }

    /// Whether successive matches accumulate rather than overwrite.
    fn accumulates(&self) -> bool {
        false
    }

    /// Converts `tokens` and stores the result into `target`.
    fn set(&self, target: &mut dyn Any, tokens: &[String]) -> Result<(), ValueError>;
}

/// A scalar conversion from tokens to one value.
///
/// Implement this for new scalar types and register it with
/// [`TypeRegistry::register_parser`] to get `T`, `Option<T>` and `Vec<T>`
/// support at once.
pub trait ValueParser: Send + Sync + 'static {
    /// The produced value.
    type Value: Any;

    /// Minimum and maximum number of tokens consumed.
    fn arity(&self) -> (usize, usize) {
        (1, 1)
    }

    /// Whether `token` may be consumed as a value.
    fn can_be_value(&self, token: &str) -> bool {
        let _ = token;
        true
    }

    /// Placeholder label suggested for usage text.
    fn arg_name(&self) -> Option<&'static str> {
        None
    }

    /// Parses the value from the consumed tokens.
    fn parse(&self, tokens: &[String]) -> Result<Self::Value, ValueError>;
}

/// Returns the first token or [`ValueError::Missing`].
pub(crate) fn first(tokens: &[String]) -> Result<&str, ValueError> {
    tokens.first().map(String::as_str).ok_or(ValueError::Missing)
}

fn slot<T: Any>(target: &mut dyn Any) -> Result<&mut T, ValueError> {
    target
        .downcast_mut::<T>()
        .ok_or(ValueError::TypeMismatch(std::any::type_name::<T>()))
}

/// Binds `P::Value` directly.
#[derive(Debug, Clone, Default)]
pub struct Scalar<P>(pub P);

impl<P: ValueParser> Typer for Scalar<P> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<P::Value>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<P::Value>()
    }

    fn arity(&self) -> (usize, usize) {
        self.0.arity()
    }

    fn can_be_value(&self, token: &str) -> bool {
        self.0.can_be_value(token)
    }

    fn arg_name(&self) -> Option<&'static str> {
        self.0.arg_name()
    }

    fn set(&self, target: &mut dyn Any, tokens: &[String]) -> Result<(), ValueError> {
        let field = slot::<P::Value>(target)?;
        *field = self.0.parse(tokens)?;
        Ok(())
    }
}

/// Binds `Option<P::Value>`, leaving `None` when the option never matches.
#[derive(Debug, Clone, Default)]
pub struct Optional<P>(pub P);

impl<P: ValueParser> Typer for Optional<P> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<Option<P::Value>>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Option<P::Value>>()
    }

    fn arity(&self) -> (usize, usize) {
        self.0.arity()
    }

    fn can_be_value(&self, token: &str) -> bool {
        self.0.can_be_value(token)
    }

    fn arg_name(&self) -> Option<&'static str> {
        self.0.arg_name()
    }

    fn set(&self, target: &mut dyn Any, tokens: &[String]) -> Result<(), ValueError> {
        let field = slot::<Option<P::Value>>(target)?;
        *field = Some(self.0.parse(tokens)?);
        Ok(())
    }
}

/// Binds `Vec<P::Value>`, appending one element per token.
///
/// Per-element arity is the scalar's; a scalar that accepts zero tokens
/// (such as [`Bool`]) appends one element for a bare occurrence.
#[derive(Debug, Clone, Default)]
pub struct Repeated<P>(pub P);

impl<P: ValueParser> Typer for Repeated<P> {
    fn value_type(&self) -> TypeId {
        TypeId::of::<Vec<P::Value>>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Vec<P::Value>>()
    }

    fn arity(&self) -> (usize, usize) {
        self.0.arity()
    }

    fn can_be_value(&self, token: &str) -> bool {
        self.0.can_be_value(token)
    }

    fn arg_name(&self) -> Option<&'static str> {
        self.0.arg_name()
    }

    fn accumulates(&self) -> bool {
        true
    }

    fn set(&self, target: &mut dyn Any, tokens: &[String]) -> Result<(), ValueError> {
        let field = slot::<Vec<P::Value>>(target)?;
        if tokens.is_empty() {
            if self.0.arity().0 == 0 {
                field.push(self.0.parse(tokens)?);
            }
            return Ok(());
        }
        for token in tokens {
            field.push(self.0.parse(std::slice::from_ref(token))?);
        }
        Ok(())
    }
}

/// Adapts a closure into a [`ValueParser`] for one-off custom types.
///
/// ```
/// use command_bind_core::{FnParser, TypeRegistry, ValueError};
///
/// #[derive(Debug, PartialEq)]
/// struct Level(u8);
///
/// let mut registry = TypeRegistry::new();
/// registry.register_parser(FnParser::new(|token: &str| {
///     token
///         .parse::<u8>()
///         .map(Level)
///         .map_err(|e| ValueError::Invalid { value: token.to_string(), reason: e.to_string() })
/// }));
/// assert!(registry.get::<Level>().is_some());
/// assert!(registry.get::<Vec<Level>>().is_some());
/// ```
pub struct FnParser<T, F> {
    parse: F,
    _value: PhantomData<fn() -> T>,
}

impl<T, F> FnParser<T, F>
where
    T: Any,
    F: Fn(&str) -> Result<T, ValueError> + Send + Sync + 'static,
{
    /// Wraps `parse`, which receives exactly one token.
    pub fn new(parse: F) -> Self {
        Self {
            parse,
            _value: PhantomData,
        }
    }
}

impl<T, F> ValueParser for FnParser<T, F>
where
    T: Any,
    F: Fn(&str) -> Result<T, ValueError> + Send + Sync + 'static,
{
    type Value = T;

    fn parse(&self, tokens: &[String]) -> Result<T, ValueError> {
        (self.parse)(first(tokens)?)
    }
}

impl<T, F: Clone> Clone for FnParser<T, F> {
    fn clone(&self) -> Self {
        Self {
            parse: self.parse.clone(),
            _value: PhantomData,
        }
    }
}
