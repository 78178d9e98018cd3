//! Built-in scalar parsers and the string map typer.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValueError;

use super::{Typer, ValueParser, first, slot};

/// Boolean switch.
///
/// Accepts zero or one token. A bare occurrence means `true`; a following
/// token is only consumed when it is literally `true` or `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl ValueParser for Bool {
    type Value = bool;

    fn arity(&self) -> (usize, usize) {
        (0, 1)
    }

    fn can_be_value(&self, token: &str) -> bool {
        token == "true" || token == "false"
    }

    fn parse(&self, tokens: &[String]) -> Result<bool, ValueError> {
        Ok(tokens.first().map(String::as_str) != Some("false"))
    }
}

/// Plain string; any token is acceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl ValueParser for Text {
    type Value = String;

    fn parse(&self, tokens: &[String]) -> Result<String, ValueError> {
        first(tokens).map(str::to_string)
    }
}

/// Integer of any primitive width.
pub struct Integer<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> Integer<T> {
    /// Creates the parser.
    pub const fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for Integer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Integer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Integer<T> {}

impl<T> std::fmt::Debug for Integer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Integer<{}>", std::any::type_name::<T>())
    }
}

impl<T> ValueParser for Integer<T>
where
    T: FromStr + Any,
    T::Err: Display,
{
    type Value = T;

    fn arg_name(&self) -> Option<&'static str> {
        Some("number")
    }

    fn parse(&self, tokens: &[String]) -> Result<T, ValueError> {
        let token = first(tokens)?;
        token.parse::<T>().map_err(|e| ValueError::Invalid {
            value: token.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Duration in the human-friendly grammar (`300ms`, `1h30m`, `2days`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSpan;

impl ValueParser for TimeSpan {
    type Value = Duration;

    fn parse(&self, tokens: &[String]) -> Result<Duration, ValueError> {
        let token = first(tokens)?;
        humantime::parse_duration(token).map_err(|e| ValueError::Invalid {
            value: token.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `key=value` entries accumulated into one `HashMap<String, String>`.
///
/// Each flag occurrence consumes one token; repeated occurrences add
/// entries instead of replacing the map.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringMap;

impl Typer for StringMap {
    fn value_type(&self) -> TypeId {
        TypeId::of::<HashMap<String, String>>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<HashMap<String, String>>()
    }

    fn arity(&self) -> (usize, usize) {
        (1, 1)
    }

    fn can_be_value(&self, _token: &str) -> bool {
        true
    }

    fn arg_name(&self) -> Option<&'static str> {
        Some("key=value")
    }

    fn accumulates(&self) -> bool {
        true
    }

    fn set(&self, target: &mut dyn Any, tokens: &[String]) -> Result<(), ValueError> {
        let map = slot::<HashMap<String, String>>(target)?;
        for token in tokens {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ValueError::InvalidMapEntry(token.clone()))?;
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}
