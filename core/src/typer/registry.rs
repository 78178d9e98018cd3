//! The registry mapping declared field types to their typers.
//!
//! Built-in scalar types are registered by [`TypeRegistry::new`]; callers add
//! their own with [`TypeRegistry::register`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    Bool, Integer, Network, Optional, Repeated, Scalar, StringMap, Text, TimeSpan, Typer,
    ValueParser,
};

/// Identity of a field's declared type, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of type `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Maps declared field types to typers.
///
/// [`TypeRegistry::new`] comes preloaded with the built-in conversions:
///
/// | Field type | Arity | Notes |
/// |---|---|---|
/// | `bool` | 0..1 | only `true`/`false` are taken as a value |
/// | `String` | 1 | |
/// | `i32`, `i64`, `u32`, `u64`, `usize` | 1 | arg name `number` |
/// | `Duration` | 1 | `300ms`, `1h30m`, `2days` |
/// | `IpNetwork` | 1 | bare addresses get `/32` |
/// | `HashMap<String, String>` | 1 | `key=value`, accumulates |
///
/// Every scalar is also available as `Option<T>` and `Vec<T>`.
#[derive(Clone)]
pub struct TypeRegistry {
    typers: HashMap<TypeId, Arc<dyn Typer>>,
}

impl TypeRegistry {
    /// Creates a registry with the built-in typers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_parser(Bool);
        registry.register_parser(Text);
        registry.register_parser(Integer::<i32>::new());
        registry.register_parser(Integer::<i64>::new());
        registry.register_parser(Integer::<u32>::new());
        registry.register_parser(Integer::<u64>::new());
        registry.register_parser(Integer::<usize>::new());
        registry.register_parser(TimeSpan);
        registry.register_parser(Network);
        registry.register(StringMap);
        registry
    }

    /// Creates a registry without any typers.
    pub fn empty() -> Self {
        Self {
            typers: HashMap::new(),
        }
    }

    /// Registers `typer` for its value type, replacing any previous one.
    pub fn register<T: Typer + 'static>(&mut self, typer: T) -> &mut Self {
        self.typers.insert(typer.value_type(), Arc::new(typer));
        self
    }

    /// Registers a scalar parser for `T`, `Option<T>` and `Vec<T>`.
    pub fn register_parser<P: ValueParser + Clone>(&mut self, parser: P) -> &mut Self {
        self.register(Scalar(parser.clone()));
        self.register(Optional(parser.clone()));
        self.register(Repeated(parser));
        self
    }

    /// Returns the typer bound to `T`.
    pub fn get<T: Any>(&self) -> Option<Arc<dyn Typer>> {
        self.lookup(TypeKey::of::<T>())
    }

    /// Returns the typer for a type key.
    pub fn lookup(&self, key: TypeKey) -> Option<Arc<dyn Typer>> {
        self.typers.get(&key.id).cloned()
    }

    /// Returns `true` if `T` has a typer.
    pub fn contains<T: Any>(&self) -> bool {
        self.typers.contains_key(&TypeId::of::<T>())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.typers.values().map(|t| t.type_name()).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
