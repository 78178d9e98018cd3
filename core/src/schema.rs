//! Schema declarations.
//!
//! A schema is a plain Rust type describing one command: its options, its
//! sub-commands and, optionally, what happens when it is invoked. Fields are
//! declared explicitly through [`Fields`], each with an annotation string in
//! the [`Attributes`] grammar and an accessor closure into the struct.
//!
//! # Examples
//!
//! ```
//! use command_bind_core::{Action, Fields, Invocation, RunError, Schema};
//!
//! #[derive(Default)]
//! struct GitClone {
//!     verbose: bool,
//!     repo: String,
//!     dir: String,
//! }
//!
//! impl GitClone {
//!     fn run(&mut self, _: &Invocation<'_>) -> Result<(), RunError> {
//!         if self.repo.is_empty() {
//!             return Err(RunError::usage_with("missing repository"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Schema for GitClone {
//!     fn fields(fields: &mut Fields<Self>) {
//!         fields
//!             .option("Verbose", r#"v desc:"be more verbose""#, |s| &mut s.verbose)
//!             .option("Repo", "[0]", |s| &mut s.repo)
//!             .option("Dir", "[1] default:.", |s| &mut s.dir);
//!     }
//!
//!     fn describe(&self) -> Option<String> {
//!         Some("Clone a repository into a new directory".to_string())
//!     }
//!
//!     fn action() -> Option<Action<Self>> {
//!         Some(Self::run)
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use crate::attrs::Attributes;
use crate::command::CommandId;
use crate::compile::{Compiler, compile_child};
use crate::dispatch::Invocation;
use crate::error::{CompileError, RunError};
use crate::typer::TypeKey;

/// Canonical action shape: the freshly bound value plus the invocation.
pub type Action<S> = fn(&mut S, &Invocation<'_>) -> Result<(), RunError>;

/// A command description.
///
/// `Default` provides the zero value every dispatch starts from. All hooks
/// are optional.
pub trait Schema: Default + 'static {
    /// Declares the fields in order.
    fn fields(fields: &mut Fields<Self>) {
        let _ = fields;
    }

    /// Description of the command, shown in its parent's command list.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Runs once per compilation on a zero value. Use it to attach
    /// descriptions to fields without repeating them in annotations.
    fn init(&mut self, ctx: &mut InitContext) {
        let _ = ctx;
    }

    /// Post-bind check. An error becomes a plain message, not usage text.
    fn verify(&self) -> Result<(), String> {
        Ok(())
    }

    /// The command's action. Commands without one only show usage.
    fn action() -> Option<Action<Self>> {
        None
    }
}

/// Ordered field declarations of one schema.
pub struct Fields<S> {
    defs: Vec<FieldDef>,
    _schema: PhantomData<fn(&mut S)>,
}

impl<S: Schema> Fields<S> {
    pub(crate) fn collect() -> Vec<FieldDef> {
        let mut fields = Self {
            defs: Vec::new(),
            _schema: PhantomData,
        };
        S::fields(&mut fields);
        fields.defs
    }

    /// Declares an option field bound through `access`.
    ///
    /// The field type must have a typer in the registry used to compile the
    /// schema, unless the annotation excludes the field with `-`.
    pub fn option<T, F>(&mut self, name: &'static str, attrs: &str, access: F) -> &mut Self
    where
        T: Any,
        F: Fn(&mut S) -> &mut T + 'static,
    {
        self.defs.push(FieldDef {
            name,
            attrs: Attributes::parse(attrs),
            kind: FieldKind::Value {
                ty: TypeKey::of::<T>(),
                access: Box::new(Accessor {
                    access,
                    _types: PhantomData,
                }),
            },
        });
        self
    }

    /// Declares a sub-command compiled from schema `C`.
    ///
    /// The command is named by the annotation, or by the lower-cased field
    /// name. A `desc:` key supplies a description when `C` has none.
    pub fn command<C: Schema>(&mut self, name: &'static str, attrs: &str) -> &mut Self {
        self.defs.push(FieldDef {
            name,
            attrs: Attributes::parse(attrs),
            kind: FieldKind::Command(compile_child::<C>),
        });
        self
    }

    /// Declares a parent reference filled with the nearest ancestor's bound
    /// `P` before the action runs.
    pub fn parent<P, F>(&mut self, name: &'static str, access: F) -> &mut Self
    where
        P: Schema + Clone,
        F: Fn(&mut S) -> &mut Option<P> + 'static,
    {
        self.defs.push(FieldDef {
            name,
            attrs: Attributes::default(),
            kind: FieldKind::Parent(Box::new(ParentSlot {
                access,
                _types: PhantomData,
            })),
        });
        self
    }
}

pub(crate) type CompileFn =
    fn(&mut Compiler<'_>, CommandId, String, Option<String>) -> Result<CommandId, CompileError>;

pub(crate) struct FieldDef {
    pub(crate) name: &'static str,
    pub(crate) attrs: Attributes,
    pub(crate) kind: FieldKind,
}

pub(crate) enum FieldKind {
    Value {
        ty: TypeKey,
        access: Box<dyn FieldAccess>,
    },
    Command(CompileFn),
    Parent(Box<dyn ParentAccess>),
}

/// Projects a type-erased schema value onto one of its fields.
pub(crate) trait FieldAccess {
    fn get_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

struct Accessor<S, T, F> {
    access: F,
    _types: PhantomData<fn(&mut S) -> &mut T>,
}

impl<S, T, F> FieldAccess for Accessor<S, T, F>
where
    S: 'static,
    T: Any,
    F: Fn(&mut S) -> &mut T,
{
    fn get_mut<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let schema = target.downcast_mut::<S>()?;
        let field: &'a mut T = (self.access)(schema);
        Some(field as &mut dyn Any)
    }
}

/// Copies an ancestor's bound value into a parent-reference field.
pub(crate) trait ParentAccess {
    fn fill(&self, target: &mut dyn Any, ancestors: &[Box<dyn Any>]);
}

struct ParentSlot<S, P, F> {
    access: F,
    _types: PhantomData<fn(&mut S) -> P>,
}

impl<S, P, F> ParentAccess for ParentSlot<S, P, F>
where
    S: 'static,
    P: Clone + 'static,
    F: Fn(&mut S) -> &mut Option<P>,
{
    fn fill(&self, target: &mut dyn Any, ancestors: &[Box<dyn Any>]) {
        let Some(schema) = target.downcast_mut::<S>() else {
            return;
        };
        let nearest = ancestors
            .iter()
            .rev()
            .find_map(|value| (**value).downcast_ref::<P>());
        if let Some(parent) = nearest {
            *(self.access)(schema) = Some(parent.clone());
        }
    }
}

/// Per-compilation collector handed to [`Schema::init`].
///
/// Descriptions are keyed by field address, so they must be attached to
/// fields of the value `init` was called on.
#[derive(Debug)]
pub struct InitContext {
    command: String,
    descriptions: Vec<(usize, String)>,
    description: Option<String>,
}

impl InitContext {
    pub(crate) fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            descriptions: Vec::new(),
            description: None,
        }
    }

    /// Name of the command being compiled.
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Attaches `text` as the description of `field`. Overrides a `desc:`
    /// annotation.
    pub fn describe<T>(&mut self, field: &T, text: impl Into<String>) {
        self.descriptions
            .push((field as *const T as usize, text.into()));
    }

    /// Sets the command's own description, overriding [`Schema::describe`].
    pub fn describe_command(&mut self, text: impl Into<String>) {
        self.description = Some(text.into());
    }

    pub(crate) fn description_at(&self, address: usize) -> Option<&str> {
        self.descriptions
            .iter()
            .rev()
            .find(|(at, _)| *at == address)
            .map(|(_, text)| text.as_str())
    }

    pub(crate) fn command_description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Address of a type-erased field, comparable with [`InitContext::describe`].
pub(crate) fn address_of(field: &dyn Any) -> usize {
    (field as *const dyn Any).cast::<()>() as usize
}

/// Schema-specific operations of a compiled node.
pub(crate) trait Binding {
    fn schema_type(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn instantiate(&self) -> Box<dyn Any>;
    fn verify(&self, value: &dyn Any) -> Result<(), RunError>;
}

pub(crate) struct SchemaBinding<S>(PhantomData<fn() -> S>);

impl<S> SchemaBinding<S> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S: Schema> Binding for SchemaBinding<S> {
    fn schema_type(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<S>()
    }

    fn instantiate(&self) -> Box<dyn Any> {
        Box::new(S::default())
    }

    fn verify(&self, value: &dyn Any) -> Result<(), RunError> {
        let value = value
            .downcast_ref::<S>()
            .ok_or(RunError::SchemaMismatch(self.type_name()))?;
        value.verify().map_err(RunError::Verify)
    }
}

/// A node action with its schema type erased.
pub(crate) trait ErasedAction {
    fn call(&self, value: &mut dyn Any, invocation: &Invocation<'_>) -> Result<(), RunError>;
}

struct TypedAction<S, F> {
    action: F,
    _schema: PhantomData<fn(&mut S)>,
}

impl<S, F> ErasedAction for TypedAction<S, F>
where
    S: Schema,
    F: Fn(&mut S, &Invocation<'_>) -> Result<(), RunError>,
{
    fn call(&self, value: &mut dyn Any, invocation: &Invocation<'_>) -> Result<(), RunError> {
        let value = value
            .downcast_mut::<S>()
            .ok_or(RunError::SchemaMismatch(std::any::type_name::<S>()))?;
        (self.action)(value, invocation)
    }
}

pub(crate) fn erase_action<S, F>(action: F) -> Box<dyn ErasedAction>
where
    S: Schema,
    F: Fn(&mut S, &Invocation<'_>) -> Result<(), RunError> + 'static,
{
    Box::new(TypedAction {
        action,
        _schema: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone)]
    struct Outer {
        name: String,
    }

    impl Schema for Outer {}

    #[derive(Default)]
    struct Inner {
        count: i64,
        outer: Option<Outer>,
    }

    impl Schema for Inner {
        fn fields(fields: &mut Fields<Self>) {
            fields
                .option("Count", "c", |s| &mut s.count)
                .parent("Outer", |s| &mut s.outer);
        }
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let defs = Fields::<Inner>::collect();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "Count");
        assert_eq!(defs[0].attrs.name(), Some("c"));
        assert!(matches!(defs[1].kind, FieldKind::Parent(_)));
    }

    #[test]
    fn test_accessor_reaches_the_field() {
        let defs = Fields::<Inner>::collect();
        let FieldKind::Value { access, ty } = &defs[0].kind else {
            panic!("expected a value field");
        };
        assert_eq!(*ty, TypeKey::of::<i64>());

        let mut value: Box<dyn Any> = Box::new(Inner::default());
        let field = access.get_mut(&mut *value).unwrap();
        *field.downcast_mut::<i64>().unwrap() = 7;

        assert_eq!(value.downcast_ref::<Inner>().unwrap().count, 7);
    }

    #[test]
    fn test_parent_takes_nearest_ancestor() {
        let defs = Fields::<Inner>::collect();
        let FieldKind::Parent(slot) = &defs[1].kind else {
            panic!("expected a parent field");
        };
        let ancestors: Vec<Box<dyn Any>> = vec![
            Box::new(Outer {
                name: "far".to_string(),
            }),
            Box::new(Outer {
                name: "near".to_string(),
            }),
        ];

        let mut value: Box<dyn Any> = Box::new(Inner::default());
        slot.fill(&mut *value, &ancestors);

        let inner = value.downcast_ref::<Inner>().unwrap();
        assert_eq!(inner.outer.as_ref().map(|o| o.name.as_str()), Some("near"));
    }

    #[test]
    fn test_init_context_matches_by_address() {
        let value = Inner::default();
        let mut ctx = InitContext::new("inner");
        ctx.describe(&value.count, "how many");

        assert_eq!(ctx.command_name(), "inner");
        assert_eq!(
            ctx.description_at(address_of(&value.count)),
            Some("how many")
        );
        assert_eq!(ctx.description_at(address_of(&value.outer)), None);
    }

    #[test]
    fn test_binding_verifies_type() {
        let binding = SchemaBinding::<Outer>::new();
        let wrong: Box<dyn Any> = Box::new(3_u8);

        assert!(matches!(
            binding.verify(&*wrong),
            Err(RunError::SchemaMismatch(_))
        ));
        assert!(binding.verify(&*binding.instantiate()).is_ok());
    }
}
