//! Option descriptors and the option compiler.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::attrs::Attributes;
use crate::config::HelpConfig;
use crate::error::CompileError;
use crate::schema::{FieldAccess, InitContext, Schema, address_of};
use crate::typer::{Bool, Scalar, TypeKey, TypeRegistry, Typer};

/// Whether an option is matched by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// `-name`, optionally followed by value tokens.
    Flag,
    /// Positional argument.
    Arg,
}

/// Position a positional argument binds from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// The positional token at this index (`[N]`).
    Index(usize),
    /// Every positional token (`[]`).
    Rest,
}

/// Completion candidates for a positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidates {
    /// A fixed list from a `choices:"a,b"` annotation.
    Static(Vec<String>),
    /// A callback registered under this name (`lambda:"name"`).
    Lambda(String),
}

/// One compiled option of a command.
pub struct OptionDef {
    name: String,
    kind: OptionKind,
    typer: Arc<dyn Typer>,
    default: Option<String>,
    description: String,
    arg_name: Option<String>,
    position: Option<Position>,
    triggers_usage: bool,
    candidates: Option<Candidates>,
    field: &'static str,
    pub(crate) slot: Option<Box<dyn FieldAccess>>,
}

impl OptionDef {
    /// The auto-injected help flag.
    pub(crate) fn help(config: &HelpConfig) -> Self {
        Self {
            name: config.flag.clone(),
            kind: OptionKind::Flag,
            typer: Arc::new(Scalar(Bool)),
            default: None,
            description: config.description.clone(),
            arg_name: None,
            position: None,
            triggers_usage: true,
            candidates: None,
            field: "",
            slot: None,
        }
    }

    /// Flag name without the dash, or the positional's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn is_flag(&self) -> bool {
        self.kind == OptionKind::Flag
    }

    pub fn is_arg(&self) -> bool {
        self.kind == OptionKind::Arg
    }

    /// The typer converting this option's tokens.
    pub fn typer(&self) -> &dyn Typer {
        self.typer.as_ref()
    }

    /// Value applied when the option is absent.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Placeholder label for the option's value in usage text.
    pub fn arg_name(&self) -> Option<&str> {
        self.arg_name.as_deref()
    }

    /// Binding position; `None` for flags.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Whether matching this flag shows usage instead of binding.
    pub fn triggers_usage(&self) -> bool {
        self.triggers_usage
    }

    pub fn candidates(&self) -> Option<&Candidates> {
        self.candidates.as_ref()
    }

    /// Schema field this option binds to; empty for the help flag.
    pub fn field(&self) -> &str {
        self.field
    }
}

impl fmt::Debug for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("type", &self.typer.type_name())
            .field("default", &self.default)
            .field("description", &self.description)
            .field("arg_name", &self.arg_name)
            .field("position", &self.position)
            .field("triggers_usage", &self.triggers_usage)
            .field("field", &self.field)
            .finish()
    }
}

/// A value field awaiting compilation.
pub(crate) struct ValueField {
    pub(crate) name: &'static str,
    pub(crate) attrs: Attributes,
    pub(crate) ty: TypeKey,
    pub(crate) access: Box<dyn FieldAccess>,
}

/// Compiles the value fields of schema `S` into options.
///
/// Runs the schema's init hook on a zero value and returns the command
/// description it set, if any.
pub(crate) fn compile_options<S: Schema>(
    command: &str,
    fields: Vec<ValueField>,
    registry: &TypeRegistry,
) -> Result<(Vec<OptionDef>, Option<String>), CompileError> {
    let mut options = Vec::with_capacity(fields.len());

    for field in fields {
        if field.attrs.name() == Some("-") {
            trace!(field = field.name, "Field excluded");
            continue;
        }
        options.push(compile_field(field, registry)?);
    }

    validate(command, &options)?;

    // Field addresses must stay put between `init` and the lookup below.
    let mut instance = Box::new(S::default());
    let mut ctx = InitContext::new(command);
    instance.init(&mut ctx);

    let mut instance: Box<dyn std::any::Any> = instance;
    for option in &mut options {
        let Some(slot) = &option.slot else {
            continue;
        };
        let Some(field) = slot.get_mut(&mut *instance) else {
            continue;
        };
        if let Some(text) = ctx.description_at(address_of(&*field)) {
            option.description = text.to_string();
        }
    }

    Ok((options, ctx.command_description().map(str::to_string)))
}

fn compile_field(field: ValueField, registry: &TypeRegistry) -> Result<OptionDef, CompileError> {
    let ValueField {
        name: field_name,
        attrs,
        ty,
        access,
    } = field;
    let lowered = field_name.to_lowercase();
    let declared = attrs.name().unwrap_or(&lowered);

    let (kind, name, position) = match parse_marker(declared) {
        Some(marker) => {
            let position = marker.ok_or_else(|| CompileError::InvalidPositional {
                field: field_name.to_string(),
                reason: format!("malformed marker {declared:?}"),
            })?;
            let label = attrs.get("name");
            let name = if label.is_empty() { lowered.clone() } else { label.to_string() };
            (OptionKind::Arg, name, Some(position))
        }
        None => (OptionKind::Flag, declared.to_string(), None),
    };

    if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
        return Err(CompileError::InvalidOptionName(name));
    }

    let typer = registry
        .lookup(ty)
        .ok_or_else(|| CompileError::UnknownType {
            field: field_name.to_string(),
            type_name: ty.name(),
        })?;

    let arg_name = attrs
        .get_opt("arg")
        .map(str::to_string)
        .or_else(|| typer.arg_name().map(str::to_string));

    let candidates = match (attrs.get_opt("choices"), attrs.get_opt("lambda")) {
        (Some(list), _) => Some(Candidates::Static(
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        (None, Some(lambda)) if !lambda.is_empty() => Some(Candidates::Lambda(lambda.to_string())),
        _ => None,
    };

    Ok(OptionDef {
        name,
        kind,
        default: attrs.get_opt("default").map(str::to_string),
        description: attrs.get("desc").to_string(),
        arg_name,
        position,
        triggers_usage: false,
        candidates,
        field: field_name,
        slot: Some(access),
        typer,
    })
}

/// Parses a positional marker. `None` means "not a marker"; `Some(None)`
/// means bracketed but malformed.
fn parse_marker(name: &str) -> Option<Option<Position>> {
    let inner = name.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(Some(Position::Rest));
    }
    Some(inner.parse().ok().map(Position::Index))
}

fn validate(command: &str, options: &[OptionDef]) -> Result<(), CompileError> {
    for (i, option) in options.iter().enumerate() {
        if option.is_flag()
            && options[..i]
                .iter()
                .any(|prev| prev.is_flag() && prev.name == option.name)
        {
            return Err(CompileError::DuplicateFlag {
                command: command.to_string(),
                flag: option.name.clone(),
            });
        }
    }

    let args: Vec<&OptionDef> = options.iter().filter(|o| o.is_arg()).collect();
    for (i, arg) in args.iter().enumerate() {
        let invalid = |reason: String| CompileError::InvalidPositional {
            field: arg.field.to_string(),
            reason,
        };
        match arg.position {
            Some(Position::Rest) => {
                if i + 1 != args.len() {
                    return Err(invalid("variadic positional must be declared last".into()));
                }
                if !arg.typer.accumulates() {
                    return Err(invalid(format!(
                        "variadic positional needs a sequence type, found {}",
                        arg.typer.type_name()
                    )));
                }
            }
            Some(Position::Index(n)) => {
                if args[..i]
                    .iter()
                    .any(|prev| prev.position == Some(Position::Index(n)))
                {
                    return Err(invalid(format!("duplicate position {n}")));
                }
            }
            None => {}
        }
    }

    Ok(())
}
