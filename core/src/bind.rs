//! Binding one command's options against a token slice.
//!
//! Flags are scanned from the front while tokens start with `-`. Unknown
//! flags are not errors: they stay in the positional stream in order, which
//! lets dash-prefixed values reach positionals and sub-commands. `--` ends
//! the scan and is dropped. Everything after the scan is positional.

use std::any::Any;

use tracing::trace;

use crate::command::Command;
use crate::error::{BindError, RunError, ValueError};
use crate::option::{OptionDef, Position};

/// Result of binding one command.
pub(crate) struct Bound {
    /// The populated schema value.
    pub(crate) value: Box<dyn Any>,
    /// Every positional token, including those bound to positionals.
    pub(crate) positionals: Vec<String>,
}

/// Binds `tokens` against `command`'s options into a fresh schema value and
/// runs its verification hook.
///
/// Returns the show-usage signal when the help flag appears before a `--`.
pub(crate) fn bind(command: &Command, tokens: &[String]) -> Result<Bound, RunError> {
    let options = command.options();
    let mut matches: Vec<Vec<&[String]>> = vec![Vec::new(); options.len()];
    let mut positionals = Vec::new();

    let mut index = 0;
    let mut terminated = false;
    while let Some(token) = tokens.get(index) {
        let Some(name) = token.strip_prefix('-') else {
            break;
        };
        index += 1;
        if name == "-" {
            trace!(command = %command.name(), "Flag scan terminated");
            terminated = true;
            break;
        }

        let Some(slot) = options.iter().position(|o| o.is_flag() && o.name() == name) else {
            trace!(command = %command.name(), token = %token, "Unknown flag passed through");
            positionals.push(token.clone());
            continue;
        };
        let option = &options[slot];
        if option.triggers_usage() {
            return Err(RunError::usage());
        }

        let values = take_values(option, &tokens[index..])?;
        trace!(command = %command.name(), flag = %name, values = values.len(), "Flag matched");
        index += values.len();
        matches[slot].push(values);
    }

    let rest = &tokens[index..];
    if !terminated && requests_usage(command, rest) {
        return Err(RunError::usage());
    }
    positionals.extend(rest.iter().cloned());

    let mut value = command.binding.instantiate();
    for (option, occurrences) in options.iter().zip(&matches) {
        let Some(slot) = &option.slot else {
            continue;
        };
        let field = slot
            .get_mut(&mut *value)
            .ok_or(RunError::SchemaMismatch(command.schema_name()))?;

        let assigned: Vec<&[String]> = match option.position() {
            None => occurrences.clone(),
            Some(Position::Rest) if positionals.is_empty() => Vec::new(),
            Some(Position::Rest) => vec![&positionals[..]],
            Some(Position::Index(n)) => positionals
                .get(n)
                .map(std::slice::from_ref)
                .into_iter()
                .collect(),
        };

        if assigned.is_empty() {
            if let Some(default) = option.default() {
                set(option, field, &[default.to_string()])?;
            }
            continue;
        }
        for tokens in assigned {
            set(option, field, tokens)?;
        }
    }

    command.binding.verify(&*value)?;
    Ok(Bound { value, positionals })
}

/// Greedily takes up to the flag's maximum arity of acceptable tokens.
fn take_values<'t>(option: &OptionDef, tokens: &'t [String]) -> Result<&'t [String], BindError> {
    let (min, max) = option.typer().arity();
    let found = tokens
        .iter()
        .take(max)
        .take_while(|t| option.typer().can_be_value(t))
        .count();
    if found < min {
        return Err(BindError::Arity {
            flag: option.name().to_string(),
            min,
            found,
        });
    }
    Ok(&tokens[..found])
}

/// Whether a help flag appears among the positional tokens before any `--`.
///
/// Only leaves look past the flag scan; a command with children hands its
/// leftover tokens to the child that owns them.
fn requests_usage(command: &Command, rest: &[String]) -> bool {
    if !command.children().is_empty() {
        return false;
    }
    rest.iter()
        .take_while(|t| t.as_str() != "--")
        .filter_map(|t| t.strip_prefix('-'))
        .any(|name| command.find_flag(name).is_some_and(OptionDef::triggers_usage))
}

fn set(option: &OptionDef, field: &mut dyn Any, tokens: &[String]) -> Result<(), BindError> {
    option
        .typer()
        .set(field, tokens)
        .map_err(|source: ValueError| BindError::Value {
            option: option.name().to_string(),
            source,
        })
}
