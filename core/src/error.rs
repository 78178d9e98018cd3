//! Error types for every phase of the engine.
//!
//! Compilation, binding, dispatch and configuration each get their own
//! enum so callers can tell a broken schema apart from a bad command line:
//!
//! - [`CompileError`]: the schema itself is unusable; no tree is produced.
//! - [`ValueError`] / [`BindError`]: a token could not be bound to an option.
//! - [`RunError`]: anything that stops a dispatch, including the
//!   show-usage signal which is not a real failure.
//! - [`ConfigError`]: configuration file I/O or YAML problems.

use thiserror::Error;

use crate::usage::ShowUsage;

/// Errors raised while compiling a schema into a command tree.
///
/// All variants are fatal: compilation stops at the first one and no
/// partial tree is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A field's declared type has no registered or derivable typer.
    #[error("unknown type {type_name} for field {field}")]
    UnknownType {
        /// Field name as declared in the schema.
        field: String,
        /// Rust type name of the field.
        type_name: &'static str,
    },
    /// A flag uses a reserved or malformed name (e.g. `-` or `-v`).
    #[error("invalid option name {0:?}")]
    InvalidOptionName(String),
    /// Two flags in the same command share a name.
    #[error("duplicate flag -{flag} in command {command:?}")]
    DuplicateFlag {
        /// Command owning the flags.
        command: String,
        /// The repeated flag name.
        flag: String,
    },
    /// Two sub-commands under the same parent share a name.
    #[error("duplicate command {0:?}")]
    DuplicateCommand(String),
    /// A positional marker is malformed or violates ordering rules.
    #[error("invalid positional {field}: {reason}")]
    InvalidPositional {
        /// Field name as declared in the schema.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A schema type appears among its own ancestors.
    #[error("recursive command schema {0}")]
    RecursiveSchema(&'static str),
    /// An operation addressed a command whose schema has a different type.
    #[error("command {command:?} is not bound to schema {expected}")]
    SchemaMismatch {
        /// Name of the addressed command.
        command: String,
        /// Schema type the caller expected.
        expected: &'static str,
    },
    /// A command id does not belong to this tree.
    #[error("unknown command id {0}")]
    UnknownCommand(usize),
    /// A sub-command failed to compile.
    #[error("command {command:?}: {source}")]
    Nested {
        /// Name of the failing sub-command.
        command: String,
        /// The underlying failure.
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    /// Returns the innermost error, unwrapping any [`CompileError::Nested`]
    /// layers.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            Self::Nested { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Failure to convert tokens into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The token does not parse as the target type.
    #[error("invalid value {value:?}: {reason}")]
    Invalid {
        /// Offending token.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// A map entry is not of the form `key=value`.
    #[error("invalid map entry {0:?}, expected key=value")]
    InvalidMapEntry(String),
    /// No token was supplied to a typer that needs one.
    #[error("missing value")]
    Missing,
    /// The bound field does not have the typer's value type.
    #[error("field is not a {0}")]
    TypeMismatch(&'static str),
}

/// Failure to bind a command line against one command's options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A flag received fewer values than its typer requires.
    #[error("flag -{flag} expects at least {min} value(s), got {found}")]
    Arity {
        /// Flag name without the leading dash.
        flag: String,
        /// Minimum arity of the flag's typer.
        min: usize,
        /// Number of value tokens actually found.
        found: usize,
    },
    /// A value could not be converted.
    #[error("option {option}: {source}")]
    Value {
        /// Option name.
        option: String,
        /// Conversion failure.
        #[source]
        source: ValueError,
    },
}

/// Boxed error returned by user actions.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can stop a dispatch.
#[derive(Debug, Error)]
pub enum RunError {
    /// Binding the command line failed.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// The bound value rejected itself in its verification hook.
    #[error("{0}")]
    Verify(String),
    /// A plain user-facing message, printed without usage text.
    #[error("{0}")]
    Message(String),
    /// Usage should be shown instead of running anything.
    #[error("{0}")]
    ShowUsage(ShowUsage),
    /// A user action failed.
    #[error("{0}")]
    Action(ActionError),
    /// A bound value did not have the schema type its command expects.
    #[error("bound value is not a {0}")]
    SchemaMismatch(&'static str),
}

impl RunError {
    /// The show-usage signal without a message.
    pub fn usage() -> Self {
        Self::ShowUsage(ShowUsage::new())
    }

    /// The show-usage signal carrying a message printed above the usage.
    pub fn usage_with(message: impl Into<String>) -> Self {
        Self::ShowUsage(ShowUsage::with_message(message))
    }

    /// A user-facing message without usage text.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an arbitrary error returned by an action.
    pub fn action<E>(error: E) -> Self
    where
        E: Into<ActionError>,
    {
        Self::Action(error.into())
    }

    /// Returns the show-usage signal if this is one.
    pub fn as_show_usage(&self) -> Option<&ShowUsage> {
        match self {
            Self::ShowUsage(signal) => Some(signal),
            _ => None,
        }
    }

    /// Returns `true` for the show-usage signal.
    pub fn is_show_usage(&self) -> bool {
        matches!(self, Self::ShowUsage(_))
    }
}

/// Errors from the one-shot [`bind`](crate::bind) and [`run`](crate::run)
/// entry points, which both compile and execute.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Binding or dispatch failed.
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Errors loading or saving a [`BindConfig`](crate::BindConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested() {
        let inner = CompileError::UnknownType {
            field: "Addr".to_string(),
            type_name: "f32",
        };
        let err = CompileError::Nested {
            command: "clone".to_string(),
            source: Box::new(CompileError::Nested {
                command: "deep".to_string(),
                source: Box::new(inner.clone()),
            }),
        };

        assert_eq!(err.root_cause(), &inner);
        assert_eq!(
            err.to_string(),
            "command \"clone\": command \"deep\": unknown type f32 for field Addr"
        );
    }

    #[test]
    fn test_run_error_usage_helpers() {
        assert!(RunError::usage().is_show_usage());
        let err = RunError::usage_with("missing content");
        assert_eq!(
            err.as_show_usage().and_then(|s| s.message()),
            Some("missing content")
        );
        assert!(!RunError::message("boom").is_show_usage());
    }

    #[test]
    fn test_run_error_wraps_action_errors() {
        let io = std::io::Error::other("disk full");
        let err = RunError::action(io);
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_bind_error_display() {
        let err = BindError::Arity {
            flag: "o".to_string(),
            min: 1,
            found: 0,
        };
        assert_eq!(err.to_string(), "flag -o expects at least 1 value(s), got 0");
    }
}
