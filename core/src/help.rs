//! The built-in `help` sub-command.

use crate::dispatch::Invocation;
use crate::error::RunError;
use crate::schema::{Action, Schema};

/// A sub-command printing the root usage.
///
/// Declare it like any other command field:
///
/// ```
/// use command_bind_core::{Fields, HelpCommand, Schema};
///
/// #[derive(Default)]
/// struct Shell;
///
/// impl Schema for Shell {
///     fn fields(fields: &mut Fields<Self>) {
///         fields.command::<HelpCommand>("Help", "");
///     }
/// }
///
/// let set = command_bind_core::compile::<Shell>("shell").unwrap();
/// let err = set.run(&["help".to_string()]).unwrap_err();
/// assert!(err.to_string().starts_with("usage: shell <command>"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpCommand;

impl HelpCommand {
    fn show(&mut self, invocation: &Invocation<'_>) -> Result<(), RunError> {
        Err(RunError::message(invocation.root_usage()))
    }
}

impl Schema for HelpCommand {
    fn describe(&self) -> Option<String> {
        Some("show help".to_string())
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::show)
    }
}
