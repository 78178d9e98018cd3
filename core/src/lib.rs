//! Declarative command trees for command-line programs.
//!
//! A program describes its commands as plain Rust types implementing
//! [`Schema`]. Each schema lists its fields in order, and an annotation
//! string on each field decides what it becomes:
//!
//! - a flag (`-name`), bound from the tokens that follow it,
//! - a positional argument (`[0]`, `[1]`, ..., or `[]` for the rest),
//! - a sub-command (a field holding another schema),
//! - a parent reference, filled with an enclosing command's bound value.
//!
//! [`compile`] turns a root schema into a [`CommandSet`]: an arena
//! [`CommandTree`] of [`Command`] nodes with their [`OptionDef`]s, plus the
//! [`TypeRegistry`] that converts tokens into field values, the
//! [`BindConfig`], a [`ContextMap`] of shared values and the completion
//! [`Lambdas`].
//!
//! Running a token vector binds each command's options, descends into the
//! sub-command named by the first leftover token and finally calls the
//! reached command's action. Help requests and commands without an action
//! come back as [`RunError::ShowUsage`] carrying the rendered usage text.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use command_bind_core::{Action, Fields, Invocation, RunError, Schema};
//!
//! type Output = Rc<RefCell<String>>;
//!
//! #[derive(Default)]
//! struct Echo {
//!     upper: bool,
//!     words: Vec<String>,
//! }
//!
//! impl Echo {
//!     fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
//!         let text = self.words.join(" ");
//!         let out = if self.upper { text.to_uppercase() } else { text };
//!         let output = inv.context::<Output>().ok_or_else(|| RunError::message("no output"))?;
//!         *output.borrow_mut() = out;
//!         Ok(())
//!     }
//! }
//!
//! impl Schema for Echo {
//!     fn fields(fields: &mut Fields<Self>) {
//!         fields
//!             .option("Upper", r#"u desc:"shout""#, |s| &mut s.upper)
//!             .option("Words", "[]", |s| &mut s.words);
//!     }
//!
//!     fn action() -> Option<Action<Self>> {
//!         Some(Self::run)
//!     }
//! }
//!
//! let mut set = command_bind_core::compile::<Echo>("echo").unwrap();
//! let output = Output::default();
//! set.context(Rc::clone(&output));
//!
//! let tokens: Vec<String> = ["-u", "hello", "world"].iter().map(|s| s.to_string()).collect();
//! set.run(&tokens).unwrap();
//! assert_eq!(*output.borrow(), "HELLO WORLD");
//!
//! let err = set.run(&["-h".to_string()]).unwrap_err();
//! assert!(err.to_string().starts_with("usage: echo [option] [--] <words>..."));
//! ```

mod attrs;
mod bind;
mod command;
mod command_set;
mod compile;
mod complete;
mod config;
mod dispatch;
mod error;
mod help;
mod option;
mod outline;
mod schema;
pub mod typer;
mod usage;

pub use attrs::Attributes;
pub use command::{Command, CommandId, CommandTree};
pub use command_set::CommandSet;
pub use complete::{Completer, Lambdas};
pub use config::{BindConfig, HelpConfig, UsageConfig};
pub use dispatch::{ContextMap, Dispatcher, Invocation};
pub use error::{
    ActionError, BindError, CompileError, ConfigError, Error, RunError, ValueError,
};
pub use help::HelpCommand;
pub use option::{Candidates, OptionDef, OptionKind, Position};
pub use outline::{CommandOutline, OptionOutline};
pub use schema::{Action, Fields, InitContext, Schema};
pub use typer::{FnParser, IpNetwork, TypeKey, TypeRegistry, Typer, ValueParser};
pub use usage::{ShowUsage, UsageRenderer};

/// Compiles `S` as the root command `name` with the built-in typers and
/// the default configuration.
pub fn compile<S: Schema>(name: &str) -> Result<CommandSet, CompileError> {
    CommandSet::compile::<S>(name)
}

/// Compiles `S` and binds `args` against the root command only.
///
/// `args[0]` is the program name. No sub-command is entered and no action
/// runs; the help flag still yields [`RunError::ShowUsage`].
pub fn bind<S: Schema>(args: &[String]) -> Result<S, Error> {
    let (program, tokens) = split_program(args);
    let set = CommandSet::compile::<S>(program)?;
    Ok(set.bind::<S>(tokens)?)
}

/// Compiles `S` and dispatches `args` through the resulting tree.
///
/// `args[0]` is the program name; `context` is shared with every action.
pub fn run<S: Schema>(args: &[String], context: ContextMap) -> Result<(), Error> {
    let (program, tokens) = split_program(args);
    let mut set = CommandSet::compile::<S>(program)?;
    set.with_context(context);
    Ok(set.run(tokens)?)
}

fn split_program(args: &[String]) -> (&str, &[String]) {
    match args.split_first() {
        Some((program, tokens)) => (program.as_str(), tokens),
        None => ("", &[]),
    }
}
