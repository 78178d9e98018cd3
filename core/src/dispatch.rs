//! Walking the tree against a token vector.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::bind::bind;
use crate::command::{Command, CommandId, CommandTree};
use crate::config::BindConfig;
use crate::error::RunError;
use crate::usage::UsageRenderer;

/// Values shared with every action, looked up by exact type.
#[derive(Default)]
pub struct ContextMap {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any previous value of the same type.
    pub fn insert<T: Any>(&mut self, value: T) -> &mut Self {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ContextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextMap").field("len", &self.values.len()).finish()
    }
}

/// Everything an action can see besides its own bound value.
pub struct Invocation<'a> {
    tree: &'a CommandTree,
    command: CommandId,
    args: &'a [String],
    ancestors: &'a [Box<dyn Any>],
    context: &'a ContextMap,
    config: &'a BindConfig,
}

impl<'a> Invocation<'a> {
    /// The invoked command.
    pub fn command(&self) -> &'a Command {
        &self.tree[self.command]
    }

    pub fn command_id(&self) -> CommandId {
        self.command
    }

    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    /// Positional tokens of the invoked command.
    pub fn args(&self) -> &'a [String] {
        self.args
    }

    /// The nearest ancestor's bound value of type `P`.
    pub fn parent<P: Any>(&self) -> Option<&'a P> {
        self.ancestors
            .iter()
            .rev()
            .find_map(|value| (**value).downcast_ref::<P>())
    }

    /// A shared context value.
    pub fn context<T: Any>(&self) -> Option<&'a T> {
        self.context.get::<T>()
    }

    /// A shared context value, or `T::default()` when none was provided.
    pub fn context_or_default<T: Any + Default + Clone>(&self) -> T {
        self.context.get::<T>().cloned().unwrap_or_default()
    }

    /// Usage text of the invoked command, prefixed by its ancestors.
    pub fn usage(&self) -> String {
        let mut trail = self.tree.path(self.command);
        trail.reverse();
        UsageRenderer::new(self.tree, &self.config.usage).trail(&trail)
    }

    /// Usage text of the root command.
    pub fn root_usage(&self) -> String {
        UsageRenderer::new(self.tree, &self.config.usage).command(CommandId::ROOT, "")
    }
}

/// Runs token vectors against a compiled tree.
pub struct Dispatcher<'a> {
    tree: &'a CommandTree,
    context: &'a ContextMap,
    config: &'a BindConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(tree: &'a CommandTree, context: &'a ContextMap, config: &'a BindConfig) -> Self {
        Self {
            tree,
            context,
            config,
        }
    }

    /// Dispatches `tokens` from the root.
    ///
    /// A show-usage signal comes back with its usage text rendered.
    pub fn run(&self, tokens: &[String]) -> Result<(), RunError> {
        if self.tree.is_empty() {
            return Err(RunError::usage());
        }
        let mut stack = Vec::new();
        self.run_from(CommandId::ROOT, &mut stack, tokens)
            .map_err(|err| match err {
                RunError::ShowUsage(signal) => {
                    let renderer = UsageRenderer::new(self.tree, &self.config.usage);
                    RunError::ShowUsage(signal.render(&renderer))
                }
                other => other,
            })
    }

    fn run_from(
        &self,
        id: CommandId,
        stack: &mut Vec<Box<dyn Any>>,
        tokens: &[String],
    ) -> Result<(), RunError> {
        self.step(id, stack, tokens).map_err(|err| match err {
            RunError::ShowUsage(signal) => RunError::ShowUsage(signal.trace(id)),
            other => other,
        })
    }

    fn step(
        &self,
        id: CommandId,
        stack: &mut Vec<Box<dyn Any>>,
        tokens: &[String],
    ) -> Result<(), RunError> {
        let command = &self.tree[id];
        let bound = bind(command, tokens)?;
        let mut value = bound.value;
        for parent in &command.parents {
            parent.fill(&mut *value, stack);
        }
        stack.push(value);

        if let Some((first, rest)) = bound.positionals.split_first() {
            if let Some(child) = self.tree.child(id, first) {
                debug!(from = %command.name(), to = %first, "Descending");
                return self.run_from(child, stack, rest);
            }
        }

        let Some(action) = &command.action else {
            debug!(command = %command.name(), "No action, showing usage");
            return Err(RunError::usage());
        };
        let Some((value, ancestors)) = stack.split_last_mut() else {
            return Err(RunError::SchemaMismatch(command.schema_name()));
        };
        let invocation = Invocation {
            tree: self.tree,
            command: id,
            args: &bound.positionals,
            ancestors,
            context: self.context,
            config: self.config,
        };
        debug!(command = %command.name(), args = bound.positionals.len(), "Invoking action");
        action.call(&mut **value, &invocation)
    }
}
