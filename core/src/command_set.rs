//! A compiled tree bundled with what dispatch needs.

use std::any::{Any, TypeId};

use tracing::debug;

use crate::bind::bind;
use crate::command::{CommandId, CommandTree};
use crate::compile::Compiler;
use crate::complete::{Completer, Lambdas};
use crate::config::BindConfig;
use crate::dispatch::{ContextMap, Dispatcher, Invocation};
use crate::error::{CompileError, RunError};
use crate::schema::{Schema, erase_action};
use crate::typer::TypeRegistry;
use crate::usage::UsageRenderer;

/// Owns a command tree together with its type registry, configuration,
/// shared context and completion callbacks.
///
/// # Examples
///
/// ```
/// use command_bind_core::{Action, CommandSet, Fields, Invocation, RunError, Schema};
///
/// #[derive(Default)]
/// struct Greet {
///     name: String,
/// }
///
/// impl Greet {
///     fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
///         let greeting = inv.context_or_default::<String>();
///         assert_eq!(format!("{greeting} {}", self.name), "hello world");
///         Ok(())
///     }
/// }
///
/// impl Schema for Greet {
///     fn fields(fields: &mut Fields<Self>) {
///         fields.option("Name", "[0]", |s| &mut s.name);
///     }
///
///     fn action() -> Option<Action<Self>> {
///         Some(Self::run)
///     }
/// }
///
/// let mut set = CommandSet::compile::<Greet>("greet").unwrap();
/// set.context("hello".to_string());
/// set.run(&["world".to_string()]).unwrap();
/// ```
#[derive(Debug)]
pub struct CommandSet {
    tree: CommandTree,
    registry: TypeRegistry,
    config: BindConfig,
    context: ContextMap,
    lambdas: Lambdas,
}

impl CommandSet {
    /// Compiles `S` as the root command with the built-in typers and the
    /// default configuration.
    pub fn compile<S: Schema>(name: &str) -> Result<Self, CompileError> {
        Self::compile_with::<S>(name, TypeRegistry::new(), BindConfig::default())
    }

    /// Compiles `S` with a custom registry and configuration.
    pub fn compile_with<S: Schema>(
        name: &str,
        registry: TypeRegistry,
        config: BindConfig,
    ) -> Result<Self, CompileError> {
        let mut compiler = Compiler::new(&registry, &config);
        compiler.compile::<S>(name)?;
        let tree = compiler.finish();
        debug!(root = %name, commands = tree.len(), "Command set compiled");

        Ok(Self {
            tree,
            registry,
            config,
            context: ContextMap::new(),
            lambdas: Lambdas::new(),
        })
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Makes `value` available to every action through
    /// [`Invocation::context`].
    pub fn context<T: Any>(&mut self, value: T) -> &mut Self {
        self.context.insert(value);
        self
    }

    /// Replaces the whole context map.
    pub fn with_context(&mut self, context: ContextMap) -> &mut Self {
        self.context = context;
        self
    }

    /// Registers a completion callback for `lambda:"name"` annotations.
    pub fn lambda<F>(&mut self, name: impl Into<String>, lambda: F) -> &mut Self
    where
        F: Fn() -> Vec<String> + 'static,
    {
        self.lambdas.insert(name, lambda);
        self
    }

    /// Compiles `S` and attaches it as a sub-command of `parent`.
    ///
    /// The tree is unchanged if compilation fails.
    pub fn add_command<S: Schema>(
        &mut self,
        parent: CommandId,
        name: &str,
    ) -> Result<CommandId, CompileError> {
        let tree = std::mem::take(&mut self.tree);
        let mut compiler = Compiler::extend(tree, &self.registry, &self.config);
        let result = compiler.attach::<S>(parent, name);
        self.tree = compiler.finish();
        result
    }

    /// Replaces the action of command `id`, whose schema must be `S`.
    pub fn set_action<S, F>(&mut self, id: CommandId, action: F) -> Result<(), CompileError>
    where
        S: Schema,
        F: Fn(&mut S, &Invocation<'_>) -> Result<(), RunError> + 'static,
    {
        let command = self
            .tree
            .nodes
            .get_mut(id.0)
            .ok_or(CompileError::UnknownCommand(id.0))?;
        if command.binding.schema_type() != TypeId::of::<S>() {
            return Err(CompileError::SchemaMismatch {
                command: command.name.clone(),
                expected: std::any::type_name::<S>(),
            });
        }
        command.action = Some(erase_action(action));
        Ok(())
    }

    /// Looks a command up by its path of names below the root.
    pub fn command<P: AsRef<str>>(&self, path: &[P]) -> Option<CommandId> {
        self.tree.find(path)
    }

    /// Usage text of the root command.
    pub fn usage(&self) -> String {
        UsageRenderer::new(&self.tree, &self.config.usage).command(CommandId::ROOT, "")
    }

    pub fn completer(&self) -> Completer<'_> {
        Completer::new(&self.tree, &self.lambdas)
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.tree, &self.context, &self.config)
    }

    /// Dispatches `tokens` (without the program name).
    pub fn run(&self, tokens: &[String]) -> Result<(), RunError> {
        self.dispatcher().run(tokens)
    }

    /// Binds `tokens` against the root command only and returns the value.
    ///
    /// Sub-commands are not dispatched and no action runs.
    pub fn bind<S: Schema>(&self, tokens: &[String]) -> Result<S, RunError> {
        let root = self.tree.root();
        let value = bind(root, tokens)
            .map_err(|err| match err {
                RunError::ShowUsage(signal) => {
                    let renderer = UsageRenderer::new(&self.tree, &self.config.usage);
                    RunError::ShowUsage(signal.trace(CommandId::ROOT).render(&renderer))
                }
                other => other,
            })?
            .value;
        value
            .downcast::<S>()
            .map(|value| *value)
            .map_err(|_| RunError::SchemaMismatch(std::any::type_name::<S>()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::schema::Fields;

    #[derive(Debug, Default)]
    struct Git {
        version: bool,
    }

    impl Schema for Git {
        fn fields(fields: &mut Fields<Self>) {
            fields.option("Version", "v", |s| &mut s.version);
        }
    }

    #[derive(Default)]
    struct Tag {
        name: String,
    }

    impl Schema for Tag {
        fn fields(fields: &mut Fields<Self>) {
            fields.option("Name", "[0]", |s| &mut s.name);
        }
    }

    #[test]
    fn test_add_command_and_set_action() {
        let mut set = CommandSet::compile::<Git>("git").unwrap();
        let tag = set.add_command::<Tag>(CommandId::ROOT, "tag").unwrap();
        assert_eq!(set.command(&["tag"]), Some(tag));

        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        set.set_action(tag, move |tag: &mut Tag, _: &Invocation<'_>| {
            flag.set(tag.name == "v1.0");
            Ok(())
        })
        .unwrap();

        set.run(&["tag".to_string(), "v1.0".to_string()]).unwrap();
        assert!(seen.get());
    }

    #[test]
    fn test_set_action_checks_schema() {
        let mut set = CommandSet::compile::<Git>("git").unwrap();
        let err = set
            .set_action(CommandId::ROOT, |_: &mut Tag, _: &Invocation<'_>| Ok(()))
            .unwrap_err();

        assert!(matches!(
            err,
            CompileError::SchemaMismatch { ref command, .. } if command == "git"
        ));
        assert_eq!(
            set.set_action(CommandId(9), |_: &mut Git, _: &Invocation<'_>| Ok(())),
            Err(CompileError::UnknownCommand(9))
        );
    }

    #[test]
    fn test_attached_child_handles_its_own_help() {
        let mut set = CommandSet::compile::<Git>("git").unwrap();
        assert!(set.tree().root().find_flag("h").is_some());

        let tag = set.add_command::<Tag>(CommandId::ROOT, "tag").unwrap();
        assert!(set.tree().root().find_flag("h").is_none());
        assert!(set.tree()[tag].find_flag("h").is_some());

        let err = set.run(&["tag".to_string(), "-h".to_string()]).unwrap_err();
        let names: Vec<&str> = err
            .as_show_usage()
            .unwrap()
            .trail()
            .iter()
            .map(|&id| set.tree()[id].name())
            .collect();
        assert_eq!(names, ["tag", "git"]);
        assert!(err.to_string().starts_with("usage: git [git option] tag [option]"));
    }

    #[test]
    fn test_bind_root_only() {
        let set = CommandSet::compile::<Git>("git").unwrap();

        let git: Git = set.bind(&["-v".to_string()]).unwrap();
        assert!(git.version);

        let err = set.bind::<Git>(&["-h".to_string()]).unwrap_err();
        assert!(err.to_string().starts_with("usage: git [option]\n"));
        assert!(set.bind::<Tag>(&[]).is_err());
    }

    #[test]
    fn test_root_without_action_shows_usage() {
        let set = CommandSet::compile::<Git>("git").unwrap();
        let err = set.run(&[]).unwrap_err();

        assert!(err.is_show_usage());
        assert_eq!(err.to_string(), set.usage());
    }
}
