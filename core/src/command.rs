//! The compiled command tree.
//!
//! Commands live in one arena owned by [`CommandTree`] and refer to each
//! other by [`CommandId`]. Parent links are plain indices, so the tree has
//! no shared ownership and is immutable once compiled.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::option::OptionDef;
use crate::outline::{CommandOutline, OptionOutline};
use crate::schema::{Binding, ErasedAction, ParentAccess};

/// Index of a command inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    /// The root command of every tree.
    pub const ROOT: CommandId = CommandId(0);

    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the command tree.
pub struct Command {
    pub(crate) id: CommandId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parent: Option<CommandId>,
    pub(crate) children: Vec<CommandId>,
    pub(crate) options: Vec<OptionDef>,
    pub(crate) binding: Box<dyn Binding>,
    pub(crate) parents: Vec<Box<dyn ParentAccess>>,
    pub(crate) action: Option<Box<dyn ErasedAction>>,
}

impl Command {
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The enclosing command; `None` for the root.
    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    /// Sub-commands in declaration order.
    pub fn children(&self) -> &[CommandId] {
        &self.children
    }

    /// All options in declaration order, the help flag last.
    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn flags(&self) -> impl Iterator<Item = &OptionDef> {
        self.options.iter().filter(|o| o.is_flag())
    }

    pub fn args(&self) -> impl Iterator<Item = &OptionDef> {
        self.options.iter().filter(|o| o.is_arg())
    }

    pub fn has_flags(&self) -> bool {
        self.flags().next().is_some()
    }

    pub fn has_args(&self) -> bool {
        self.args().next().is_some()
    }

    /// Finds a flag by name (without the dash).
    pub fn find_flag(&self, name: &str) -> Option<&OptionDef> {
        self.flags().find(|o| o.name() == name)
    }

    /// Whether the command runs something rather than only showing usage.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Rust type name of the command's schema.
    pub fn schema_name(&self) -> &'static str {
        self.binding.type_name()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("options", &self.options)
            .field("schema", &self.schema_name())
            .field("has_action", &self.has_action())
            .finish()
    }
}

/// Arena of compiled commands; the root is [`CommandId::ROOT`].
#[derive(Debug, Default)]
pub struct CommandTree {
    pub(crate) nodes: Vec<Command>,
}

impl CommandTree {
    /// The root command.
    ///
    /// # Panics
    ///
    /// Panics if the tree is empty. Trees produced by compilation always hold
    /// a root; use [`CommandTree::get`] with [`CommandId::ROOT`] for a tree
    /// built with [`Default`].
    pub fn root(&self) -> &Command {
        &self[CommandId::ROOT]
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All commands in compilation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.nodes.iter()
    }

    /// The first child of `parent` named `name`.
    pub fn child(&self, parent: CommandId, name: &str) -> Option<CommandId> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|&id| self[id].name == name)
    }

    /// Follows `path` from the root, one child name per segment.
    ///
    /// An empty path yields the root.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<CommandId> {
        if self.is_empty() {
            return None;
        }
        path.iter()
            .try_fold(CommandId::ROOT, |id, name| self.child(id, name.as_ref()))
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path(&self, id: CommandId) -> Vec<CommandId> {
        let mut path = Vec::new();
        let mut current = self.get(id).map(|c| c.id);
        while let Some(at) = current {
            path.push(at);
            current = self[at].parent;
        }
        path.reverse();
        path
    }

    /// Serializable structural outline of the whole tree.
    pub fn outline(&self) -> Option<CommandOutline> {
        self.get(CommandId::ROOT).map(|_| self.outline_of(CommandId::ROOT))
    }

    fn outline_of(&self, id: CommandId) -> CommandOutline {
        let command = &self[id];
        CommandOutline {
            name: command.name.clone(),
            description: command.description.clone(),
            options: command.options.iter().map(OptionOutline::from).collect(),
            children: command
                .children
                .iter()
                .map(|&child| self.outline_of(child))
                .collect(),
        }
    }
}

/// # Panics
///
/// Panics if `id` does not belong to this tree.
impl Index<CommandId> for CommandTree {
    type Output = Command;

    fn index(&self, id: CommandId) -> &Command {
        &self.nodes[id.0]
    }
}
