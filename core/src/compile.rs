//! Schema-to-tree compilation.
//!
//! [`Compiler`] walks a schema's declared fields depth first. Value fields
//! become options, command fields become child nodes compiled from their own
//! schema, parent references are recorded for dispatch. Every childless node
//! gets the help flag unless it already declares a flag with that name.

use std::any::TypeId;

use tracing::{debug, trace};

use crate::command::{Command, CommandId, CommandTree};
use crate::config::BindConfig;
use crate::error::CompileError;
use crate::option::{OptionDef, ValueField, compile_options};
use crate::schema::{FieldKind, Fields, Schema, SchemaBinding, erase_action};
use crate::typer::TypeRegistry;

/// Builds a [`CommandTree`] from schemas.
pub(crate) struct Compiler<'a> {
    registry: &'a TypeRegistry,
    config: &'a BindConfig,
    nodes: Vec<Command>,
    active: Vec<TypeId>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(registry: &'a TypeRegistry, config: &'a BindConfig) -> Self {
        Self::extend(CommandTree::default(), registry, config)
    }

    /// Continues compiling into an existing tree.
    pub(crate) fn extend(
        tree: CommandTree,
        registry: &'a TypeRegistry,
        config: &'a BindConfig,
    ) -> Self {
        Self {
            registry,
            config,
            nodes: tree.nodes,
            active: Vec::new(),
        }
    }

    /// Compiles `S` as the root command.
    pub(crate) fn compile<S: Schema>(&mut self, name: &str) -> Result<CommandId, CompileError> {
        self.nodes.clear();
        self.compile_node::<S>(None, name.to_string(), None)
    }

    /// Compiles `S` and attaches it under `parent`. On failure the tree is
    /// left as it was.
    pub(crate) fn attach<S: Schema>(
        &mut self,
        parent: CommandId,
        name: &str,
    ) -> Result<CommandId, CompileError> {
        let Some(node) = self.nodes.get(parent.0) else {
            return Err(CompileError::UnknownCommand(parent.0));
        };
        let previous_children = node.children.len();
        let previous_len = self.nodes.len();

        let result = self.attach_child::<S>(parent, name.to_string(), None);
        if result.is_err() {
            self.nodes.truncate(previous_len);
            self.nodes[parent.0].children.truncate(previous_children);
        }
        result
    }

    pub(crate) fn finish(self) -> CommandTree {
        CommandTree { nodes: self.nodes }
    }

    fn attach_child<S: Schema>(
        &mut self,
        parent: CommandId,
        name: String,
        fallback: Option<String>,
    ) -> Result<CommandId, CompileError> {
        let siblings = &self.nodes[parent.0].children;
        if siblings.iter().any(|&id| self.nodes[id.0].name == name) {
            return Err(CompileError::DuplicateCommand(name));
        }

        let id = self.compile_node::<S>(Some(parent), name, fallback)?;
        let node = &mut self.nodes[parent.0];
        node.children.push(id);
        // Commands with children leave help to their leaves.
        node.options.retain(|option| !option.triggers_usage());
        Ok(id)
    }

    fn compile_node<S: Schema>(
        &mut self,
        parent: Option<CommandId>,
        name: String,
        fallback: Option<String>,
    ) -> Result<CommandId, CompileError> {
        let schema = TypeId::of::<S>();
        if self.active.contains(&schema) {
            return Err(CompileError::RecursiveSchema(std::any::type_name::<S>()));
        }

        self.active.push(schema);
        let result = self.build_node::<S>(parent, name, fallback);
        self.active.pop();
        result
    }

    fn build_node<S: Schema>(
        &mut self,
        parent: Option<CommandId>,
        name: String,
        fallback: Option<String>,
    ) -> Result<CommandId, CompileError> {
        let id = CommandId(self.nodes.len());

        let mut values = Vec::new();
        let mut parents = Vec::new();
        let mut commands = Vec::new();
        for def in Fields::<S>::collect() {
            match def.kind {
                FieldKind::Value { ty, access } => values.push(ValueField {
                    name: def.name,
                    attrs: def.attrs,
                    ty,
                    access,
                }),
                FieldKind::Parent(slot) => parents.push(slot),
                FieldKind::Command(compile) => commands.push((def.name, def.attrs, compile)),
            }
        }

        let (options, init_description) = compile_options::<S>(&name, values, self.registry)?;
        let description = init_description
            .or_else(|| S::default().describe())
            .or(fallback)
            .unwrap_or_default();

        trace!(command = %name, options = options.len(), "Options compiled");
        self.nodes.push(Command {
            id,
            name,
            description,
            parent,
            children: Vec::new(),
            options,
            binding: Box::new(SchemaBinding::<S>::new()),
            parents,
            action: S::action().map(erase_action::<S, _>),
        });

        for (field, attrs, compile) in commands {
            let child_name = attrs
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| field.to_lowercase());
            let fallback = attrs.get_opt("desc").map(str::to_string);

            compile(self, id, child_name.clone(), fallback).map_err(|source| CompileError::Nested {
                command: child_name,
                source: Box::new(source),
            })?;
        }

        self.ensure_help(id);
        let node = &self.nodes[id.0];
        debug!(
            command = %node.name,
            schema = std::any::type_name::<S>(),
            children = node.children.len(),
            "Command compiled"
        );
        Ok(id)
    }

    fn ensure_help(&mut self, id: CommandId) {
        let help = &self.config.help;
        let node = &mut self.nodes[id.0];
        if !node.children.is_empty() || node.find_flag(&help.flag).is_some() {
            return;
        }
        trace!(command = %node.name, flag = %help.flag, "Help flag injected");
        node.options.push(OptionDef::help(help));
    }
}

/// Compiles schema `C` as a sub-command; stored in command field
/// descriptors.
pub(crate) fn compile_child<C: Schema>(
    compiler: &mut Compiler<'_>,
    parent: CommandId,
    name: String,
    fallback: Option<String>,
) -> Result<CommandId, CompileError> {
    compiler.attach_child::<C>(parent, name, fallback)
}
