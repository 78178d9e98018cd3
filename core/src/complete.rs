//! Completion candidates for partially typed command lines.

use std::collections::HashMap;
use std::fmt;

use crate::command::{CommandId, CommandTree};
use crate::option::Candidates;

type Lambda = Box<dyn Fn() -> Vec<String>>;

/// Named candidate callbacks referenced by `lambda:"name"` annotations.
#[derive(Default)]
pub struct Lambdas {
    table: HashMap<String, Lambda>,
}

impl Lambdas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `lambda` under `name`, replacing any previous one.
    pub fn insert<F>(&mut self, name: impl Into<String>, lambda: F) -> &mut Self
    where
        F: Fn() -> Vec<String> + 'static,
    {
        self.table.insert(name.into(), Box::new(lambda));
        self
    }

    /// Calls the callback registered under `name`.
    pub fn call(&self, name: &str) -> Option<Vec<String>> {
        self.table.get(name).map(|lambda| lambda())
    }
}

impl fmt::Debug for Lambdas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.table.keys().collect();
        names.sort_unstable();
        f.debug_struct("Lambdas").field("names", &names).finish()
    }
}

/// Suggests the next segment of a command line.
///
/// Segments are whole tokens; the last one is the segment being typed.
pub struct Completer<'a> {
    tree: &'a CommandTree,
    lambdas: &'a Lambdas,
    start: CommandId,
}

impl<'a> Completer<'a> {
    pub fn new(tree: &'a CommandTree, lambdas: &'a Lambdas) -> Self {
        Self {
            tree,
            lambdas,
            start: CommandId::ROOT,
        }
    }

    /// Starts the walk at `start` instead of the root.
    pub fn starting_at(mut self, start: CommandId) -> Self {
        self.start = start;
        self
    }

    /// Candidates for the last segment, unfiltered.
    ///
    /// Every segment but the last must name a sub-command, otherwise there
    /// is nothing to suggest. At the reached command the candidates are its
    /// sub-command names, or, for a command without sub-commands, the
    /// choices of its single positional argument.
    pub fn candidates<S: AsRef<str>>(&self, segments: &[S]) -> Vec<String> {
        let Some(id) = self.walk(segments) else {
            return Vec::new();
        };
        let Some(command) = self.tree.get(id) else {
            return Vec::new();
        };

        if !command.children().is_empty() {
            return command
                .children()
                .iter()
                .map(|&child| self.tree[child].name().to_string())
                .collect();
        }

        let mut args = command.args();
        let (Some(arg), None) = (args.next(), args.next()) else {
            return Vec::new();
        };
        match arg.candidates() {
            Some(Candidates::Static(choices)) => choices.clone(),
            Some(Candidates::Lambda(name)) => self.lambdas.call(name).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Candidates starting with the partially typed last segment.
    pub fn complete<S: AsRef<str>>(&self, segments: &[S]) -> Vec<String> {
        let partial = segments.last().map(AsRef::<str>::as_ref).unwrap_or("");
        self.candidates(segments)
            .into_iter()
            .filter(|candidate| candidate.starts_with(partial))
            .collect()
    }

    fn walk<S: AsRef<str>>(&self, segments: &[S]) -> Option<CommandId> {
        let typed = segments.len().saturating_sub(1);
        segments[..typed]
            .iter()
            .try_fold(self.start, |id, name| self.tree.child(id, name.as_ref()))
    }
}
