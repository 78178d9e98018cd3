//! Usage text.
//!
//! Layout for a command `clone` under `git`:
//!
//! ```text
//! usage: git [git option] clone [option] [--] <repo> [<dir>]
//!
//! options:
//!     -v                  be more verbose
//!     -template <template-directory>
//!                         directory from which templates will be used
//!     -h                  show help
//!
//! git options:
//!     -version            show version
//! ```
//!
//! Output is deterministic for a given tree and [`UsageConfig`].

use std::fmt;

use crate::command::{Command, CommandId, CommandTree};
use crate::config::UsageConfig;
use crate::option::{OptionDef, Position};

/// The show-usage signal.
///
/// Raised when help is requested or a command without an action is reached.
/// Every dispatch frame it passes through appends its command to the trail;
/// the outermost dispatcher renders the text once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowUsage {
    message: Option<String>,
    trail: Vec<CommandId>,
    usage: Option<String>,
}

impl ShowUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal whose message is printed above the usage text.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Records that the signal passed through `command`.
    pub fn trace(mut self, command: CommandId) -> Self {
        self.trail.push(command);
        self
    }

    /// Commands the signal passed through, innermost first.
    pub fn trail(&self) -> &[CommandId] {
        &self.trail
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Rendered usage text, once the outermost dispatcher has rendered it.
    pub fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub(crate) fn render(mut self, renderer: &UsageRenderer<'_>) -> Self {
        let text = if self.trail.is_empty() {
            renderer.command(CommandId::ROOT, "")
        } else {
            renderer.trail(&self.trail)
        };
        self.usage = Some(text);
        self
    }
}

impl fmt::Display for ShowUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.usage) {
            (Some(message), Some(usage)) => write!(f, "{message}\n\n{usage}"),
            (Some(message), None) => f.write_str(message),
            (None, Some(usage)) => f.write_str(usage),
            (None, None) => f.write_str("show usage"),
        }
    }
}

/// Renders usage text for commands of one tree.
pub struct UsageRenderer<'a> {
    tree: &'a CommandTree,
    config: &'a UsageConfig,
}

impl<'a> UsageRenderer<'a> {
    pub fn new(tree: &'a CommandTree, config: &'a UsageConfig) -> Self {
        Self { tree, config }
    }

    /// Full usage of one command: the usage line, its options and its
    /// sub-commands. `prefix` is printed before the command name.
    pub fn command(&self, id: CommandId, prefix: &str) -> String {
        let Some(command) = self.tree.get(id) else {
            return String::new();
        };
        let mut out = self.usage_line(command, prefix);
        if command.has_flags() {
            out.push_str(&self.options(command, "options"));
        }
        if !command.children().is_empty() {
            out.push_str("\ncommands:\n");
            for &child in command.children() {
                self.write_command(&mut out, &self.tree[child]);
            }
        }
        out
    }

    /// Usage for a show-usage trail (innermost first).
    ///
    /// The innermost command gets its full usage, prefixed by its ancestors'
    /// names. Each ancestor with flags then gets its own options block, root
    /// first.
    pub fn trail(&self, trail: &[CommandId]) -> String {
        let Some((&leaf, ancestors)) = trail.split_first() else {
            return String::new();
        };
        let prefix = ancestors
            .iter()
            .rev()
            .filter_map(|&id| self.tree.get(id))
            .map(|command| self.usage_prefix(command))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = self.command(leaf, &prefix);
        for command in ancestors.iter().rev().filter_map(|&id| self.tree.get(id)) {
            if command.has_flags() {
                out.push_str(&self.options(command, &format!("{} options", command.name())));
            }
        }
        out
    }

    /// An ancestor's part of a usage line: `name [name option]`.
    pub fn usage_prefix(&self, command: &Command) -> String {
        if command.has_flags() {
            format!("{0} [{0} option]", command.name())
        } else {
            command.name().to_string()
        }
    }

    fn usage_line(&self, command: &Command, prefix: &str) -> String {
        let mut line = String::from("usage:");
        for part in [prefix, command.name()] {
            if !part.is_empty() {
                line.push(' ');
                line.push_str(part);
            }
        }
        if command.has_flags() {
            line.push_str(" [option]");
        }
        if !command.children().is_empty() {
            line.push_str(" <command>");
        }
        if command.has_args() {
            if command.has_flags() {
                line.push_str(" [--]");
            }
            for arg in command.args() {
                line.push(' ');
                let placeholder = match arg.position() {
                    Some(Position::Rest) => format!("<{}>...", arg.name()),
                    _ => format!("<{}>", arg.name()),
                };
                if arg.default().is_some() {
                    line.push_str(&format!("[{placeholder}]"));
                } else {
                    line.push_str(&placeholder);
                }
            }
        }
        line.push('\n');
        line
    }

    fn options(&self, command: &Command, title: &str) -> String {
        let mut out = format!("\n{title}:\n");
        for flag in command.flags() {
            out.push_str(&self.flag_line(flag));
            out.push('\n');
        }
        out
    }

    fn flag_line(&self, flag: &OptionDef) -> String {
        let mut line = " ".repeat(self.config.indent);
        line.push('-');
        line.push_str(flag.name());

        let (min, _) = flag.typer().arity();
        if let (true, Some(arg)) = (min > 0, flag.arg_name()) {
            match flag.default() {
                Some(default) => line.push_str(&format!("[=<{arg}={default}>]")),
                None => line.push_str(&format!(" <{arg}>")),
            }
        }

        let column = self.config.indent + self.config.option_width;
        self.append_column(&mut line, column, flag.description());
        line
    }

    fn write_command(&self, out: &mut String, command: &Command) {
        let mut line = " ".repeat(self.config.indent);
        line.push_str(command.name());
        let column = self.config.indent + self.config.command_width;
        self.append_column(&mut line, column, command.description());
        out.push_str(&line);
        out.push('\n');
    }

    /// Appends `text` starting at `column`, wrapping to a new line when the
    /// current content is too wide.
    fn append_column(&self, line: &mut String, column: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        if line.len() > column {
            line.push('\n');
            line.push_str(&" ".repeat(column));
        } else {
            line.push_str(&" ".repeat(column - line.len()));
        }
        line.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Compiler;
    use crate::config::BindConfig;
    use crate::schema::{Fields, InitContext, Schema};
    use crate::typer::TypeRegistry;

    #[derive(Default)]
    struct Time {
        layout: String,
    }

    impl Schema for Time {
        fn fields(fields: &mut Fields<Self>) {
            fields.option(
                "Layout",
                r#"type:"[0]" default:"2006-01-02 15:04:05""#,
                |s| &mut s.layout,
            );
        }
    }

    #[derive(Default)]
    struct Base64 {
        decode: bool,
        content: String,
    }

    impl Schema for Base64 {
        fn fields(fields: &mut Fields<Self>) {
            fields
                .option("IsDecode", r#"name:"d" desc:"decode string""#, |s| &mut s.decode)
                .option("Content", r#"type:"[0]""#, |s| &mut s.content);
        }
    }

    #[derive(Default)]
    struct Shell {
        level: u32,
    }

    impl Schema for Shell {
        fn fields(fields: &mut Fields<Self>) {
            fields
                .option("Level", r#"l arg:"n" default:"1""#, |s| &mut s.level)
                .command::<Time>("Time", "")
                .command::<Base64>("Base64", "");
        }

        fn init(&mut self, ctx: &mut InitContext) {
            ctx.describe(&self.level, "verbosity level");
        }
    }

    fn tree() -> CommandTree {
        let registry = TypeRegistry::new();
        let config = BindConfig::default();
        let mut compiler = Compiler::new(&registry, &config);
        compiler.compile::<Shell>("shell").unwrap();
        compiler.finish()
    }

    #[test]
    fn test_leaf_usage_layout() {
        let tree = tree();
        let config = UsageConfig::default();
        let renderer = UsageRenderer::new(&tree, &config);
        let time = tree.find(&["time"]).unwrap();

        assert_eq!(
            renderer.command(time, ""),
            "usage: time [option] [--] [<layout>]\n\
             \n\
             options:\n    \
             -h                  show help\n"
        );
    }

    #[test]
    fn test_root_usage_lists_commands() {
        let tree = tree();
        let config = UsageConfig::default();
        let renderer = UsageRenderer::new(&tree, &config);

        assert_eq!(
            renderer.command(CommandId::ROOT, ""),
            "usage: shell [option] <command>\n\
             \n\
             options:\n    \
             -l[=<n=1>]          verbosity level\n\
             \n\
             commands:\n    \
             time\n    \
             base64\n"
        );
    }

    #[test]
    fn test_trail_adds_prefix_and_ancestor_options() {
        let tree = tree();
        let config = UsageConfig::default();
        let renderer = UsageRenderer::new(&tree, &config);
        let base64 = tree.find(&["base64"]).unwrap();

        let text = ShowUsage::with_message("missing content")
            .trace(base64)
            .trace(CommandId::ROOT)
            .render(&renderer)
            .to_string();

        assert_eq!(
            text,
            "missing content\n\
             \n\
             usage: shell [shell option] base64 [option] [--] <content>\n\
             \n\
             options:\n    \
             -d                  decode string\n    \
             -h                  show help\n\
             \n\
             shell options:\n    \
             -l[=<n=1>]          verbosity level\n"
        );
    }

    #[test]
    fn test_long_flag_wraps_description() {
        let tree = tree();
        let config = UsageConfig {
            indent: 2,
            option_width: 6,
            command_width: 20,
        };
        let renderer = UsageRenderer::new(&tree, &config);
        let text = renderer.command(CommandId::ROOT, "");

        assert!(text.contains("\n  -l[=<n=1>]\n        verbosity level\n"));
    }

    #[test]
    fn test_signal_display_without_usage() {
        assert_eq!(ShowUsage::with_message("boom").to_string(), "boom");
        assert_eq!(ShowUsage::new().to_string(), "show usage");
    }
}
