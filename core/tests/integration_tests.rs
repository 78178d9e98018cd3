use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use command_bind_core::{
    Action, BindConfig, BindError, CommandSet, ContextMap, Error, Fields, HelpCommand, InitContext,
    Invocation, RunError, Schema, TypeRegistry, UsageConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Journal = Rc<RefCell<Vec<String>>>;

fn record(inv: &Invocation<'_>, line: String) -> Result<(), RunError> {
    let journal = inv
        .context::<Journal>()
        .ok_or_else(|| RunError::message("no journal"))?;
    journal.borrow_mut().push(line);
    Ok(())
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn run(items: &[&str]) -> (Result<(), Error>, Vec<String>) {
    run_with::<Git>(items)
}

fn run_with<S: Schema>(items: &[&str]) -> (Result<(), Error>, Vec<String>) {
    let journal = Journal::default();
    let mut context = ContextMap::new();
    context.insert(Rc::clone(&journal));
    let result = command_bind_core::run::<S>(&args(items), context);
    let lines = journal.borrow().clone();
    (result, lines)
}

fn usage_text(result: Result<(), Error>) -> String {
    match result {
        Err(Error::Run(RunError::ShowUsage(signal))) => signal.to_string(),
        other => panic!("expected show usage, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct Git {
    verbose: bool,
    config: HashMap<String, String>,
}

impl Schema for Git {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Verbose", r#"v desc:"be verbose""#, |s| &mut s.verbose)
            .option("Config", r#"c desc:"set config entry""#, |s| &mut s.config)
            .command::<GitClone>("Clone", "")
            .command::<Init>("Init", "")
            .command::<Add>("Add", "")
            .command::<HelpCommand>("Help", "");
    }
}

#[derive(Debug, Default)]
struct GitClone {
    repo: Option<String>,
    dir: String,
    depth: u32,
    git: Option<Git>,
}

impl GitClone {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
        let verbose = self.git.as_ref().is_some_and(|git| git.verbose);
        record(
            inv,
            format!(
                "clone repo={:?} dir={} depth={} verbose={}",
                self.repo, self.dir, self.depth, verbose
            ),
        )
    }
}

impl Schema for GitClone {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Repo", "[0]", |s| &mut s.repo)
            .option("Dir", r#"[1] default:".""#, |s| &mut s.dir)
            .option("Depth", r#"depth arg:"n""#, |s| &mut s.depth)
            .parent("Git", |s| &mut s.git);
    }

    fn describe(&self) -> Option<String> {
        Some("clone a repository".to_string())
    }

    fn init(&mut self, ctx: &mut InitContext) {
        ctx.describe(&self.depth, "history depth");
    }

    fn verify(&self) -> Result<(), String> {
        if self.depth > 1000 {
            return Err(format!("depth {} is too large", self.depth));
        }
        Ok(())
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::run)
    }
}

#[derive(Debug, Default)]
struct Init {
    bare: bool,
    git: Option<Git>,
}

impl Init {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
        let mut entries: Vec<String> = self
            .git
            .iter()
            .flat_map(|git| git.config.iter())
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        entries.sort();
        record(inv, format!("init bare={} config={:?}", self.bare, entries))
    }
}

impl Schema for Init {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Bare", r#"bare desc:"create a bare repository""#, |s| &mut s.bare)
            .parent("Git", |s| &mut s.git);
    }

    fn describe(&self) -> Option<String> {
        Some("create an empty repository".to_string())
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::run)
    }
}

#[derive(Debug, Default)]
struct Add {
    force: bool,
    paths: Vec<String>,
}

impl Add {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
        record(inv, format!("add force={} paths={:?}", self.force, self.paths))
    }
}

impl Schema for Add {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Force", "f", |s| &mut s.force)
            .option("Paths", "[]", |s| &mut s.paths);
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::run)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn test_clone_binds_positionals_and_defaults() {
    let (result, lines) = run(&["git", "clone", "myrepo"]);
    result.unwrap();
    assert_eq!(lines, ["clone repo=Some(\"myrepo\") dir=. depth=0 verbose=false"]);
}

#[test]
fn test_clone_without_repo_leaves_it_unset() {
    let (result, lines) = run(&["git", "clone"]);
    result.unwrap();
    assert_eq!(lines, ["clone repo=None dir=. depth=0 verbose=false"]);
}

#[test]
fn test_parent_flags_reach_child() {
    let (result, lines) = run(&["git", "-v", "clone", "-depth", "1", "myrepo", "out"]);
    result.unwrap();
    assert_eq!(lines, ["clone repo=Some(\"myrepo\") dir=out depth=1 verbose=true"]);
}

#[test]
fn test_map_flag_accumulates() {
    let (result, lines) = run(&["git", "-c", "a=1", "-c", "b=2", "init", "-bare"]);
    result.unwrap();
    assert_eq!(lines, ["init bare=true config=[\"a=1\", \"b=2\"]"]);
}

#[test]
fn test_malformed_map_entry() {
    let (result, lines) = run(&["git", "-c", "novalue", "init"]);
    let err = result.unwrap_err();

    assert!(matches!(
        err,
        Error::Run(RunError::Bind(BindError::Value { ref option, .. })) if option == "c"
    ));
    assert!(lines.is_empty());
}

#[test]
fn test_terminator_and_unknown_flags() {
    let (result, lines) = run(&["git", "add", "-x", "a"]);
    result.unwrap();
    let (result, more) = run(&["git", "add", "--", "-f", "b"]);
    result.unwrap();

    assert_eq!(lines, ["add force=false paths=[\"-x\", \"a\"]"]);
    assert_eq!(more, ["add force=false paths=[\"-f\", \"b\"]"]);
}

#[test]
fn test_help_flag_never_runs_action() {
    for input in [
        &["git", "clone", "-h"][..],
        &["git", "clone", "myrepo", "-h"],
        &["git", "clone", "-depth", "3", "-h", "myrepo"],
    ] {
        let (result, lines) = run(input);
        assert!(usage_text(result).starts_with("usage: git [git option] clone [option]"));
        assert!(lines.is_empty(), "action ran for {input:?}");
    }
}

#[test]
fn test_help_after_terminator_is_positional() {
    let (result, lines) = run(&["git", "clone", "--", "-h"]);
    result.unwrap();
    assert_eq!(lines, ["clone repo=Some(\"-h\") dir=. depth=0 verbose=false"]);
}

#[test]
fn test_verify_failure_is_a_message() {
    let (result, lines) = run(&["git", "clone", "-depth", "5000", "r"]);
    let err = result.unwrap_err();

    assert!(matches!(err, Error::Run(RunError::Verify(ref m)) if m == "depth 5000 is too large"));
    assert!(lines.is_empty());
}

#[test]
fn test_arity_and_conversion_errors() {
    let (result, _) = run(&["git", "clone", "-depth"]);
    assert!(matches!(
        result.unwrap_err(),
        Error::Run(RunError::Bind(BindError::Arity { ref flag, min: 1, found: 0 }))
            if flag == "depth"
    ));

    let (result, _) = run(&["git", "clone", "-depth", "deep"]);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Run(RunError::Bind(BindError::Value { .. }))));
}

#[test]
fn test_action_error_passes_through() {
    let err = command_bind_core::run::<Git>(&args(&["git", "add", "x"]), ContextMap::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "no journal");
}

#[derive(Debug, Default)]
struct Shell;

impl Schema for Shell {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .command::<Base64>("Base64", "")
            .command::<Grep>("Grep", "");
    }
}

#[derive(Debug, Default)]
struct Base64 {
    decode: bool,
    content: String,
}

impl Base64 {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
        if self.content.is_empty() {
            return Err(RunError::usage_with("missing content"));
        }
        record(inv, format!("base64 decode={} content={}", self.decode, self.content))
    }
}

impl Schema for Base64 {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Decode", r#"d desc:"decode string""#, |s| &mut s.decode)
            .option("Content", "[0]", |s| &mut s.content);
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::run)
    }
}

#[derive(Debug, Default)]
struct Grep {
    patterns: Vec<String>,
    files: Vec<String>,
}

impl Grep {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<(), RunError> {
        record(inv, format!("grep patterns={:?} files={:?}", self.patterns, self.files))
    }
}

impl Schema for Grep {
    fn fields(fields: &mut Fields<Self>) {
        fields
            .option("Patterns", r#"e arg:"pattern""#, |s| &mut s.patterns)
            .option("Files", "[]", |s| &mut s.files);
    }

    fn action() -> Option<Action<Self>> {
        Some(Self::run)
    }
}

#[test]
fn test_action_requests_usage_with_message() {
    let (result, lines) = run_with::<Shell>(&["shell", "base64", "-d"]);

    assert_eq!(
        usage_text(result),
        "missing content\n\
         \n\
         usage: shell base64 [option] [--] <content>\n\
         \n\
         options:\n    \
         -d                  decode string\n    \
         -h                  show help\n"
    );
    assert!(lines.is_empty());

    let (result, lines) = run_with::<Shell>(&["shell", "base64", "aGk="]);
    result.unwrap();
    assert_eq!(lines, ["base64 decode=false content=aGk="]);
}

#[test]
fn test_repeated_flag_accumulates() {
    let (result, lines) = run_with::<Shell>(&["shell", "grep", "-e", "foo", "-e", "bar", "a.txt"]);
    result.unwrap();
    assert_eq!(lines, ["grep patterns=[\"foo\", \"bar\"] files=[\"a.txt\"]"]);
}

// ---------------------------------------------------------------------------
// Usage text
// ---------------------------------------------------------------------------

#[test]
fn test_leaf_usage_with_ancestor_options() {
    let (result, _) = run(&["git", "clone", "-h"]);

    assert_eq!(
        usage_text(result),
        "usage: git [git option] clone [option] [--] <repo> [<dir>]\n\
         \n\
         options:\n    \
         -depth <n>          history depth\n    \
         -h                  show help\n\
         \n\
         git options:\n    \
         -v                  be verbose\n    \
         -c <key=value>      set config entry\n"
    );
}

#[test]
fn test_root_without_action_shows_commands() {
    let (result, _) = run(&["git"]);

    assert_eq!(
        usage_text(result),
        "usage: git [option] <command>\n\
         \n\
         options:\n    \
         -v                  be verbose\n    \
         -c <key=value>      set config entry\n\
         \n\
         commands:\n    \
         clone               clone a repository\n    \
         init                create an empty repository\n    \
         add\n    \
         help                show help\n"
    );
}

#[test]
fn test_help_command_prints_root_usage() {
    let (result, lines) = run(&["git", "help"]);
    let err = result.unwrap_err();

    assert!(matches!(err, Error::Run(RunError::Message(_))));
    assert!(err.to_string().starts_with("usage: git [option] <command>\n"));
    assert!(lines.is_empty());
}

#[test]
fn test_custom_usage_columns() {
    let config = BindConfig {
        usage: UsageConfig {
            indent: 2,
            option_width: 12,
            command_width: 8,
        },
        ..BindConfig::default()
    };
    let set = CommandSet::compile_with::<Git>("git", TypeRegistry::new(), config).unwrap();
    let usage = set.usage();

    assert!(usage.contains("\n  -v          be verbose\n"));
    assert!(usage.contains("\n  -c <key=value>\n              set config entry\n"));
    assert!(usage.contains("\n  clone   clone a repository\n"));
}

// ---------------------------------------------------------------------------
// Command sets
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Checkout {
    branch: String,
}

impl Schema for Checkout {
    fn fields(fields: &mut Fields<Self>) {
        fields.option("Branch", "[0] lambda:branches", |s| &mut s.branch);
    }
}

#[test]
fn test_completion_over_attached_commands() {
    let mut set = CommandSet::compile::<Git>("git").unwrap();
    let root = set.tree().root().id();
    set.add_command::<Checkout>(root, "checkout").unwrap();
    set.lambda("branches", || vec!["main".to_string(), "develop".to_string()]);

    let completer = set.completer();
    assert_eq!(completer.candidates(&[""]), ["clone", "init", "add", "help", "checkout"]);
    assert_eq!(completer.complete(&["c"]), ["clone", "checkout"]);
    assert_eq!(completer.complete(&["checkout", "d"]), ["develop"]);
    assert!(completer.candidates(&["clone", ""]).is_empty());
    assert!(completer.candidates(&["push", ""]).is_empty());
}

#[test]
fn test_set_action_overrides_compiled_action() {
    let mut set = CommandSet::compile::<Git>("git").unwrap();
    let init = set.command(&["init"]).unwrap();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    set.set_action(init, move |init: &mut Init, _: &Invocation<'_>| {
        assert!(init.bare);
        *counter.borrow_mut() += 1;
        Ok(())
    })
    .unwrap();

    set.run(&args(&["init", "-bare"])).unwrap();
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_bind_entry_point() {
    let git: Git = command_bind_core::bind(&args(&["git", "-v", "-c", "k=v", "clone"])).unwrap();

    assert!(git.verbose);
    assert_eq!(git.config.get("k").map(String::as_str), Some("v"));
}

#[test]
fn test_compilation_is_deterministic() {
    let first = CommandSet::compile::<Git>("git").unwrap();
    let second = CommandSet::compile::<Git>("git").unwrap();

    let outline = first.tree().outline().unwrap();
    assert_eq!(outline, second.tree().outline().unwrap());

    let clone = outline.find(&["clone"]).unwrap();
    let names: Vec<_> = clone.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["repo", "dir", "depth", "h"]);

    let json = outline.to_json().unwrap();
    assert_eq!(command_bind_core::CommandOutline::from_json(&json).unwrap(), outline);
}
