mod log;
mod test_runner;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;

use tagscript::Template;
use tagscript::node::Node;
use tagscript::parser::ParseWarning;
use tagscript_engine::{
    BUILTIN_NAMES, Channel, Interpreter, Limits, Member, Response, Seed, SeedFile,
};

const SUBCOMMANDS: &[&str] = &["run", "check", "blocks", "test", "help"];

#[derive(Parser)]
#[command(name = "tagscript", version, about = "TagScript template interpreter")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Limits file (TOML); missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show engine debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a tag and print its body
    Run(RunArgs),

    /// Parse a tag and report warnings and unknown blocks
    Check(CheckArgs),

    /// List registered blocks and their aliases
    Blocks,

    /// Run .test.md tag test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Tag source file
    file: String,

    /// Seed file (TOML) with user, target, channel, server and args
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Invocation arguments, replacing the seed's `args`
    #[arg(short, long)]
    args: Option<String>,

    /// Print the whole response as JSON
    #[arg(long)]
    json: bool,

    /// Print only the body: no warnings, no action summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Tag source file
    file: String,

    /// Dump the parsed node tree
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `tagscript tag.txt` works like `tagscript run tag.txt`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        let pos = pos + 1;
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    log::install_tracing(cli.verbose, cli.no_color);

    let limits = match &cli.config {
        Some(path) => Limits::load(path).unwrap_or_else(|e| fail(e)),
        None => Limits::default(),
    };
    debug!(?limits, "limits loaded");

    match cli.command {
        Command::Run(run_args) => do_run(run_args, limits, cli.no_color),
        Command::Check(check_args) => do_check(check_args, limits, cli.no_color),
        Command::Blocks => do_blocks(),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code =
                test_runner::run_tests(path, &limits, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", error);
    process::exit(1);
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// The seed used when none is given: a single user in a guild-less channel.
pub(crate) fn default_seed_file() -> SeedFile {
    SeedFile {
        user: Some(Member::new(1, "tester")),
        channel: Some(Channel::new(2, "terminal")),
        ..SeedFile::default()
    }
}

/// Read a tag file and parse it into `files` with the interpreter's limits.
fn load_template(
    file: &str,
    interpreter: &Interpreter,
    files: &mut SimpleFiles<String, String>,
) -> Template {
    let source = std::fs::read_to_string(file)
        .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", file, e)));
    let file_id = files.add(file.to_string(), source.clone());
    tagscript::parser::Parser::new(source, file_id)
        .with_max_depth(interpreter.limits().max_depth)
        .parse()
}

fn emit_warnings(
    writer: &StandardStream,
    files: &SimpleFiles<String, String>,
    warnings: &[ParseWarning],
) {
    let config = term::Config::default();
    for warning in warnings {
        let diagnostic = warning.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn do_run(args: RunArgs, limits: Limits, no_color: bool) {
    let interpreter = Interpreter::new(limits);
    let mut files = SimpleFiles::new();
    let template = load_template(&args.file, &interpreter, &mut files);

    let mut seed = match &args.seed {
        Some(path) => Seed::load(path).unwrap_or_else(|e| fail(e)),
        None => default_seed_file().into_seed(),
    };
    if let Some(invocation_args) = args.args {
        seed.insert("args", invocation_args);
    }

    if !args.quiet {
        let writer = StandardStream::stderr(color_choice(no_color));
        emit_warnings(&writer, &files, &template.warnings);
    }

    let response = interpreter.process_template(&template, &seed);

    if args.json {
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
        return;
    }

    if let Some(body) = &response.body {
        println!("{}", body);
    }
    if !args.quiet {
        print_summary(&response);
    }
}

/// Everything besides the body, on stderr.
fn print_summary(response: &Response) {
    for (i, embed) in response.embeds.iter().enumerate() {
        let title = embed.title.as_deref().unwrap_or("(untitled)");
        eprintln!("embed[{}]: {} ({} field(s))", i, title, embed.fields.len());
    }
    let keys = response.actions.keys();
    if !keys.is_empty() {
        eprintln!("actions: {}", keys.join(", "));
    }
    if let Some(trace) = &response.debug {
        for (name, value) in trace {
            eprintln!("debug: {} = {:?}", name, value);
        }
    }
    if response.truncated {
        eprintln!("warning: evaluation stopped at a resource limit; output is partial");
    }
}

fn do_check(args: CheckArgs, limits: Limits, no_color: bool) {
    let interpreter = Interpreter::new(limits);
    let mut files = SimpleFiles::new();
    let template = load_template(&args.file, &interpreter, &mut files);

    let writer = StandardStream::stderr(color_choice(no_color));
    emit_warnings(&writer, &files, &template.warnings);

    if args.ast {
        println!("{:#?}", template.nodes);
    }

    let unknown = unknown_names(&template, &interpreter);
    for name in &unknown {
        eprintln!("note: '{}' is neither a block nor a known variable; it will stay literal", name);
    }
    eprintln!(
        "ok: {} parsed with {} warning(s), {} unknown name(s)",
        args.file,
        template.warnings.len(),
        unknown.len()
    );
}

/// Declarations that are not blocks, default seed names, or assigned by a
/// `var` block somewhere in the template.
fn unknown_names(template: &Template, interpreter: &Interpreter) -> BTreeSet<String> {
    let registry = interpreter.registry();
    let mut known: BTreeSet<String> = BUILTIN_NAMES.iter().map(|name| name.to_string()).collect();

    let assign_aliases = registry.get("var").map(|spec| spec.names).unwrap_or_default();
    for block in template.blocks() {
        if !block.is_named(assign_aliases) {
            continue;
        }
        let Some(parameter) = &block.parameter else { continue };
        let name: String = parameter
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.text.as_str()),
                Node::Block(_) => None,
            })
            .collect();
        known.insert(name.trim().to_lowercase());
    }

    template
        .blocks()
        .into_iter()
        .filter(|block| registry.find(block).is_none())
        .map(|block| block.declaration.clone())
        .filter(|name| {
            let root = name.split('.').next().unwrap_or(name);
            !known.contains(root)
        })
        .collect()
}

fn do_blocks() {
    let registry = tagscript_engine::BlockRegistry::standard();
    for spec in registry.iter() {
        let aliases = spec.names.get(1..).unwrap_or_default();
        if aliases.is_empty() {
            println!("{}", spec.name());
        } else {
            println!("{:<10} aliases: {}", spec.name(), aliases.join(", "));
        }
    }
}
