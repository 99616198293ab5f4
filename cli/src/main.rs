mod config;
mod host;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use blocks::{Registry, RunReport, Snapshot, Workspace, palette};
use interpreter::DiagnosticError;

use crate::config::Config;
use crate::host::TerminalHost;

/// Name the generated program is reported under in diagnostics.
const GENERATED_FILE_NAME: &str = "<generated>";

#[derive(Parser)]
#[command(name = "blocks", version, about = "Block programming editor core")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to ./blocks.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a saved workspace
    Run(RunArgs),

    /// Print the program a saved workspace compiles to
    Compile(CompileArgs),

    /// List the available blocks
    Palette,

    /// Encode a saved workspace as a share token, or decode one
    Share(ShareArgs),

    /// Run .test.blocks test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Workspace snapshot (JSON) to execute
    file: PathBuf,

    /// Load only, don't execute (exit 0 if the snapshot is valid)
    #[arg(long)]
    check: bool,

    /// Print the block tree instead of running it
    #[arg(long)]
    tree: bool,

    /// Suppress printed output (dialogs, warnings and errors still show)
    #[arg(short, long)]
    quiet: bool,

    /// Seed for sprite placement
    #[arg(long)]
    seed: Option<u64>,

    /// Ask confirm/prompt questions on the terminal
    #[arg(short, long)]
    interactive: bool,

    /// Also print the executable program text before running
    #[arg(long)]
    show_code: bool,
}

#[derive(clap::Args)]
struct CompileArgs {
    /// Workspace snapshot (JSON)
    file: PathBuf,

    /// Print the executable text instead of the display text
    #[arg(long)]
    executable: bool,
}

#[derive(clap::Args)]
struct ShareArgs {
    /// Workspace snapshot (JSON) to encode
    #[arg(required_unless_present = "decode")]
    file: Option<PathBuf>,

    /// Decode this token and print the snapshot JSON
    #[arg(long, conflicts_with = "file")]
    decode: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.blocks file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };
    init_logging(config.log.as_deref());
    tracing::debug!(
        seed = ?config.seed,
        interactive = config.interactive,
        canvas = ?config.canvas.size(),
        "configuration loaded"
    );

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Run(args) => do_run(args, &config, color_choice),
        Command::Compile(args) => {
            let workspace = load_workspace(&args.file);
            let program = workspace.compile();
            if args.executable {
                println!("{}", program.executable);
            } else {
                println!("{}", program.display);
            }
        }
        Command::Palette => {
            for (block_type, category, label) in palette(Registry::standard()) {
                println!("{:<12} {:<8} {}", block_type, category, label);
            }
        }
        Command::Share(args) => do_share(args),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return;
            }
            let exit_code = test_runner::run_tests(&args.path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

/// `RUST_LOG` wins, then the config file's directive, then warnings only.
fn init_logging(config_directive: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_directive.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_workspace(path: &Path) -> Workspace {
    let json = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    };
    let mut workspace = Workspace::new();
    if let Err(e) = workspace.load_json(&json) {
        eprintln!("error: cannot load '{}': {}", path.display(), e);
        process::exit(1);
    }
    workspace
}

fn do_run(args: RunArgs, config: &Config, color_choice: ColorChoice) {
    let workspace = load_workspace(&args.file);

    if args.check {
        eprintln!(
            "ok: {} loaded ({} blocks)",
            args.file.display(),
            workspace.block_count()
        );
        for asset in workspace.assets.iter() {
            eprintln!(
                "  asset {} ({}, {} bytes)",
                asset.name,
                asset.media_type(),
                asset.data.len()
            );
        }
        return;
    }

    if args.tree {
        print!("{}", workspace.outline());
        return;
    }

    if args.show_code {
        eprintln!("{}", workspace.compile().executable);
    }

    let mut host = TerminalHost::stdio(config.canvas.size());
    host.quiet = args.quiet;
    host.interactive = args.interactive || config.interactive;
    let report = workspace.run(&mut host, args.seed.or(config.seed));

    // The display text is shown whether or not the run succeeded.
    eprintln!("--- program ---");
    eprintln!("{}", report.program.display);

    let failed = report.error.is_some();
    emit_report(&report, color_choice);
    if failed {
        process::exit(1);
    }
}

fn do_share(args: ShareArgs) {
    if let Some(token) = args.decode {
        match Snapshot::from_share_token(&token).and_then(|s| s.to_json()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let Some(file) = args.file else {
        eprintln!("error: no snapshot file given");
        process::exit(2);
    };
    match load_workspace(&file).share_token() {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// Render the run's warnings and error against the generated program text.
fn emit_report(report: &RunReport, color_choice: ColorChoice) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(
        GENERATED_FILE_NAME.to_string(),
        report.program.executable.clone(),
    );

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    for warning in &report.warnings {
        emit_diagnostic_error(&writer, &config, &files, file_id, warning);
    }
    if let Some(error) = &report.error {
        emit_diagnostic_error(&writer, &config, &files, file_id, error);
    }
    if report.guard_tripped {
        eprintln!(
            "note: loops stopped early after {} iterations",
            report.loop_iterations
        );
    }
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    error: &DiagnosticError,
) {
    if let Some(span) = &error.span {
        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let diagnostic = Diagnostic::new(severity)
            .with_message(error.to_string())
            .with_labels(vec![Label::primary(file_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    } else {
        let prefix = if error.is_warning {
            "warning"
        } else {
            "runtime error"
        };
        eprintln!("{}: {}", prefix, error);
    }
}
