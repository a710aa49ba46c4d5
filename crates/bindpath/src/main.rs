//! bindpath - dependency-path rewriter for render functions
//!
//! CLI driver for rewriting, checking and timing render-function sources.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// Dependency-path rewriter for render functions
#[derive(Parser, Debug)]
#[command(name = "bindpath")]
#[command(author, version, about = "Wrap free identifier chains in dependency-tracking calls")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    /// One `file:line:col: severity: message` line per diagnostic
    Short,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite one file (or standard input)
    Transform(commands::transform::TransformArgs),

    /// Rewrite every script under a path and report diagnostics
    Check(commands::check::CheckArgs),

    /// Time repeated rewrites of one file
    Bench(commands::bench::BenchArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// `RUST_LOG` wins over the `-v` count when it is set.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Transform(args) => {
            commands::transform::run(args, cli.format, use_color, cli.quiet)
        }
        Commands::Check(args) => commands::check::run(args, cli.format, use_color, cli.quiet),
        Commands::Bench(args) => commands::bench::run(args, cli.format),
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}
