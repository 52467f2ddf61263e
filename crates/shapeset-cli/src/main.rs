//! shapeset: command-line pipeline for shape-set processing.
//!
//! Tasks are written left to right and run in order against a single
//! in-memory shape set:
//!
//! ```bash
//! shapeset -v create meshes/ labels.json index-borders save out.json
//! shapeset load in.json simplify-borders save-meshes out_meshes/ save out.json
//! ```
//!
//! # Logging
//!
//! Set `RUST_LOG` to control log output (e.g. `RUST_LOG=shapeset=debug`),
//! or use `-v`/`-vv`/`-vvv` for info, debug, and trace levels.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod tasks;

/// Creates and processes shape sets.
#[derive(Parser)]
#[command(name = "shapeset")]
#[command(version, about, long_about = None)]
#[command(after_long_help = tasks::TASK_HELP)]
struct Cli {
    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pipeline tasks, executed left to right (see long --help)
    #[arg(required = true, trailing_var_arg = true)]
    tasks: Vec<String>,
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8) {
    // RUST_LOG wins; otherwise the -v flags pick the level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "shapeset=info",
            2 => "shapeset=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {}: {}", "Caused by".yellow(), cause);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let tasks = tasks::parse_tasks(&cli.tasks)?;
    tasks::run_tasks(&tasks, cli.verbose > 0)
}
