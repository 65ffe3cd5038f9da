mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{branch, export, reassign, scenarios, switch, validate};
use tracing_subscriber::EnvFilter;

/// Log to stderr at a level following `-v`, unless `DISTRICTOR_LOG` is set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("DISTRICTOR_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Scenarios(args) => scenarios::run(&cli, args),
        Commands::Branch(args) => branch::run(&cli, args),
        Commands::Reassign(args) => reassign::run(&cli, args),
        Commands::Switch(args) => switch::run(&cli, args),
        Commands::Validate(args) => validate::run(&cli, args),
        Commands::Export(args) => export::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
