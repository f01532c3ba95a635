mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_from(wild::args_os());
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Create(args) => commands::create(args, verbose),
        Commands::Extract(args) => commands::extract(args, verbose),
        Commands::List(args) => commands::list(args, verbose),
        Commands::Info(args) => commands::info(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:?}", anyhow::Error::new(e));
        std::process::exit(1);
    }
}
