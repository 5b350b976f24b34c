use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tarshelf::cli::{Cli, Command};
use tarshelf::output::OutputFormat;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Change working directory if --dir is specified
    if let Some(ref dir) = cli.dir {
        std::env::set_current_dir(dir)?;
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match &cli.command {
        Command::Init(args) => tarshelf::cli::init::run(args)?,
        Command::List(args) => tarshelf::cli::list::run(args, format)?,
        Command::Serve(args) => tarshelf::cli::serve::run(args)?,
    }

    Ok(())
}
