pub mod init;
pub mod list;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tarshelf",
    about = "Self-hosted download page for release and snapshot tarballs",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory
    #[arg(short, long, global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new download page project
    Init(init::InitArgs),

    /// Print the manifest of generated tarballs
    List(list::ListArgs),

    /// Serve the download page
    Serve(serve::ServeArgs),
}
