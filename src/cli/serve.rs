use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::config::ShelfConfig;
use crate::server;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to serve on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Fall back to the next free port if the requested one is taken
    #[arg(long)]
    pub auto_port: bool,
}

pub fn run(args: &ServeArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = ShelfConfig::load(&PathBuf::from("tarshelf.toml"))?;
    let dirs = config.resolve_dirs(&cwd);

    let port = args.port.unwrap_or(config.server.port);
    // Keep the handle alive; dropping it stops the serve loop.
    let _handle = server::start(&config, &dirs, port, args.auto_port)?;

    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
