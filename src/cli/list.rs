use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::config::ShelfConfig;
use crate::manifest::{self, TarballRecord};
use crate::output::{self, CommandOutput, OutputFormat};

#[derive(Args)]
pub struct ListArgs {}

#[derive(Debug, Serialize)]
pub struct ManifestOutput {
    pub directory: String,
    pub tarballs: Vec<TarballRecord>,
}

impl CommandOutput for ManifestOutput {
    fn human_display(&self) -> String {
        if self.tarballs.is_empty() {
            return format!("No generated tarballs in {}", self.directory);
        }
        let mut lines = Vec::with_capacity(self.tarballs.len());
        for t in &self.tarballs {
            let date = t.snapshot.date_label();
            let when = if date.is_empty() {
                String::new()
            } else {
                format!("{date} {}", t.snapshot.time_label())
            };
            lines.push(format!("{:<48} {:>6}K  {when}", t.filename, t.size_kb));
        }
        lines.join("\n")
    }
}

pub fn run(args: &ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let _ = args;
    let cwd = std::env::current_dir()?;
    let config = ShelfConfig::load(&PathBuf::from("tarshelf.toml"))?;
    let dirs = config.resolve_dirs(&cwd);

    // An unreadable directory is an empty page, not a failure.
    let tarballs = manifest::build_manifest(&dirs.generated).unwrap_or_else(|e| {
        tracing::warn!("{e}");
        Vec::new()
    });

    let out = ManifestOutput {
        directory: config.dirs.generated_dir.clone(),
        tarballs,
    };
    output::print_output(&out, format);

    Ok(())
}
