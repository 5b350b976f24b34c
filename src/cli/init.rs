use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::config::{PageSection, ShelfConfig};
use crate::output::human;

#[derive(Args)]
pub struct InitArgs {
    /// Name of the project directory to create
    pub name: Option<String>,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let name = match &args.name {
        Some(n) => n.clone(),
        None => dialoguer::Input::<String>::new()
            .with_prompt("Project name (directory)")
            .interact_text()?,
    };

    let title = match &args.title {
        Some(t) => t.clone(),
        None => dialoguer::Input::<String>::new()
            .with_prompt("Page title")
            .default(format!("{name} tarballs"))
            .interact_text()?,
    };

    let root = PathBuf::from(&name);
    if root.exists() {
        anyhow::bail!("directory '{}' already exists", name);
    }

    let config = ShelfConfig {
        page: PageSection {
            title,
            heading: format!("{name} Generated Tarballs"),
        },
        dirs: Default::default(),
        server: Default::default(),
        generate: Default::default(),
    };

    fs::create_dir_all(root.join(&config.dirs.releases_dir))?;
    fs::create_dir_all(root.join(&config.dirs.generated_dir))?;
    fs::create_dir_all(root.join(&config.dirs.template_dir))?;

    let toml_str = toml::to_string_pretty(&config)?;
    fs::write(root.join("tarshelf.toml"), toml_str)?;

    human::success(&format!("Created project '{name}'"));
    human::info(&format!(
        "Drop archives into {}/{} and {}/{}, then run `tarshelf serve`",
        name, config.dirs.releases_dir, name, config.dirs.generated_dir
    ));

    Ok(())
}
