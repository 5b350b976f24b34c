pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShelfError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub page: PageSection,
    #[serde(default)]
    pub dirs: DirsSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub generate: GenerateSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSection {
    pub title: String,
    #[serde(default = "defaults::heading")]
    pub heading: String,
}

/// Directories the page is built from, relative to the project root. Their
/// relative form doubles as the URL prefix of the download links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirsSection {
    #[serde(default = "defaults::releases_dir")]
    pub releases_dir: String,
    #[serde(default = "defaults::generated_dir")]
    pub generated_dir: String,
    #[serde(default = "defaults::template_dir")]
    pub template_dir: String,
}

impl Default for DirsSection {
    fn default() -> Self {
        Self {
            releases_dir: defaults::releases_dir(),
            generated_dir: defaults::generated_dir(),
            template_dir: defaults::template_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: defaults::port(),
        }
    }
}

/// The external generate action. The server only invokes the hook; whatever
/// the command does to the generated directory shows up on the next render.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerateSection {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Resolved absolute paths for the project directories.
#[derive(Clone)]
pub struct ResolvedDirs {
    pub root: PathBuf,
    pub releases: PathBuf,
    pub generated: PathBuf,
    pub templates: PathBuf,
}

impl ShelfConfig {
    /// Load config from a `tarshelf.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShelfError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        let config: ShelfConfig =
            toml::from_str(&contents).map_err(|e| ShelfError::ConfigInvalid {
                message: e.to_string(),
            })?;
        Ok(config)
    }

    /// Resolve all directory paths relative to the project root.
    pub fn resolve_dirs(&self, project_root: &Path) -> ResolvedDirs {
        ResolvedDirs {
            root: project_root.to_path_buf(),
            releases: project_root.join(&self.dirs.releases_dir),
            generated: project_root.join(&self.dirs.generated_dir),
            templates: project_root.join(&self.dirs.template_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: ShelfConfig = toml::from_str("[page]\ntitle = \"osgEphemeris tarballs\"\n")
            .expect("minimal config should parse");
        assert_eq!(config.page.title, "osgEphemeris tarballs");
        assert_eq!(config.page.heading, "Generated Tarballs");
        assert_eq!(config.dirs.releases_dir, "Download/Releases");
        assert_eq!(config.dirs.generated_dir, "Download/Generated");
        assert_eq!(config.server.port, 8080);
        assert!(config.generate.command.is_none());
    }

    #[test]
    fn test_resolve_dirs_joins_root() {
        let config: ShelfConfig = toml::from_str("[page]\ntitle = \"t\"\n").unwrap();
        let dirs = config.resolve_dirs(Path::new("/srv/site"));
        assert_eq!(dirs.generated, Path::new("/srv/site/Download/Generated"));
        assert_eq!(dirs.releases, Path::new("/srv/site/Download/Releases"));
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let err = ShelfConfig::load(Path::new("/nonexistent/tarshelf.toml")).unwrap_err();
        assert!(matches!(err, ShelfError::ConfigNotFound { .. }));
    }
}
