use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Cannot read directory {path}: {source}")]
    DirectoryAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Generate error: {0}")]
    Generate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShelfError>;
