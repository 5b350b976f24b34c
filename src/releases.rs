//! Lists published release archives. Filenames are opaque labels here: no
//! parsing, no sizes, just a reverse lexicographic sort so that dated names
//! land newest first.

use std::fs;
use std::path::Path;

use crate::error::{Result, ShelfError};

/// Version-control droppings that can show up next to the archives.
const VCS_ENTRIES: &[&str] = &["CVS", ".git", ".svn", ".hg"];

/// Entry names of the releases directory, descending. Plain string sort, not
/// natural sort: newer releases only come first when the naming convention
/// keeps them lexicographically monotonic.
pub fn list_releases(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| ShelfError::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !VCS_ENTRIES.contains(&name.as_str()))
        .collect();

    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}
