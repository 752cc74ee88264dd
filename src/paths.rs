// src/paths.rs

//! Path source: the newline-delimited list of work directories.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Read the work directories listed in `path_file`, one per line.
pub fn parse_path_file(fs: &dyn FileSystem, path_file: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs.read_to_string(path_file)?;
    let paths = parse_path_list(&contents);
    debug!(
        file = %path_file.display(),
        count = paths.len(),
        "parsed work directory paths"
    );
    Ok(paths)
}

/// Split a path list into entries, in file order.
///
/// Trailing whitespace (including `\r` from CRLF files) is stripped and blank
/// lines are skipped. Leading whitespace is kept, since it may be part of a
/// directory name.
pub fn parse_path_list(contents: &str) -> Vec<PathBuf> {
    contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}
