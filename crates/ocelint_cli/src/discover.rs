//! File discovery.
//!
//! Each argument is taken as a file, a directory (walked for `.py`
//! files), or a glob pattern matched against the working directory.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSetBuilder};
use miette::{IntoDiagnostic, Result};
use walkdir::WalkDir;

pub fn discover_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            collect_python_files(path, &mut files);
        } else {
            glob_files(pattern, &mut files)?;
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_python_files(dir: &Path, files: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "py")
        {
            files.push(entry.into_path());
        }
    }
}

fn glob_files(pattern: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let glob = Glob::new(pattern).into_diagnostic()?;
    let set = GlobSetBuilder::new().add(glob).build().into_diagnostic()?;
    for entry in WalkDir::new(".").into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().strip_prefix(".").unwrap_or(entry.path());
        if set.is_match(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(())
}
