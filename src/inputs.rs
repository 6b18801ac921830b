//! Resolving command-line inputs into an ordered list of files.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn is_glob_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Expands one explicit input. Plain paths are kept even when missing so the
/// read failure is reported against the file later.
fn expand_input(input: &str) -> Result<Vec<PathBuf>> {
    if !is_glob_pattern(input) {
        return Ok(vec![PathBuf::from(input)]);
    }
    let paths = glob::glob(input).with_context(|| format!("Invalid glob pattern: {input}"))?;
    Ok(matching_files(paths))
}

/// Regular files among glob matches. Entries that cannot be read are logged
/// and left out.
fn matching_files(paths: glob::Paths) -> Vec<PathBuf> {
    paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable path {}: {}", e.path().display(), e.error());
                None
            }
        })
        .filter(|path| path.is_file())
        .collect()
}

/// Files under `dir` matching `pattern`, sorted by path.
pub fn scan_directory(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let full = if recursive {
        format!("{base}/**/{pattern}")
    } else {
        format!("{base}/{pattern}")
    };

    let paths = glob::glob(&full).with_context(|| format!("Invalid file pattern: {pattern}"))?;
    let mut matches = matching_files(paths);
    matches.sort();
    Ok(matches)
}

/// Drops `.` components and redundant separators so the same file spelled two
/// ways is recognised as a duplicate.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Explicit inputs (in argument order) followed by directory matches, without
/// duplicates. The first spelling of a duplicate wins.
pub fn collect_inputs(
    inputs: &[String],
    dir: Option<&Path>,
    pattern: &str,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        files.extend(expand_input(input)?);
    }
    if let Some(dir) = dir {
        files.extend(scan_directory(dir, pattern, recursive)?);
    }

    let mut seen = HashSet::new();
    let unique: Vec<PathBuf> = files
        .into_iter()
        .map(|p| normalize(&p))
        .filter(|p| seen.insert(p.clone()))
        .collect();
    log::debug!("Resolved {} input file(s)", unique.len());
    Ok(unique)
}

pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

pub fn is_xml_entry(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}
