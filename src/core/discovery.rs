//! Recursive discovery of `.xml` files under the scan root.
//!
//! Hidden files and directories are included. Symlinks are skipped unless
//! `follow_links` is set; when followed, each canonical directory is walked
//! once so link cycles terminate.

use crate::core::error::LintError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const XML_EXTENSION: &str = "xml";

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    pub follow_links: bool,
    pub exclude: Vec<String>,
}

/// A discovered file: where to read it, and how to name it in reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XmlFile {
    pub relative: PathBuf,
    pub absolute: PathBuf,
}

pub fn is_xml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(XML_EXTENSION)
}

/// All `.xml` files under `root`, sorted by relative path.
pub fn collect_xml_files(
    root: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<XmlFile>, LintError> {
    if !root.is_dir() {
        return Err(LintError::PathError(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut visited = HashSet::new();
    if options.follow_links {
        visited.insert(fs::canonicalize(root)?);
    }

    let mut out = Vec::new();
    recurse(root, Path::new(""), options, &mut visited, &mut out)?;
    out.sort();
    Ok(out)
}

fn recurse(
    dir: &Path,
    relative: &Path,
    options: &DiscoveryOptions,
    visited: &mut HashSet<PathBuf>,
    out: &mut Vec<XmlFile>,
) -> Result<(), LintError> {
    for entry in fs::read_dir(dir).map_err(LintError::IoError)? {
        let entry = entry.map_err(LintError::IoError)?;
        let path = entry.path();
        let name = entry.file_name();
        let rel = relative.join(&name);
        let file_type = entry.file_type()?;

        let (is_dir, is_file) = if file_type.is_symlink() {
            if !options.follow_links {
                continue;
            }
            // Dangling links are skipped.
            match fs::metadata(&path) {
                Ok(meta) => (meta.is_dir(), meta.is_file()),
                Err(_) => continue,
            }
        } else {
            (file_type.is_dir(), file_type.is_file())
        };

        if is_dir {
            if options.exclude.iter().any(|x| name.to_str() == Some(x.as_str())) {
                continue;
            }
            if options.follow_links && !visited.insert(fs::canonicalize(&path)?) {
                continue;
            }
            recurse(&path, &rel, options, visited, out)?;
        } else if is_file && is_xml(&path) {
            out.push(XmlFile {
                relative: rel,
                absolute: path,
            });
        }
    }
    Ok(())
}
