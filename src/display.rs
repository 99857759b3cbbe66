// src/display.rs

//! Diagnostic printers: flat listing and directory tree of an APEX

use crate::apex::{ApexProvider, FsEntry, join_path};
use crate::error::Result;
use std::io::Write;

/// Children of `dir` without the `.` and `..` entries
fn children(provider: &mut dyn ApexProvider, dir: &str) -> Result<Vec<FsEntry>> {
    Ok(provider
        .read_dir(dir)?
        .values()
        .filter(|entry| entry.name != "." && entry.name != "..")
        .cloned()
        .collect())
}

/// Print every path in the package, depth first, one per line
pub fn print_list(provider: &mut dyn ApexProvider, out: &mut dyn Write) -> Result<()> {
    list_dir(provider, "", out)
}

fn list_dir(provider: &mut dyn ApexProvider, dir: &str, out: &mut dyn Write) -> Result<()> {
    for entry in children(provider, dir)? {
        let path = join_path(dir, &entry.name);
        writeln!(out, "{}", path)?;
        if entry.is_dir() {
            list_dir(provider, &path, out)?;
        }
    }
    Ok(())
}

/// Print `title` followed by a box-drawing tree of the package
pub fn print_tree(provider: &mut dyn ApexProvider, title: &str, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", title)?;
    let mut has_next = Vec::new();
    tree_dir(provider, "", &mut has_next, out)
}

fn tree_dir(
    provider: &mut dyn ApexProvider,
    dir: &str,
    has_next: &mut Vec<bool>,
    out: &mut dyn Write,
) -> Result<()> {
    let entries = children(provider, dir)?;
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let indent: String = has_next
            .iter()
            .map(|&more| if more { "│   " } else { "    " })
            .collect();
        let branch = if last { "└── " } else { "├── " };
        writeln!(out, "{}{}{}", indent, branch, entry.name)?;

        if entry.is_dir() {
            has_next.push(!last);
            tree_dir(provider, &join_path(dir, &entry.name), has_next, out)?;
            has_next.pop();
        }
    }
    Ok(())
}
