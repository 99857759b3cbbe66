// src/apex/target.rs

//! Target APEX provider backed by a filesystem-debug tool
//!
//! Target payloads are filesystem images. Directory contents are obtained by
//! running `debugfs -R "ls -l -p <dir>" <image>` once per directory and
//! parsing its slash-delimited output:
//!
//! ```text
//! /12/040755/0/2000/.//
//! /13/100755/0/2000/dalvikvm32/28456/
//!  |     |   |   |       |        |
//!  |     |   |   |       name     size
//!  |     |   |   gid
//!  |     |   uid
//!  |     type and permission bits
//!  inode
//! ```

use super::{ApexProvider, DirListing, EntryKind, FsEntry, Payload, TARGET_PAYLOAD};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Number of `/`-separated fields in one listing line
const LISTING_FIELDS: usize = 8;

/// Target provider: filesystem image listed through an external tool
#[derive(Debug)]
pub struct TargetProvider {
    debugfs: PathBuf,
    payload: Payload,
    cache: BTreeMap<String, DirListing>,
    invocations: usize,
}

impl TargetProvider {
    /// Extract the image payload of `apex` into `scratch`
    pub fn open(apex: &Path, scratch: &Path, debugfs: &Path) -> Result<Self> {
        let payload = Payload::extract(apex, TARGET_PAYLOAD, scratch)?;
        Ok(Self {
            debugfs: debugfs.to_path_buf(),
            payload,
            cache: BTreeMap::new(),
            invocations: 0,
        })
    }

    /// Number of times the external tool has been run
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    fn list(&mut self, dir: &str) -> Result<DirListing> {
        debug!("Listing {} with {}", dir, self.debugfs.display());
        self.invocations += 1;

        let output = Command::new(&self.debugfs)
            .arg("-R")
            .arg(format!("ls -l -p {}", dir))
            .arg(self.payload.path())
            .output()
            .map_err(|source| Error::ToolSpawn {
                tool: self.debugfs.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.debugfs.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_debugfs_listing(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

impl ApexProvider for TargetProvider {
    fn read_dir(&mut self, dir: &str) -> Result<&DirListing> {
        // The tool names the image root "."
        let key = if dir.is_empty() { "." } else { dir };
        if !self.cache.contains_key(key) {
            let listing = self.list(key)?;
            self.cache.insert(key.to_string(), listing);
        }
        Ok(&self.cache[key])
    }

    fn cached_dirs(&self) -> &BTreeMap<String, DirListing> {
        &self.cache
    }
}

/// Parse the output of `ls -l -p` into a directory listing
///
/// Lines that do not have the expected shape are logged and skipped.
pub fn parse_debugfs_listing(output: &str) -> DirListing {
    let mut listing = DirListing::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('/').collect();
        if fields.len() != LISTING_FIELDS {
            warn!("Could not break and parse line '{}'", line);
            continue;
        }

        let bits = fields[2];
        let name = fields[5];
        let Some(digits) = octal_digits(bits) else {
            warn!("Dont understand bits '{}'", bits);
            continue;
        };

        let kind = match digits[1] {
            4 => EntryKind::Directory,
            2 => EntryKind::Symlink,
            _ => EntryKind::File,
        };
        // Owner, group and other must all be executable
        let executable = digits[3..].iter().all(|d| d & 1 == 1);

        listing.insert(name.to_string(), FsEntry::new(name, kind, executable));
    }

    listing
}

fn octal_digits(bits: &str) -> Option<[u32; 6]> {
    if bits.len() != 6 {
        return None;
    }
    let mut digits = [0u32; 6];
    for (slot, ch) in digits.iter_mut().zip(bits.chars()) {
        *slot = ch.to_digit(8)?;
    }
    Some(digits)
}
