// src/apex/mod.rs

//! Read-only views over the payload of an APEX package
//!
//! An APEX is a zip archive whose payload is either an ext4-style filesystem
//! image (`apex_payload.img`, target builds) or a nested zip
//! (`apex_payload.zip`, host builds). Both are exposed through the
//! [`ApexProvider`] trait as a directory index keyed by package-relative
//! path, where `""` is the package root.

mod host;
mod payload;
mod target;

pub use host::HostProvider;
pub use payload::{HOST_PAYLOAD, Payload, TARGET_PAYLOAD};
pub use target::{TargetProvider, parse_debugfs_listing};

use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt;

/// Type of an entry inside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A single file, directory or symlink in the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub kind: EntryKind,
    pub executable: bool,
}

impl FsEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind, executable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            executable,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

impl fmt::Display for FsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(dir={},exec={},symlink={})",
            self.name,
            self.is_dir(),
            self.executable,
            self.is_symlink()
        )
    }
}

/// Children of one directory, ordered by name
pub type DirListing = BTreeMap<String, FsEntry>;

/// Directory-level access to an APEX payload
///
/// Implementations memoize listings: once a directory has been read, later
/// lookups in it are served from the cache for the provider's lifetime.
pub trait ApexProvider {
    /// List a package-relative directory (`""` is the root)
    fn read_dir(&mut self, dir: &str) -> Result<&DirListing>;

    /// All directories listed so far
    fn cached_dirs(&self) -> &BTreeMap<String, DirListing>;

    /// Look up a single package-relative path
    fn get(&mut self, path: &str) -> Result<Option<FsEntry>> {
        let (dir, name) = split_path(path);
        Ok(self.read_dir(dir)?.get(name).cloned())
    }
}

/// Split a package-relative path into its directory and final component
///
/// Paths without a `/` live in the root, reported as `""`.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Join a directory and a child name, treating `""` as the root
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
