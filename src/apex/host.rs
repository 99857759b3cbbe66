// src/apex/host.rs

//! Host APEX provider backed by the nested payload zip

use super::{ApexProvider, DirListing, EntryKind, FsEntry, HOST_PAYLOAD, Payload, split_path};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Host provider: every directory is indexed up front from the payload zip
#[derive(Debug)]
pub struct HostProvider {
    index: BTreeMap<String, DirListing>,
    empty: DirListing,
    _payload: Payload,
}

impl HostProvider {
    /// Extract the zip payload of `apex` into `scratch` and index it
    pub fn open(apex: &Path, scratch: &Path) -> Result<Self> {
        let payload = Payload::extract(apex, HOST_PAYLOAD, scratch)?;
        let index = index_payload(payload.path()).map_err(|e| Error::BadArchive {
            path: apex.to_path_buf(),
            reason: format!("{}: {}", HOST_PAYLOAD, e),
        })?;
        debug!("Indexed {} directories from {}", index.len(), HOST_PAYLOAD);

        Ok(Self {
            index,
            empty: DirListing::new(),
            _payload: payload,
        })
    }
}

impl ApexProvider for HostProvider {
    fn read_dir(&mut self, dir: &str) -> Result<&DirListing> {
        Ok(self.index.get(dir).unwrap_or(&self.empty))
    }

    fn cached_dirs(&self) -> &BTreeMap<String, DirListing> {
        &self.index
    }
}

/// Build the directory index of a payload zip
///
/// Only central directory metadata is read, so entries compressed with a
/// method this build cannot decode are still indexed.
fn index_payload(path: &Path) -> zip::result::ZipResult<BTreeMap<String, DirListing>> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let mut index: BTreeMap<String, DirListing> = BTreeMap::new();

    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        let leaf = mode_entry(file.unix_mode(), file.is_dir());
        insert_path(&mut index, file.name(), leaf);
    }

    Ok(index)
}

/// Kind and executable flag of an archived entry from its Unix mode
///
/// The mode lives in the upper half of the external attributes word.
fn mode_entry(unix_mode: Option<u32>, stored_dir: bool) -> (EntryKind, bool) {
    let bits = unix_mode.unwrap_or(0) & 0xFFFF;
    let octal = |index: u32| (bits >> (index * 3)) & 0o7;

    let kind = match octal(4) {
        _ if stored_dir => EntryKind::Directory,
        4 => EntryKind::Directory,
        2 => EntryKind::Symlink,
        _ => EntryKind::File,
    };
    // Only the owner execute bit is recorded reliably by host builds
    let executable = octal(2) & 1 == 1;
    (kind, executable)
}

/// Record `path` and synthesize every missing parent directory
///
/// The first entry recorded for a name wins, so an explicitly stored
/// directory seen after one of its children keeps the synthesized entry.
fn insert_path(index: &mut BTreeMap<String, DirListing>, path: &str, leaf: (EntryKind, bool)) {
    let mut path = path.trim_end_matches('/');
    let mut entry = Some(leaf);

    while !path.is_empty() {
        let (dir, base) = split_path(path);
        let (kind, executable) = entry.take().unwrap_or((EntryKind::Directory, false));
        index
            .entry(dir.to_string())
            .or_default()
            .entry(base.to_string())
            .or_insert_with(|| FsEntry::new(base, kind, executable));
        path = dir;
    }
}
