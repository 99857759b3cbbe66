// src/apex/payload.rs

//! Extraction of the payload member from the outer APEX archive

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tempfile::TempPath;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// Payload member of a target APEX (filesystem image)
pub const TARGET_PAYLOAD: &str = "apex_payload.img";

/// Payload member of a host APEX (nested zip)
pub const HOST_PAYLOAD: &str = "apex_payload.zip";

/// Payload copied out of an APEX into the scratch directory
///
/// The file is removed when this value is dropped, so whoever owns it
/// controls how long the extracted copy lives.
#[derive(Debug)]
pub struct Payload {
    path: TempPath,
}

impl Payload {
    /// Copy `member` out of `apex` into a fresh file inside `scratch`
    pub fn extract(apex: &Path, member: &'static str, scratch: &Path) -> Result<Self> {
        let bad_archive = |reason: String| Error::BadArchive {
            path: apex.to_path_buf(),
            reason,
        };

        let file = File::open(apex).map_err(|e| bad_archive(e.to_string()))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| bad_archive(e.to_string()))?;

        let mut entry = archive.by_name(member).map_err(|e| match e {
            ZipError::FileNotFound => Error::MissingPayload {
                path: apex.to_path_buf(),
                member,
            },
            other => bad_archive(other.to_string()),
        })?;

        let (stem, suffix) = member.split_once('.').unwrap_or((member, ""));
        let mut temp = tempfile::Builder::new()
            .prefix(stem)
            .suffix(&format!(".{}", suffix))
            .tempfile_in(scratch)?;

        let copied = io::copy(&mut entry, &mut temp).map_err(|e| bad_archive(e.to_string()))?;
        debug!(
            "Extracted {} ({} bytes) to {}",
            member,
            copied,
            temp.path().display()
        );

        Ok(Self {
            path: temp.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
