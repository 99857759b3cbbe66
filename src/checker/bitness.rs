// src/checker/bitness.rs

//! Bitness policies: how 32-bit, 64-bit and multilib packages lay out
//! executables and native libraries

use crate::apex::ApexProvider;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{error, warn};

/// Layout rules that differ between 32-bit, 64-bit and multilib packages
///
/// The checker asks the policy which concrete paths stand behind a
/// bitness-neutral expectation.
pub trait Bitness: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Executables behind `bin/<name>` when `<name>` is a symlink to the
    /// preferred variant of a multilib binary
    fn symlinked_multilib_executables(&self, name: &str) -> Vec<String>;

    /// Like [`Bitness::symlinked_multilib_executables`] for binaries built
    /// 32-bit whenever possible
    fn symlinked_prefer32_executables(&self, name: &str) -> Vec<String>;

    /// Executables for a binary shipped as `<name>` (32-bit) and `<name>64`
    fn multilib_executables(&self, name: &str) -> Vec<String>;

    /// Directories that must hold every native library
    fn library_dirs(&self) -> &'static [&'static str];

    /// Directory holding a library built 64-bit whenever possible
    fn prefer64_library_dir(&self) -> &'static str;
}

/// 32-bit only package
#[derive(Debug, Clone, Copy, Default)]
pub struct Arch32;

/// 64-bit only package
#[derive(Debug, Clone, Copy, Default)]
pub struct Arch64;

/// Package shipping both 32-bit and 64-bit variants
#[derive(Debug, Clone, Copy, Default)]
pub struct Multilib;

impl Bitness for Arch32 {
    fn name(&self) -> &'static str {
        "32"
    }

    fn symlinked_multilib_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}32", name)]
    }

    fn symlinked_prefer32_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}32", name)]
    }

    fn multilib_executables(&self, name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    fn library_dirs(&self) -> &'static [&'static str] {
        &["lib"]
    }

    fn prefer64_library_dir(&self) -> &'static str {
        "lib"
    }
}

impl Bitness for Arch64 {
    fn name(&self) -> &'static str {
        "64"
    }

    fn symlinked_multilib_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}64", name)]
    }

    fn symlinked_prefer32_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}64", name)]
    }

    fn multilib_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}64", name)]
    }

    fn library_dirs(&self) -> &'static [&'static str] {
        &["lib64"]
    }

    fn prefer64_library_dir(&self) -> &'static str {
        "lib64"
    }
}

impl Bitness for Multilib {
    fn name(&self) -> &'static str {
        "multilib"
    }

    fn symlinked_multilib_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}32", name), format!("{}64", name)]
    }

    fn symlinked_prefer32_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}32", name)]
    }

    fn multilib_executables(&self, name: &str) -> Vec<String> {
        vec![format!("{}64", name), name.to_string()]
    }

    fn library_dirs(&self) -> &'static [&'static str] {
        &["lib", "lib64"]
    }

    fn prefer64_library_dir(&self) -> &'static str {
        "lib64"
    }
}

/// Bitness requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitnessChoice {
    Arch32,
    Arch64,
    Multilib,
    Auto,
}

impl BitnessChoice {
    /// Resolve to a concrete policy, probing the package for `auto`
    pub fn resolve(self, provider: &mut dyn ApexProvider) -> Result<Box<dyn Bitness>> {
        match self {
            Self::Arch32 => Ok(Box::new(Arch32)),
            Self::Arch64 => Ok(Box::new(Arch64)),
            Self::Multilib => Ok(Box::new(Multilib)),
            Self::Auto => detect(provider),
        }
    }
}

impl FromStr for BitnessChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "32" => Ok(Self::Arch32),
            "64" => Ok(Self::Arch64),
            "multilib" => Ok(Self::Multilib),
            "auto" => Ok(Self::Auto),
            _ => Err(Error::Usage(
                "--bitness needs to be one of 32|64|multilib|auto".to_string(),
            )),
        }
    }
}

impl fmt::Display for BitnessChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arch32 => write!(f, "32"),
            Self::Arch64 => write!(f, "64"),
            Self::Multilib => write!(f, "multilib"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Pick a policy from which of `lib` and `lib64` exist at the root
fn detect(provider: &mut dyn ApexProvider) -> Result<Box<dyn Bitness>> {
    warn!("--bitness=auto, trying to autodetect. This may be incorrect!");
    let has_32 = provider.get("lib")?.is_some();
    let has_64 = provider.get("lib64")?.is_some();

    match (has_32, has_64) {
        (true, true) => {
            warn!("  Detected multilib");
            Ok(Box::new(Multilib))
        }
        (true, false) => {
            warn!("  Detected 32-only");
            Ok(Box::new(Arch32))
        }
        (false, true) => {
            warn!("  Detected 64-only");
            Ok(Box::new(Arch64))
        }
        (false, false) => {
            error!("  Could not detect bitness, neither lib nor lib64 contained.");
            for (dir, listing) in provider.cached_dirs() {
                let names: Vec<&str> = listing.keys().map(String::as_str).collect();
                error!("  {:?}: {:?}", dir, names);
            }
            Err(Error::UndetectedBitness)
        }
    }
}
