// src/rules.rs

//! Versioned checklists for each APEX flavor
//!
//! The rosters of binaries, libraries and Java archives drift between
//! releases, so they are data rather than code. A rule set is a TOML file
//! with one table per policy:
//!
//! ```toml
//! version = 1
//!
//! [release]
//! files = ["apex_manifest.json"]
//! executables = ["dex2oat", "dexdump"]
//! symlinked_multilib_executables = ["dalvikvm"]
//! native_libraries = ["libart", "libartbase"]
//! optional_native_libraries = ["libclang_rt.asan*"]
//! java_libraries = ["core-oj"]
//!
//! [no_superfluous_binaries]
//! no_superfluous_files = ["bin"]
//! ```
//!
//! Missing tables and keys are empty. The roster shipped with the crate is
//! available as [`RuleSet::builtin`].
//!
//! Within a table, checks run grouped by key in a fixed order (`files`,
//! `executables`, `executable_symlinks`, `symlinked_multilib_executables`,
//! `symlinked_prefer32_executables`, `multilib_executables`,
//! `native_libraries`, `prefer64_libraries`, `single_libraries`,
//! `optional_native_libraries`, `absent_libraries`, `java_libraries`,
//! `ignore_paths`, `no_superfluous_files`), whatever order the keys appear in
//! the file. Failure messages of one policy follow that order.
//!
//! Patterns in `optional_native_libraries` and `ignore_paths` are shell globs
//! matched against whole package paths: `*` also crosses `/`, and a run of
//! `*` counts as one. A pattern that does not compile as a glob (an unclosed
//! `[`, for instance) only matches the identical path.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Rule set schema version understood by this crate
pub const RULES_VERSION: u32 = 1;

const BUILTIN_RULES: &str = include_str!("../rules/art.toml");

/// Checklists for every policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub version: u32,
    #[serde(default)]
    pub release: Checklist,
    #[serde(default)]
    pub release_target: Checklist,
    #[serde(default)]
    pub release_host: Checklist,
    #[serde(default)]
    pub debug: Checklist,
    #[serde(default)]
    pub debug_target: Checklist,
    #[serde(default)]
    pub no_superfluous_binaries: Checklist,
    #[serde(default)]
    pub no_superfluous_libraries: Checklist,
}

/// Expectations of a single policy, grouped by check
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Checklist {
    /// Overrides the policy's default title in logs and reports
    pub title: Option<String>,
    pub files: Vec<String>,
    pub executables: Vec<String>,
    pub executable_symlinks: Vec<String>,
    pub symlinked_multilib_executables: Vec<String>,
    pub symlinked_prefer32_executables: Vec<String>,
    pub multilib_executables: Vec<String>,
    pub native_libraries: Vec<String>,
    pub prefer64_libraries: Vec<String>,
    pub single_libraries: Vec<String>,
    /// Glob basenames allowed but not required
    pub optional_native_libraries: Vec<String>,
    /// Basenames that must not appear in `lib` or `lib64`
    pub absent_libraries: Vec<String>,
    pub java_libraries: Vec<String>,
    pub ignore_paths: Vec<String>,
    /// Directories checked against everything expected so far
    pub no_superfluous_files: Vec<String>,
}

impl RuleSet {
    /// The roster shipped with this crate
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_RULES)
    }

    /// Load a rule set from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::RulesFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a rule set from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let rules: RuleSet = toml::from_str(content)?;
        if rules.version != RULES_VERSION {
            return Err(Error::UnsupportedRules {
                found: rules.version,
                expected: RULES_VERSION,
            });
        }
        Ok(rules)
    }
}
