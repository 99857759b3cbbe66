// src/checker/policy.rs

//! Named policies and the order they run in

use super::Checker;
use crate::error::Result;
use crate::rules::{Checklist, RuleSet};
use std::fmt;

/// One named checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Release,
    ReleaseTarget,
    ReleaseHost,
    Debug,
    DebugTarget,
    NoSuperfluousBinaries,
    NoSuperfluousLibraries,
}

impl PolicyKind {
    /// Title used when the rule set does not provide one
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Release => "Release Checker",
            Self::ReleaseTarget => "Release (Target) Checker",
            Self::ReleaseHost => "Release (Host) Checker",
            Self::Debug => "Debug Checker",
            Self::DebugTarget => "Debug (Target) Checker",
            Self::NoSuperfluousBinaries => "No superfluous binaries checker",
            Self::NoSuperfluousLibraries => "No superfluous libraries checker",
        }
    }

    /// The checklist for this policy in `rules`
    pub fn checklist(self, rules: &RuleSet) -> &Checklist {
        match self {
            Self::Release => &rules.release,
            Self::ReleaseTarget => &rules.release_target,
            Self::ReleaseHost => &rules.release_host,
            Self::Debug => &rules.debug,
            Self::DebugTarget => &rules.debug_target,
            Self::NoSuperfluousBinaries => &rules.no_superfluous_binaries,
            Self::NoSuperfluousLibraries => &rules.no_superfluous_libraries,
        }
    }

    pub fn title(self, rules: &RuleSet) -> &str {
        self.checklist(rules)
            .title
            .as_deref()
            .unwrap_or_else(|| self.default_title())
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_title())
    }
}

/// Policies to run for a package flavor, in order
///
/// The no-superfluous policies come last: they compare directory contents
/// against every expectation the earlier policies registered.
pub fn policy_plan(host: bool, debug: bool) -> Vec<PolicyKind> {
    let mut plan = vec![PolicyKind::Release];
    plan.push(if host {
        PolicyKind::ReleaseHost
    } else {
        PolicyKind::ReleaseTarget
    });
    if debug {
        plan.push(PolicyKind::Debug);
        if !host {
            plan.push(PolicyKind::DebugTarget);
        }
    }
    plan.push(PolicyKind::NoSuperfluousBinaries);
    // Library placement only matters on target, where a library missing from
    // the APEX would be loaded from the wrong place.
    if !host {
        plan.push(PolicyKind::NoSuperfluousLibraries);
    }
    plan
}

/// Apply every expectation of `checklist` to `checker`
pub fn apply_policy(checker: &mut Checker<'_>, checklist: &Checklist) -> Result<()> {
    for path in &checklist.files {
        checker.check_file(path)?;
    }
    for name in &checklist.executables {
        checker.check_executable(name)?;
    }
    for name in &checklist.executable_symlinks {
        checker.check_executable_symlink(name)?;
    }
    for name in &checklist.symlinked_multilib_executables {
        checker.check_symlinked_multilib_executable(name)?;
    }
    for name in &checklist.symlinked_prefer32_executables {
        checker.check_symlinked_prefer32_executable(name)?;
    }
    for name in &checklist.multilib_executables {
        checker.check_multilib_executable(name)?;
    }
    for basename in &checklist.native_libraries {
        checker.check_native_library(basename)?;
    }
    for basename in &checklist.prefer64_libraries {
        checker.check_prefer64_library(basename)?;
    }
    for name in &checklist.single_libraries {
        checker.check_single_library(name)?;
    }
    for pattern in &checklist.optional_native_libraries {
        checker.check_optional_native_library(pattern);
    }
    for basename in &checklist.absent_libraries {
        checker.check_no_library(basename)?;
    }
    for basename in &checklist.java_libraries {
        checker.check_java_library(basename)?;
    }
    for pattern in &checklist.ignore_paths {
        checker.ignore_path(pattern);
    }
    for dir in &checklist.no_superfluous_files {
        checker.check_no_superfluous_files(dir)?;
    }
    Ok(())
}
