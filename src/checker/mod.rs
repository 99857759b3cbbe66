// src/checker/mod.rs

//! Rule checker for APEX contents
//!
//! A [`Checker`] evaluates expectations against an [`ApexProvider`]. Failed
//! expectations are logged and counted rather than aborting, so one pass
//! reports every violation. Every path a positive check looks at (and every
//! pattern passed to [`Checker::ignore_path`]) is remembered, which lets
//! [`Checker::check_no_superfluous_files`] flag anything in a directory that
//! no earlier check accounted for.
//!
//! Expectations that depend on the package's bitness are delegated to a
//! [`Bitness`] policy chosen once per run.

pub mod bitness;
pub mod policy;

pub use bitness::{Arch32, Arch64, Bitness, BitnessChoice, Multilib};
pub use policy::{PolicyKind, apply_policy, policy_plan};

use crate::apex::{ApexProvider, join_path};
use crate::error::Result;
use glob::Pattern;
use std::collections::BTreeSet;
use tracing::error;

/// Stateful validator over one APEX
pub struct Checker<'a> {
    provider: &'a mut dyn ApexProvider,
    bitness: Box<dyn Bitness>,
    errors: usize,
    failures: Vec<String>,
    expected: BTreeSet<String>,
}

impl<'a> Checker<'a> {
    pub fn new(provider: &'a mut dyn ApexProvider, bitness: Box<dyn Bitness>) -> Self {
        Self {
            provider,
            bitness,
            errors: 0,
            failures: Vec::new(),
            expected: BTreeSet::new(),
        }
    }

    pub fn bitness(&self) -> &dyn Bitness {
        self.bitness.as_ref()
    }

    /// Failures since the last reset
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Clear the failure tally and messages; expectations are kept
    pub fn reset_errors(&mut self) {
        self.errors = 0;
        self.failures.clear();
    }

    /// Drain the failure messages recorded since the last reset
    pub fn take_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.failures)
    }

    /// Paths and patterns registered so far
    pub fn expected_paths(&self) -> &BTreeSet<String> {
        &self.expected
    }

    fn fail(&mut self, message: String) {
        self.errors += 1;
        error!("{}", message);
        self.failures.push(message);
    }

    /// Why `path` is not a plain file, if it is not
    fn file_problem(&mut self, path: &str) -> Result<Option<String>> {
        Ok(match self.provider.get(path)? {
            None => Some(format!("Could not find {}", path)),
            Some(entry) if entry.is_dir() => Some(format!("{} is a directory", path)),
            Some(_) => None,
        })
    }

    /// `path` must exist and not be a directory
    pub fn check_file(&mut self, path: &str) -> Result<bool> {
        let problem = self.file_problem(path)?;
        self.expected.insert(path.to_string());
        match problem {
            Some(message) => {
                self.fail(message);
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// `bin/<name>` must be an executable file
    pub fn check_executable(&mut self, name: &str) -> Result<()> {
        let path = format!("bin/{}", name);
        if !self.check_file(&path)? {
            return Ok(());
        }
        let executable = self
            .provider
            .get(&path)?
            .is_some_and(|entry| entry.executable);
        if !executable {
            self.fail(format!("{} is not executable", path));
        }
        Ok(())
    }

    /// `bin/<name>` must be a symlink; its target is not inspected
    pub fn check_executable_symlink(&mut self, name: &str) -> Result<()> {
        let path = format!("bin/{}", name);
        let Some(entry) = self.provider.get(&path)? else {
            self.fail(format!("Could not find {}", path));
            return Ok(());
        };
        if entry.is_dir() {
            self.fail(format!("{} is a directory", path));
            return Ok(());
        }
        if !entry.is_symlink() {
            self.fail(format!("{} is not a symlink", path));
        }
        self.expected.insert(path);
        Ok(())
    }

    /// `name` must exist in at least one of `lib` and `lib64`
    pub fn check_single_library(&mut self, name: &str) -> Result<()> {
        let mut found = false;
        for dir in ["lib", "lib64"] {
            let path = format!("{}/{}", dir, name);
            if self.file_problem(&path)?.is_none() {
                self.expected.insert(path);
                found = true;
            }
        }
        if !found {
            self.fail(format!("Library missing: {}", name));
        }
        Ok(())
    }

    /// `<basename>.so` must not exist in `lib` or `lib64`
    pub fn check_no_library(&mut self, basename: &str) -> Result<()> {
        for dir in ["lib", "lib64"] {
            let path = format!("{}/{}.so", dir, basename);
            if self.provider.get(&path)?.is_some() {
                self.fail(format!("Unexpected library {}", path));
            }
        }
        Ok(())
    }

    /// `javalib/<basename>.jar` must exist
    pub fn check_java_library(&mut self, basename: &str) -> Result<bool> {
        self.check_file(&format!("javalib/{}.jar", basename))
    }

    /// Allow paths matching `pattern` without requiring them
    pub fn ignore_path(&mut self, pattern: &str) {
        self.expected.insert(pattern.to_string());
    }

    /// Every entry of `dir` must match something registered earlier
    ///
    /// Patterns below `dir` also allow the entry of `dir` they live in, so
    /// ignoring `lib/arm` accepts a `lib/arm` directory while checking `lib`.
    pub fn check_no_superfluous_files(&mut self, dir: &str) -> Result<()> {
        let paths: Vec<String> = self
            .provider
            .read_dir(dir)?
            .keys()
            .filter(|name| *name != "." && *name != "..")
            .map(|name| join_path(dir, name))
            .collect();

        let prefix = format!("{}/", dir);
        let mut allowed = BTreeSet::new();
        for pattern in &self.expected {
            let mut candidates = vec![pattern.clone()];
            if let Some(subpath) = pattern.strip_prefix(&prefix) {
                let first_segment = subpath.split('/').next().unwrap_or(subpath);
                candidates.push(format!("{}{}", prefix, first_segment));
            }
            for candidate in &candidates {
                allowed.extend(paths.iter().filter(|path| glob_matches(candidate, path)));
            }
        }

        let unexpected: Vec<String> = paths
            .iter()
            .filter(|path| !allowed.contains(path))
            .cloned()
            .collect();
        for path in unexpected {
            self.fail(format!("Unexpected file '{}'", path));
        }
        Ok(())
    }

    /// `bin/<name>` symlinks to the bitness-suffixed executables
    pub fn check_symlinked_multilib_executable(&mut self, name: &str) -> Result<()> {
        for executable in self.bitness.symlinked_multilib_executables(name) {
            self.check_executable(&executable)?;
        }
        self.check_executable_symlink(name)
    }

    /// `bin/<name>` symlinks to the 32-bit executable where one exists
    pub fn check_symlinked_prefer32_executable(&mut self, name: &str) -> Result<()> {
        for executable in self.bitness.symlinked_prefer32_executables(name) {
            self.check_executable(&executable)?;
        }
        self.check_executable_symlink(name)
    }

    /// `bin/<name>` for 32-bit and/or `bin/<name>64`
    pub fn check_multilib_executable(&mut self, name: &str) -> Result<()> {
        for executable in self.bitness.multilib_executables(name) {
            self.check_executable(&executable)?;
        }
        Ok(())
    }

    /// `lib/<basename>.so` and/or `lib64/<basename>.so`
    pub fn check_native_library(&mut self, basename: &str) -> Result<()> {
        for dir in self.bitness.library_dirs() {
            self.check_file(&format!("{}/{}.so", dir, basename))?;
        }
        Ok(())
    }

    /// Allow `lib/<pattern>.so` and/or `lib64/<pattern>.so` to exist
    pub fn check_optional_native_library(&mut self, pattern: &str) {
        for dir in self.bitness.library_dirs() {
            self.ignore_path(&format!("{}/{}.so", dir, pattern));
        }
    }

    /// `lib64/<basename>.so`, or `lib/<basename>.so` on 32-bit only packages
    pub fn check_prefer64_library(&mut self, basename: &str) -> Result<()> {
        let dir = self.bitness.prefer64_library_dir();
        self.check_file(&format!("{}/{}.so", dir, basename))?;
        Ok(())
    }
}

/// Shell-style match where `*` also crosses `/`
///
/// Runs of `*` behave like a single `*`. A pattern that is not a valid glob
/// only matches itself.
pub(crate) fn glob_matches(pattern: &str, path: &str) -> bool {
    let mut collapsed = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if ch == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(ch);
    }
    match Pattern::new(&collapsed) {
        Ok(compiled) => compiled.matches(path),
        Err(_) => pattern == path,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::apex::{DirListing, EntryKind, FsEntry, split_path};
    use std::collections::BTreeMap;

    /// In-memory provider for checker tests
    #[derive(Default)]
    pub(crate) struct MemoryProvider {
        dirs: BTreeMap<String, DirListing>,
        empty: DirListing,
        pub(crate) reads: usize,
    }

    impl MemoryProvider {
        pub(crate) fn with(entries: &[(&str, EntryKind, bool)]) -> Self {
            let mut provider = Self::default();
            for (path, kind, executable) in entries {
                provider.add(path, *kind, *executable);
            }
            provider
        }

        pub(crate) fn add(&mut self, path: &str, kind: EntryKind, executable: bool) {
            let mut current = path;
            let mut leaf = Some((kind, executable));
            while !current.is_empty() {
                let (dir, name) = split_path(current);
                let (kind, executable) = leaf.take().unwrap_or((EntryKind::Directory, false));
                self.dirs
                    .entry(dir.to_string())
                    .or_default()
                    .entry(name.to_string())
                    .or_insert_with(|| FsEntry::new(name, kind, executable));
                current = dir;
            }
        }
    }

    impl ApexProvider for MemoryProvider {
        fn read_dir(&mut self, dir: &str) -> Result<&DirListing> {
            self.reads += 1;
            Ok(self.dirs.get(dir).unwrap_or(&self.empty))
        }

        fn cached_dirs(&self) -> &BTreeMap<String, DirListing> {
            &self.dirs
        }
    }

    use EntryKind::{Directory, File, Symlink};

    #[test]
    fn test_check_file() {
        let mut provider = MemoryProvider::with(&[
            ("apex_manifest.json", File, false),
            ("javalib", Directory, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));

        assert!(checker.check_file("apex_manifest.json").unwrap());
        assert_eq!(checker.error_count(), 0);

        assert!(!checker.check_file("javalib").unwrap());
        assert!(!checker.check_file("etc/missing.txt").unwrap());
        assert_eq!(checker.error_count(), 2);
        assert_eq!(
            checker.take_failures(),
            vec!["javalib is a directory", "Could not find etc/missing.txt"]
        );

        // Failed paths are still registered
        assert!(checker.expected_paths().contains("etc/missing.txt"));
    }

    #[test]
    fn test_check_executable() {
        let mut provider = MemoryProvider::with(&[
            ("bin/dex2oat", File, true),
            ("bin/dexdump", File, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));

        checker.check_executable("dex2oat").unwrap();
        assert_eq!(checker.error_count(), 0);

        checker.check_executable("dexdump").unwrap();
        assert_eq!(checker.take_failures(), vec!["bin/dexdump is not executable"]);
    }

    #[test]
    fn test_check_executable_symlink() {
        let mut provider = MemoryProvider::with(&[
            ("bin/dalvikvm", Symlink, true),
            ("bin/dalvikvm64", File, true),
            ("bin/nested", Directory, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));

        checker.check_executable_symlink("dalvikvm").unwrap();
        assert_eq!(checker.error_count(), 0);

        checker.check_executable_symlink("dalvikvm64").unwrap();
        checker.check_executable_symlink("nested").unwrap();
        checker.check_executable_symlink("absent").unwrap();
        assert_eq!(
            checker.take_failures(),
            vec![
                "bin/dalvikvm64 is not a symlink",
                "bin/nested is a directory",
                "Could not find bin/absent",
            ]
        );
        assert!(checker.expected_paths().contains("bin/dalvikvm64"));
        assert!(!checker.expected_paths().contains("bin/nested"));
        assert!(!checker.expected_paths().contains("bin/absent"));
    }

    #[test]
    fn test_native_library_depends_on_bitness() {
        let entries = [("lib/libart.so", File, false)];

        let mut provider = MemoryProvider::with(&entries);
        let mut checker = Checker::new(&mut provider, Box::new(Multilib));
        checker.check_native_library("libart").unwrap();
        assert_eq!(checker.take_failures(), vec!["Could not find lib64/libart.so"]);

        let mut provider = MemoryProvider::with(&entries);
        let mut checker = Checker::new(&mut provider, Box::new(Arch32));
        checker.check_native_library("libart").unwrap();
        assert_eq!(checker.error_count(), 0);
    }

    #[test]
    fn test_symlinked_multilib_executable() {
        let mut provider = MemoryProvider::with(&[
            ("bin/dalvikvm32", File, true),
            ("bin/dalvikvm64", File, true),
            ("bin/dalvikvm", Symlink, true),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Multilib));
        checker.check_symlinked_multilib_executable("dalvikvm").unwrap();
        assert_eq!(checker.error_count(), 0);
        assert_eq!(checker.expected_paths().len(), 3);
    }

    #[test]
    fn test_prefer64_library() {
        let mut provider = MemoryProvider::with(&[("lib64/libmeminfo.so", File, false)]);
        let mut checker = Checker::new(&mut provider, Box::new(Multilib));
        checker.check_prefer64_library("libmeminfo").unwrap();
        assert_eq!(checker.error_count(), 0);
        assert!(!checker.expected_paths().contains("lib/libmeminfo.so"));
    }

    #[test]
    fn test_single_and_absent_libraries() {
        let mut provider = MemoryProvider::with(&[
            ("lib64/libfoo.so", File, false),
            ("lib/libstale.so", File, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));

        checker.check_single_library("libfoo.so").unwrap();
        checker.check_single_library("libbar.so").unwrap();
        checker.check_no_library("libstale").unwrap();
        checker.check_no_library("libgone").unwrap();

        assert_eq!(
            checker.take_failures(),
            vec!["Library missing: libbar.so", "Unexpected library lib/libstale.so"]
        );
        assert!(checker.expected_paths().contains("lib64/libfoo.so"));
        assert!(!checker.expected_paths().contains("lib/libfoo.so"));
    }

    #[test]
    fn test_no_superfluous_files() {
        let mut provider = MemoryProvider::with(&[
            ("bin/dex2oat", File, true),
            ("bin/profman", File, true),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));

        checker.check_executable("dex2oat").unwrap();
        checker.check_no_superfluous_files("bin").unwrap();
        assert_eq!(checker.take_failures(), vec!["Unexpected file 'bin/profman'"]);

        checker.reset_errors();
        checker.check_executable("profman").unwrap();
        checker.check_no_superfluous_files("bin").unwrap();
        assert_eq!(checker.error_count(), 0);
    }

    #[test]
    fn test_no_superfluous_files_globs() {
        let mut provider = MemoryProvider::with(&[
            ("lib64/libart.so", File, false),
            ("lib64/libclang_rt.asan-aarch64-android.so", File, false),
            ("lib/arm/libfoo.so", File, false),
            ("lib/libart.so", File, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Multilib));

        checker.check_native_library("libart").unwrap();
        checker.check_optional_native_library("libclang_rt.asan*");
        checker.ignore_path("lib/arm/*");
        checker.check_no_superfluous_files("lib64").unwrap();
        checker.check_no_superfluous_files("lib").unwrap();
        assert_eq!(checker.error_count(), 0);
    }

    #[test]
    fn test_no_superfluous_skips_dot_entries() {
        let mut provider = MemoryProvider::with(&[
            ("bin/.", Directory, false),
            ("bin/..", Directory, false),
        ]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch32));
        checker.check_no_superfluous_files("bin").unwrap();
        assert_eq!(checker.error_count(), 0);
    }

    #[test]
    fn test_reset_keeps_expectations() {
        let mut provider = MemoryProvider::with(&[]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch32));
        checker.check_file("missing").unwrap();
        checker.reset_errors();
        assert_eq!(checker.error_count(), 0);
        assert!(checker.take_failures().is_empty());
        assert!(checker.expected_paths().contains("missing"));
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("lib/libclang_rt.asan*.so", "lib/libclang_rt.asan-arm.so"));
        assert!(glob_matches("lib/*", "lib/arm/libfoo.so"));
        assert!(!glob_matches("lib/libart.so", "lib/libartd.so"));
        // Invalid patterns fall back to literal comparison
        assert!(glob_matches("lib/[broken", "lib/[broken"));
        assert!(!glob_matches("lib/[broken", "lib/b"));
    }

    #[test]
    fn test_glob_matches_star_runs() {
        assert!(glob_matches(
            "lib64/libclang_rt.asan**.so",
            "lib64/libclang_rt.asan-x86_64-android.so"
        ));
        assert!(glob_matches("lib/**", "lib/arm/libfoo.so"));
        assert!(!glob_matches("lib64/libclang_rt.asan**.so", "lib64/libart.so"));
    }

    #[test]
    fn test_no_superfluous_files_star_runs() {
        let mut provider =
            MemoryProvider::with(&[("lib64/libclang_rt.ubsan_standalone-aarch64.so", File, false)]);
        let mut checker = Checker::new(&mut provider, Box::new(Arch64));
        checker.check_optional_native_library("libclang_rt.ubsan**");
        checker.check_no_superfluous_files("lib64").unwrap();
        assert_eq!(checker.error_count(), 0);
    }
}
