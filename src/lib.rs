// src/lib.rs

//! ART APEX integrity checker
//!
//! Validates that a built APEX contains exactly the expected binaries,
//! native libraries and Java archives, with the expected executable and
//! symlink bits, for a given flavor (host or target, release or debug,
//! 32-bit, 64-bit or multilib).
//!
//! # Architecture
//!
//! - Providers: directory index over the payload, from a filesystem image
//!   listed by an external tool (target) or a nested zip (host)
//! - Checker: counts failed expectations and remembers every path it was
//!   told to expect, with bitness-specific layouts behind a trait
//! - Rules: per-flavor checklists loaded from versioned TOML
//! - Driver: runs the policies for a flavor in order and reports per policy

pub mod apex;
pub mod checker;
pub mod display;
pub mod driver;
mod error;
pub mod rules;

pub use apex::{ApexProvider, DirListing, EntryKind, FsEntry, HostProvider, TargetProvider};
pub use checker::{Arch32, Arch64, Bitness, BitnessChoice, Checker, Multilib, PolicyKind};
pub use driver::{CheckOptions, CheckReport, PolicyResult, RunOutcome, run};
pub use error::{Error, Result};
pub use rules::{Checklist, RuleSet};
