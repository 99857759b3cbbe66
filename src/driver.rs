// src/driver.rs

//! End-to-end check of one APEX: validate options, open the payload, run the
//! policies for the package flavor and collect a report.

use crate::apex::{ApexProvider, HostProvider, TargetProvider};
use crate::checker::{BitnessChoice, Checker, PolicyKind, apply_policy, policy_plan};
use crate::display::{print_list, print_tree};
use crate::error::{Error, Result};
use crate::rules::RuleSet;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Everything needed to check one APEX
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub apex: PathBuf,
    /// Host package (nested zip payload) instead of target (image payload)
    pub host: bool,
    pub debug: bool,
    /// Print all paths instead of checking
    pub list: bool,
    /// Print a directory tree instead of checking
    pub tree: bool,
    /// One of `32`, `64`, `multilib`, `auto`
    pub bitness: String,
    /// Scratch directory for the extracted payload
    pub tmpdir: Option<PathBuf>,
    /// Filesystem-debug tool used to list target images
    pub debugfs: Option<PathBuf>,
    /// Rule set replacing the built-in one
    pub rules: Option<PathBuf>,
}

impl CheckOptions {
    pub fn new(apex: impl Into<PathBuf>) -> Self {
        Self {
            apex: apex.into(),
            host: false,
            debug: false,
            list: false,
            tree: false,
            bitness: "auto".to_string(),
            tmpdir: None,
            debugfs: None,
            rules: None,
        }
    }

    /// Reject unusable option combinations before touching the archive
    pub fn validate(&self) -> Result<BitnessChoice> {
        let usage = |message: &str| Err(Error::Usage(message.to_string()));

        if self.tree && self.debug {
            return usage("Both of --tree and --debug set");
        }
        if self.list && self.debug {
            return usage("Both of --list and --debug set");
        }
        if self.list && self.tree {
            return usage("Both of --list and --tree set");
        }
        if self.tmpdir.is_none() {
            return usage("Need a tmpdir.");
        }
        if !self.host && self.debugfs.is_none() {
            return usage("Need debugfs.");
        }
        self.bitness.parse()
    }

    fn open_provider(&self) -> Result<Box<dyn ApexProvider>> {
        let scratch = self
            .tmpdir
            .as_deref()
            .ok_or_else(|| Error::Usage("Need a tmpdir.".to_string()))?;

        if self.host {
            return Ok(Box::new(HostProvider::open(&self.apex, scratch)?));
        }
        let debugfs = self
            .debugfs
            .as_deref()
            .ok_or_else(|| Error::Usage("Need debugfs.".to_string()))?;
        Ok(Box::new(TargetProvider::open(&self.apex, scratch, debugfs)?))
    }
}

/// Outcome of one policy
#[derive(Debug, Clone)]
pub struct PolicyResult {
    pub policy: PolicyKind,
    pub title: String,
    pub errors: usize,
    pub failures: Vec<String>,
}

impl PolicyResult {
    pub fn passed(&self) -> bool {
        self.errors == 0
    }
}

/// Outcome of every policy run against one APEX
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Name of the bitness policy that was applied
    pub bitness: &'static str,
    pub results: Vec<PolicyResult>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(PolicyResult::passed)
    }

    pub fn result(&self, policy: PolicyKind) -> Option<&PolicyResult> {
        self.results.iter().find(|r| r.policy == policy)
    }

    /// Every failure message, in the order they were reported
    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .flat_map(|r| r.failures.iter().map(String::as_str))
    }
}

/// What [`run`] did
#[derive(Debug)]
pub enum RunOutcome {
    /// A listing or tree was printed
    Listed,
    Checked(CheckReport),
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        match self {
            Self::Listed => true,
            Self::Checked(report) => report.passed(),
        }
    }
}

/// Check or print one APEX
///
/// Diagnostic output (listing or tree) goes to `out`. The extracted payload
/// lives only as long as this call, whichever way it returns.
pub fn run(options: &CheckOptions, out: &mut dyn Write) -> Result<RunOutcome> {
    let choice = options.validate()?;
    let rules = match &options.rules {
        Some(path) => RuleSet::load(path)?,
        None => RuleSet::builtin()?,
    };

    let mut provider = options.open_provider().inspect_err(|e| {
        error!("Failed to create provider: {}", e);
    })?;

    if options.tree {
        print_tree(
            provider.as_mut(),
            &options.apex.display().to_string(),
            out,
        )?;
        return Ok(RunOutcome::Listed);
    }
    if options.list {
        print_list(provider.as_mut(), out)?;
        return Ok(RunOutcome::Listed);
    }

    let bitness = choice.resolve(provider.as_mut())?;
    let report = run_policies(
        Checker::new(provider.as_mut(), bitness),
        &rules,
        &policy_plan(options.host, options.debug),
    )?;
    Ok(RunOutcome::Checked(report))
}

/// Run `plan` in order, resetting the tally between policies
pub fn run_policies(
    mut checker: Checker<'_>,
    rules: &RuleSet,
    plan: &[PolicyKind],
) -> Result<CheckReport> {
    let mut results = Vec::with_capacity(plan.len());

    for &policy in plan {
        let title = policy.title(rules).to_string();
        info!("{}...", title);
        apply_policy(&mut checker, policy.checklist(rules))?;

        let errors = checker.error_count();
        if errors > 0 {
            error!("{} FAILED", title);
        } else {
            info!("{} SUCCEEDED", title);
        }
        results.push(PolicyResult {
            policy,
            title,
            errors,
            failures: checker.take_failures(),
        });
        checker.reset_errors();
    }

    debug!(
        "Registered {} expected paths",
        checker.expected_paths().len()
    );
    Ok(CheckReport {
        bitness: checker.bitness().name(),
        results,
    })
}
