//! Subcommand implementations
//!
//! Each command writes its output to the given writer and returns the
//! process exit code: 0 when every verified submission passed, 1 otherwise.

use crate::config::HarnessConfig;
use crate::manifest::BatchManifest;
use crate::report::{render_batch_line, render_text};
use anyhow::Context;
use fmc_candidate::Candidate;
use fmc_contract::{PatternContract, RoleBinding};
use fmc_verify::{CancellationToken, Submission, Verifier};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for `fmc verify`
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// C++ source files, or one directory of them
    pub sources: Vec<PathBuf>,
    /// Role binding file
    pub binding: PathBuf,
    /// Harness configuration file
    pub config: Option<PathBuf>,
    /// Emit JSON instead of text
    pub json: bool,
    /// Overrides the configured run budget
    pub budget_ms: Option<u64>,
    /// Skip behavioral execution
    pub structural_only: bool,
}

/// Options for `fmc batch`
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Manifest file
    pub manifest: PathBuf,
    /// Harness configuration file
    pub config: Option<PathBuf>,
    /// Emit JSON instead of text
    pub json: bool,
    /// Overrides the configured parallelism
    pub jobs: Option<usize>,
    /// Skip behavioral execution
    pub structural_only: bool,
}

/// Exit code for a pass flag
#[inline]
#[must_use]
pub fn exit_code(passed: bool) -> i32 {
    if passed {
        0
    } else {
        1
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

fn load_candidate(
    sources: &[PathBuf],
    config: &HarnessConfig,
    structural_only: bool,
) -> anyhow::Result<Candidate> {
    let gxx = (!structural_only).then(|| config.gxx.clone());
    Candidate::load_cpp_files(sources, gxx).with_context(|| {
        let listed: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
        format!("loading candidate {}", listed.join(", "))
    })
}

fn load_binding(path: &Path) -> anyhow::Result<RoleBinding> {
    RoleBinding::load(path).with_context(|| format!("loading binding {}", path.display()))
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// `fmc verify`
pub fn verify(options: &VerifyOptions, out: &mut impl Write) -> anyhow::Result<i32> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(ms) = options.budget_ms {
        config.verifier.run_budget = Some(Duration::from_millis(ms));
    }

    let binding = load_binding(&options.binding)?;
    let candidate = load_candidate(&options.sources, &config, options.structural_only)?;
    for diagnostic in candidate.model().diagnostics() {
        tracing::warn!(candidate = candidate.label(), "{diagnostic}");
    }

    let verifier = Verifier::new(config.verifier).context("invalid verifier configuration")?;
    let report = verifier.run(&candidate, &binding, &CancellationToken::new());

    if options.json {
        write_json(out, &report)?;
    } else {
        write!(out, "{}", render_text(&report))?;
    }
    Ok(exit_code(report.verdict.passed()))
}

/// `fmc inspect`
pub fn inspect(sources: &[PathBuf], out: &mut impl Write) -> anyhow::Result<i32> {
    let candidate = load_candidate(sources, &HarnessConfig::default(), true)?;
    write_json(out, candidate.model())?;
    Ok(0)
}

/// `fmc batch`
pub fn batch(options: &BatchOptions, out: &mut impl Write) -> anyhow::Result<i32> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(jobs) = options.jobs {
        config.verifier.jobs = Some(jobs);
    }

    let manifest = BatchManifest::load(&options.manifest)
        .with_context(|| format!("loading manifest {}", options.manifest.display()))?;

    let mut submissions = Vec::with_capacity(manifest.submissions.len());
    for entry in &manifest.submissions {
        let binding = load_binding(manifest.binding_for(entry)?)?;
        let mut candidate = load_candidate(std::slice::from_ref(&entry.source), &config, options.structural_only)?;
        if let Some(label) = &entry.label {
            candidate = candidate.with_label(label);
        }
        submissions.push(Submission::new(candidate, binding));
    }

    let verifier = Verifier::new(config.verifier).context("invalid verifier configuration")?;
    let reports = verifier.verify_batch(submissions)?;
    let passed = reports.iter().all(|r| r.verdict.passed());

    if options.json {
        write_json(out, &reports)?;
    } else {
        for report in &reports {
            writeln!(out, "{}", render_batch_line(report))?;
        }
    }
    Ok(exit_code(passed))
}

#[derive(Serialize)]
struct ContractView {
    contract: &'static PatternContract,
    clauses: Vec<String>,
}

/// `fmc contract`
pub fn contract(out: &mut impl Write) -> anyhow::Result<i32> {
    let contract = PatternContract::describe();
    let view = ContractView {
        contract,
        clauses: contract.clauses().iter().map(|id| id.key()).collect(),
    };
    write_json(out, &view)?;
    Ok(0)
}
