//! Verification runs
//!
//! A run walks the contract's clauses for every concrete pair of the binding
//! in order, structural first, and asks the matching verifier for each. Between clauses it checks the
//! cancellation token and the run budget; once either trips, every clause
//! not yet started is reported inconclusive.

use crate::aggregate::{aggregate_clauses, Verdict};
use crate::behavioral::BehavioralVerifier;
use crate::config::VerifierConfig;
use crate::error::ConfigError;
use crate::scope::panic_message;
use crate::structural::StructuralVerifier;
use chrono::{DateTime, Utc};
use fmc_candidate::Candidate;
use fmc_contract::{CheckId, CheckKind, CheckResult, InconclusiveCause, PatternContract, RoleBinding};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Cooperative cancellation flag shared between a run and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create untriggered token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; checks already running finish first
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Verdict plus run metadata
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Elapsed time in milliseconds
    pub duration_ms: u64,
    /// Candidate label
    pub candidate: String,
    /// Candidate source fingerprint, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Why the run stopped early, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<InconclusiveCause>,
    /// The verdict
    pub verdict: Verdict,
}

/// Runs the Factory Method contract against candidates
#[derive(Debug, Clone)]
pub struct Verifier {
    contract: &'static PatternContract,
    config: VerifierConfig,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            contract: PatternContract::describe(),
            config: VerifierConfig::default(),
        }
    }
}

impl Verifier {
    /// Create verifier with validated configuration
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            contract: PatternContract::describe(),
            config,
        })
    }

    /// Contract being enforced
    #[inline]
    #[must_use]
    pub fn contract(&self) -> &'static PatternContract {
        self.contract
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify one candidate to completion
    #[must_use]
    pub fn verify(&self, candidate: &Candidate, binding: &RoleBinding) -> Verdict {
        self.run(candidate, binding, &CancellationToken::new()).verdict
    }

    /// Verify one candidate, honoring `cancel` and the run budget
    pub fn run(
        &self,
        candidate: &Candidate,
        binding: &RoleBinding,
        cancel: &CancellationToken,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = self.config.run_budget.map(|budget| start + budget);

        let span = tracing::info_span!("verification", %run_id, candidate = candidate.label());
        let _guard = span.enter();
        tracing::info!(
            runtime = candidate.runtime().name(),
            types = candidate.model().len(),
            "verification started"
        );

        let structural = StructuralVerifier::new(self.contract, binding, candidate.model());
        let behavioral =
            BehavioralVerifier::new(self.contract, binding, candidate.model(), candidate.runtime());

        let mut interrupted: Option<InconclusiveCause> = None;
        let mut structural_results = Vec::new();
        let mut behavioral_results = Vec::new();

        let clauses = self.contract.clauses_for(binding.variant_count());
        for &id in &clauses {
            if interrupted.is_none() {
                if cancel.is_cancelled() {
                    interrupted = Some(InconclusiveCause::Cancelled);
                } else if deadline.is_some_and(|d| Instant::now() >= d) {
                    interrupted = Some(InconclusiveCause::BudgetExhausted);
                }
                if let Some(cause) = interrupted {
                    tracing::warn!(cause = cause.as_str(), next = %id, "run interrupted");
                }
            }

            let result = match interrupted {
                Some(InconclusiveCause::Cancelled) => {
                    CheckResult::inconclusive(id, InconclusiveCause::Cancelled, "run cancelled before this check")
                }
                Some(cause) => CheckResult::inconclusive(id, cause, "run budget exhausted before this check"),
                None => execute(id, &structural, &behavioral),
            };
            let result = CheckResult {
                message: self.config.clip(result.message),
                ..result
            };

            metrics::counter!("fmc_checks_total", "status" => result.status.as_str()).increment(1);
            match id.kind() {
                CheckKind::Structural => structural_results.push(result),
                CheckKind::Behavioral => behavioral_results.push(result),
            }
        }

        let verdict = aggregate_clauses(&clauses, structural_results, behavioral_results);
        let summary = verdict.summary();
        metrics::counter!(
            "fmc_runs_total",
            "verdict" => if verdict.passed() { "pass" } else { "fail" }
        )
        .increment(1);
        tracing::info!(
            passed = verdict.passed(),
            pass = summary.passed,
            fail = summary.failed,
            inconclusive = summary.inconclusive,
            "verification finished"
        );

        RunReport {
            run_id,
            started_at,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            candidate: candidate.label().to_string(),
            fingerprint: candidate.fingerprint().map(str::to_string),
            interrupted,
            verdict,
        }
    }
}

fn execute(id: CheckId, structural: &StructuralVerifier<'_>, behavioral: &BehavioralVerifier<'_>) -> CheckResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| match id.kind() {
        CheckKind::Structural => structural.check(id),
        CheckKind::Behavioral => behavioral.check(id),
    }));

    match outcome {
        Ok(Some(result)) => result,
        Ok(None) => CheckResult::inconclusive(
            id,
            InconclusiveCause::NotExecuted,
            "no verifier handles this check",
        ),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(check = %id, panic = %message, "check aborted by panic");
            CheckResult::inconclusive(
                id,
                InconclusiveCause::Runtime,
                format!("check aborted by panic: {message}"),
            )
        }
    }
}
