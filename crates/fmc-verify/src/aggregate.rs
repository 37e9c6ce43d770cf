//! Verdict aggregation

use fmc_contract::{CheckId, CheckResult, CheckStatus, InconclusiveCause, PatternContract};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Overall outcome of one verification run
///
/// Built only by [`aggregate`]; passes iff every result passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    passed: bool,
    results: Vec<CheckResult>,
}

/// Per-status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictSummary {
    /// Passing checks
    pub passed: usize,
    /// Failing checks
    pub failed: usize,
    /// Inconclusive checks
    pub inconclusive: usize,
}

impl Verdict {
    /// Check if every clause passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Results in contract order
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Result for one clause
    #[must_use]
    pub fn result(&self, id: &CheckId) -> Option<&CheckResult> {
        self.results.iter().find(|r| &r.id == id)
    }

    /// Results that did not pass
    pub fn problems(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.is_pass())
    }

    /// Count results by status
    #[must_use]
    pub fn summary(&self) -> VerdictSummary {
        self.results
            .iter()
            .fold(VerdictSummary::default(), |mut summary, r| {
                match r.status {
                    CheckStatus::Pass => summary.passed += 1,
                    CheckStatus::Fail => summary.failed += 1,
                    CheckStatus::Inconclusive => summary.inconclusive += 1,
                }
                summary
            })
    }
}

/// Merge verifier outputs into a verdict
///
/// Expected clauses cover as many concrete pairs as the highest pair index
/// among the results. See [`aggregate_clauses`].
#[must_use]
pub fn aggregate(structural: Vec<CheckResult>, behavioral: Vec<CheckResult>) -> Verdict {
    let variants = structural
        .iter()
        .chain(&behavioral)
        .map(|r| r.id.variant() + 1)
        .max()
        .unwrap_or(1);
    let clauses = PatternContract::describe().clauses_for(variants);
    aggregate_clauses(&clauses, structural, behavioral)
}

/// Merge verifier outputs into a verdict over `clauses`
///
/// Results are stable-ordered by position in `clauses`, structural clauses
/// first. A clause with no result becomes inconclusive; a second result for
/// the same clause is dropped.
#[must_use]
pub fn aggregate_clauses(
    clauses: &[CheckId],
    structural: Vec<CheckResult>,
    behavioral: Vec<CheckResult>,
) -> Verdict {
    let order: HashMap<CheckId, usize> = clauses
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect();

    let mut seen: HashSet<CheckId> = HashSet::new();
    let mut results: Vec<CheckResult> = Vec::with_capacity(order.len());
    for result in structural.into_iter().chain(behavioral) {
        if seen.insert(result.id) {
            results.push(result);
        } else {
            tracing::warn!(check = %result.id, "duplicate check result dropped");
        }
    }

    for &id in clauses {
        if !seen.contains(&id) {
            results.push(CheckResult::inconclusive(
                id,
                InconclusiveCause::NotExecuted,
                "no result was produced for this check",
            ));
        }
    }

    results.sort_by_key(|r| order.get(&r.id).copied().unwrap_or(usize::MAX));
    let passed = !results.is_empty() && results.iter().all(CheckResult::is_pass);

    Verdict { passed, results }
}
