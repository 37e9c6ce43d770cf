//! Batch verification
//!
//! Submissions are independent: each is verified on one rayon worker that
//! owns the submission outright. Only the contract and configuration are
//! shared. Reports come back in submission order.

use crate::engine::{CancellationToken, RunReport, Verifier};
use crate::error::BatchError;
use fmc_candidate::Candidate;
use fmc_contract::RoleBinding;
use rayon::prelude::*;

/// One candidate with its binding
#[derive(Debug)]
pub struct Submission {
    /// Candidate under test
    pub candidate: Candidate,
    /// Role binding for this candidate
    pub binding: RoleBinding,
}

impl Submission {
    /// Pair a candidate with its binding
    #[inline]
    #[must_use]
    pub fn new(candidate: Candidate, binding: RoleBinding) -> Self {
        Self { candidate, binding }
    }
}

impl Verifier {
    /// Verify submissions in parallel
    pub fn verify_batch(&self, submissions: Vec<Submission>) -> Result<Vec<RunReport>, BatchError> {
        self.verify_batch_with(submissions, &CancellationToken::new())
    }

    /// Verify submissions in parallel with a shared cancellation token
    pub fn verify_batch_with(
        &self,
        submissions: Vec<Submission>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RunReport>, BatchError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("fmc-verify-{index}"));
        if let Some(jobs) = self.config().jobs {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build()?;

        tracing::info!(
            submissions = submissions.len(),
            workers = pool.current_num_threads(),
            "batch verification started"
        );

        let reports = pool.install(|| {
            submissions
                .into_par_iter()
                .map(|submission| self.run(&submission.candidate, &submission.binding, cancel))
                .collect::<Vec<_>>()
        });

        let passed = reports.iter().filter(|r| r.verdict.passed()).count();
        tracing::info!(passed, total = reports.len(), "batch verification finished");
        Ok(reports)
    }
}
