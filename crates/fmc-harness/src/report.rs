//! Human-readable run reports

use fmc_verify::RunReport;
use std::fmt::Write as _;

/// Render one run as indented text
#[must_use]
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = write!(out, "candidate: {}", report.candidate);
    if let Some(fingerprint) = &report.fingerprint {
        let short: String = fingerprint.chars().take(12).collect();
        let _ = write!(out, " ({short})");
    }
    out.push('\n');

    for result in report.verdict.results() {
        let _ = writeln!(out, "  {result}");
    }

    let summary = report.verdict.summary();
    let _ = write!(
        out,
        "verdict: {} ({} pass, {} fail, {} inconclusive) in {} ms",
        if report.verdict.passed() { "PASS" } else { "FAIL" },
        summary.passed,
        summary.failed,
        summary.inconclusive,
        report.duration_ms
    );
    if let Some(cause) = report.interrupted {
        let _ = write!(out, ", interrupted: {}", cause.as_str());
    }
    out.push('\n');
    out
}

/// One line per run, for batch output
#[must_use]
pub fn render_batch_line(report: &RunReport) -> String {
    let summary = report.verdict.summary();
    format!(
        "{:<4} {} ({}/{} pass, {} fail, {} inconclusive)",
        if report.verdict.passed() { "PASS" } else { "FAIL" },
        report.candidate,
        summary.passed,
        report.verdict.results().len(),
        summary.failed,
        summary.inconclusive
    )
}
