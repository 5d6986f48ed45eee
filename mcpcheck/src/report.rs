//! Human-readable run summary.

use mcpcheck_testing::ScenarioReport;
use std::fmt::Write as _;

/// Render the step-by-step summary and tally printed at the end of a run.
///
/// The server's stderr tail is appended when the run did not succeed.
#[must_use]
pub fn render_summary(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Test Summary ({}) ===", report.scenario);
    for step in &report.steps {
        let mark = if step.passed { '✓' } else { '✗' };
        let _ = writeln!(out, "{mark} {}", step.name);
        if let Some(error) = &step.error {
            let _ = writeln!(out, "    {error}");
        }
    }
    if let Some(reason) = &report.aborted {
        let _ = writeln!(out, "! {reason}");
    }
    let _ = writeln!(
        out,
        "\nTotal: {}/{} tests passed",
        report.passed(),
        report.total()
    );

    if !report.success() && !report.stderr_tail.is_empty() {
        let _ = writeln!(
            out,
            "\n--- server stderr (last {} lines) ---",
            report.stderr_tail.len()
        );
        for line in &report.stderr_tail {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}
