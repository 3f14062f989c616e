// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Renders the human-readable explanation and blocking-issue list that ride
//! along with every decision.

use ci_core::{AgentResultSummary, Verdict};
use std::fmt::Write as _;

/// A short report: the final verdict, the score, a per-agent verdict line,
/// and a "Key Concerns" section for anything that warned or rejected.
pub fn render_explanation(results: &[AgentResultSummary], score: f64, verdict: Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Release decision: {}", verdict.to_string().to_uppercase());
    let _ = writeln!(out, "Overall confidence score: {score:.2}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Agent Verdicts:");
    for result in results {
        let _ = writeln!(out, "- {}: {} (confidence: {:.2})", result.agent_name, result.verdict, result.confidence);
    }

    let concerning: Vec<&AgentResultSummary> =
        results.iter().filter(|r| matches!(r.verdict, Verdict::Warn | Verdict::Reject)).collect();
    if !concerning.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Key Concerns:");
        for result in concerning {
            let _ = writeln!(out, "- {}: {}", result.agent_name, result.verdict);
        }
    }

    out.trim_end().to_string()
}

/// One line per agent that rejected outright — the "must fix before release"
/// list surfaced separately from the prose explanation.
pub fn blocking_issues(results: &[AgentResultSummary]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.verdict == Verdict::Reject)
        .map(|r| format!("{}: Critical issues detected", r.agent_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(agent_name: &str, verdict: Verdict, confidence: f64) -> AgentResultSummary {
        AgentResultSummary { agent_name: agent_name.into(), verdict, confidence }
    }

    #[test]
    fn clean_commit_has_no_key_concerns_or_blocking_issues() {
        let results = vec![result("diff", Verdict::Approve, 0.9), result("security", Verdict::Approve, 0.9)];
        let explanation = render_explanation(&results, 0.9, Verdict::Approve);
        assert!(explanation.contains("Release decision: APPROVE"));
        assert!(!explanation.contains("Key Concerns"));
        assert!(blocking_issues(&results).is_empty());
    }

    #[test]
    fn reject_from_security_becomes_a_blocking_issue() {
        let results = vec![result("security", Verdict::Reject, 0.95)];
        let explanation = render_explanation(&results, 0.0, Verdict::Reject);
        assert!(explanation.contains("Key Concerns"));
        assert_eq!(blocking_issues(&results), vec!["security: Critical issues detected"]);
    }
}
