// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The weighted-voting rule, factored out as pure functions so the
//! documented scenarios can be checked without touching the bus.

use crate::weights::AgentWeights;
use ci_core::{AgentResultSummary, Verdict};

/// `Σ(verdict_score × confidence × weight) / Σ(weight)` over the results
/// received so far. Agents that never reported are simply absent from both
/// sums; a missing analyzer never drags the score toward zero on its own.
///
/// Returns `0.5` (neutral) when no weight was accumulated at all, i.e. no
/// results were received — the "no results available" degenerate case.
pub fn weighted_score(results: &[AgentResultSummary], weights: &AgentWeights) -> f64 {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for result in results {
        let weight = weights.weight_of(&result.agent_name);
        total_score += result.verdict.base_score() * result.confidence * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.5
    }
}

/// A `reject` from a critical agent overrides the score outright; otherwise
/// the score is bucketed into the three-tier threshold.
pub fn final_verdict(results: &[AgentResultSummary], score: f64, weights: &AgentWeights) -> Verdict {
    let critical_reject = results
        .iter()
        .any(|r| weights.is_critical(&r.agent_name) && r.verdict == Verdict::Reject);
    if critical_reject {
        return Verdict::Reject;
    }

    if score < 0.4 {
        Verdict::Reject
    } else if score < 0.7 {
        Verdict::Warn
    } else {
        Verdict::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn result(agent_name: &str, verdict: Verdict, confidence: f64) -> AgentResultSummary {
        AgentResultSummary { agent_name: agent_name.into(), verdict, confidence }
    }

    #[test]
    fn clean_commit_all_approve_scores_high() {
        let weights = AgentWeights::default();
        let results = vec![
            result("diff", Verdict::Approve, 0.9),
            result("intent", Verdict::Approve, 0.9),
            result("security", Verdict::Approve, 0.9),
            result("performance", Verdict::Approve, 0.9),
            result("test", Verdict::Approve, 0.9),
        ];
        let score = weighted_score(&results, &weights);
        assert!((score - 0.9).abs() < 1e-9);
        assert_eq!(final_verdict(&results, score, &weights), Verdict::Approve);
    }

    #[test]
    fn secret_leak_security_reject_overrides_score() {
        let weights = AgentWeights::default();
        let results = vec![
            result("diff", Verdict::Approve, 0.9),
            result("intent", Verdict::Approve, 0.9),
            result("security", Verdict::Reject, 0.95),
            result("performance", Verdict::Approve, 0.9),
            result("test", Verdict::Approve, 0.9),
        ];
        let score = weighted_score(&results, &weights);
        assert_eq!(final_verdict(&results, score, &weights), Verdict::Reject);
    }

    #[test]
    fn borderline_mix_lands_in_the_warn_band() {
        let weights = AgentWeights::default();
        let results = vec![
            result("diff", Verdict::Warn, 0.8),
            result("intent", Verdict::Warn, 0.7),
            result("security", Verdict::Approve, 0.9),
            result("performance", Verdict::Warn, 0.7),
            result("test", Verdict::Warn, 0.7),
        ];
        let score = weighted_score(&results, &weights);
        assert!((score - 0.625).abs() < 1e-3);
        assert_eq!(final_verdict(&results, score, &weights), Verdict::Warn);
    }

    #[test]
    fn missing_analyzer_decides_on_the_partial_weight_only() {
        let weights = AgentWeights::default();
        let results = vec![
            result("diff", Verdict::Approve, 0.9),
            result("intent", Verdict::Approve, 0.9),
            result("security", Verdict::Approve, 0.9),
            result("test", Verdict::Approve, 0.9),
        ];
        let score = weighted_score(&results, &weights);
        assert!((score - 0.9).abs() < 1e-9);
        assert_eq!(final_verdict(&results, score, &weights), Verdict::Approve);
    }

    #[test]
    fn no_results_at_all_scores_neutral_and_rejects() {
        let weights = AgentWeights::default();
        let score = weighted_score(&[], &weights);
        assert_eq!(score, 0.5);
        assert_eq!(final_verdict(&[], score, &weights), Verdict::Reject);
    }

    #[parameterized(
        low_confidence_across_the_board = { 0.3 },
        just_under_the_reject_threshold = { 0.39 },
    )]
    fn score_under_0_4_always_rejects(confidence_scale: f64) {
        let weights = AgentWeights::default();
        let results = vec![
            result("diff", Verdict::Approve, confidence_scale),
            result("intent", Verdict::Approve, confidence_scale),
            result("security", Verdict::Approve, confidence_scale),
            result("performance", Verdict::Approve, confidence_scale),
            result("test", Verdict::Approve, confidence_scale),
        ];
        let score = weighted_score(&results, &weights);
        assert!(score < 0.4);
        assert_eq!(final_verdict(&results, score, &weights), Verdict::Reject);
    }
}
