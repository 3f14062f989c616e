// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Flags a handful of classic anti-patterns in added lines: N+1 queries,
//! blocking calls, nested loops, oversized comprehensions, and synchronous
//! calls inside `async` functions. Never rejects — at most warns, since
//! these are heuristics a human reviewer should weigh, not hard blockers.

use super::added_line_bodies;
use crate::analyzer::Analyzer;
use crate::error::AnalyzerError;
use crate::request::AnalysisRequest;
use async_trait::async_trait;
use ci_core::Verdict;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

struct Pattern {
    name: &'static str,
    regex: fn() -> &'static Regex,
}

macro_rules! pattern_fn {
    ($fn_name:ident, $re:expr) => {
        fn $fn_name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            #[allow(clippy::unwrap_used)]
            RE.get_or_init(|| Regex::new($re).unwrap())
        }
    };
}

pattern_fn!(n_plus_one, r"(?i)for\s+\w+\s+in\s+\w+.*:\s*$");
pattern_fn!(blocking_call, r"(?i)\btime\.sleep\(|requests\.(get|post|put|delete)\(");
pattern_fn!(nested_loop, r"(?i)^\s{4,}for\s+\w+\s+in\b");
pattern_fn!(large_comprehension, r"\[.*for.*for.*\]");
pattern_fn!(sync_in_async, r"(?i)\.join\(\)|time\.sleep\(");

const PERFORMANCE_PATTERNS: &[Pattern] = &[
    Pattern { name: "N+1 Query", regex: n_plus_one },
    Pattern { name: "Blocking Call", regex: blocking_call },
    Pattern { name: "Nested Loop", regex: nested_loop },
    Pattern { name: "Large List Comprehension", regex: large_comprehension },
    Pattern { name: "Synchronous in Async", regex: sync_in_async },
];

#[derive(Debug, Default)]
pub struct PerformanceAnalyzer;

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    fn agent_name(&self) -> &str {
        "performance"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<(Verdict, f64, serde_json::Value), AnalyzerError> {
        let mut findings: Vec<&str> = Vec::new();

        for line in added_line_bodies(&request.diff) {
            for pattern in PERFORMANCE_PATTERNS {
                if (pattern.regex)().is_match(line) && !findings.contains(&pattern.name) {
                    findings.push(pattern.name);
                }
            }
        }

        let verdict = if findings.is_empty() { Verdict::Approve } else { Verdict::Warn };
        let payload = json!({ "anti_patterns_found": findings });

        Ok((verdict, 0.75, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ci_core::JobId;

    fn request(diff: &str) -> AnalysisRequest {
        AnalysisRequest {
            job_id: JobId::new(),
            repo_name: "acme/widgets".into(),
            commit_hash: "deadbeef".into(),
            commit_message: "fix: thing".into(),
            diff: diff.into(),
            branch: "main".into(),
            author: "ada".into(),
        }
    }

    #[tokio::test]
    async fn clean_diff_approves_with_flat_confidence() {
        let diff = "+++ b/src/lib.rs\n+fn greet() {}\n";
        let (verdict, confidence, _) = PerformanceAnalyzer.analyze(&request(diff)).await.unwrap();
        assert_eq!(verdict, Verdict::Approve);
        assert_eq!(confidence, 0.75);
    }

    #[tokio::test]
    async fn blocking_call_in_added_line_warns() {
        let diff = "+++ b/app.py\n+    time.sleep(5)\n";
        let (verdict, _, payload) = PerformanceAnalyzer.analyze(&request(diff)).await.unwrap();
        assert_eq!(verdict, Verdict::Warn);
        assert_eq!(payload["anti_patterns_found"][0], "Blocking Call");
    }
}
