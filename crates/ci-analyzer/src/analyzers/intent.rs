// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Compares the stated intent of a commit message against what the diff
//! actually does. This is the one analyzer that reaches for an
//! [`LlmClient`] first, since "does this message describe this diff" is a
//! judgment call a regex can only approximate — it falls back to the
//! keyword heuristic whenever the client reports unavailable.

use super::{changed_files, count_added_removed};
use crate::analyzer::Analyzer;
use crate::error::AnalyzerError;
use crate::llm::LlmClient;
use crate::request::AnalysisRequest;
use async_trait::async_trait;
use ci_core::Verdict;
use serde_json::json;
use std::sync::Arc;

const INTENT_KEYWORDS: &[(&str, &str)] = &[
    ("fix", "bugfix"),
    ("bug", "bugfix"),
    ("add", "feature"),
    ("feat", "feature"),
    ("refactor", "refactor"),
    ("clean", "refactor"),
    ("doc", "docs"),
    ("test", "test"),
    ("perf", "performance"),
    ("security", "security"),
    ("chore", "chore"),
];

fn classify_intent(commit_message: &str) -> &'static str {
    let lower = commit_message.to_lowercase();
    for (keyword, category) in INTENT_KEYWORDS {
        if lower.contains(keyword) {
            return category;
        }
    }
    "unknown"
}

pub struct IntentAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl IntentAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

impl Default for IntentAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(crate::llm::NullLlmClient))
    }
}

#[async_trait]
impl Analyzer for IntentAnalyzer {
    fn agent_name(&self) -> &str {
        "intent"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<(Verdict, f64, serde_json::Value), AnalyzerError> {
        let stated_intent = classify_intent(&request.commit_message);
        let files = changed_files(&request.diff);
        let (added, removed) = count_added_removed(&request.diff);

        let prompt = format!(
            "Commit message: {}\nFiles changed: {}\nLines added: {added}, removed: {removed}\n\
             Does the commit message accurately describe the diff? Answer MATCH or MISMATCH and a one-line reason.",
            request.commit_message,
            files.join(", "),
        );

        match self.llm.complete(&prompt).await {
            Ok(response) => {
                let mismatch = response.to_uppercase().contains("MISMATCH");
                let verdict = if mismatch { Verdict::Warn } else { Verdict::Approve };
                let payload = json!({
                    "stated_intent": stated_intent,
                    "source": "llm",
                    "analysis": response,
                });
                Ok((verdict, 0.75, payload))
            }
            Err(_unavailable) => {
                let (verdict, confidence) = heuristic_verdict(stated_intent, &files, added, removed);
                let payload = json!({
                    "stated_intent": stated_intent,
                    "source": "heuristic",
                    "files_changed": files.len(),
                });
                Ok((verdict, confidence, payload))
            }
        }
    }
}

fn heuristic_verdict(stated_intent: &str, files: &[String], added: usize, removed: usize) -> (Verdict, f64) {
    if stated_intent == "unknown" {
        return (Verdict::Warn, 0.5);
    }
    if stated_intent == "docs" && files.iter().any(|f| !f.to_lowercase().ends_with(".md")) {
        return (Verdict::Warn, 0.6);
    }
    if stated_intent == "chore" && added + removed > 300 {
        return (Verdict::Warn, 0.6);
    }
    (Verdict::Approve, 0.65)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use ci_core::JobId;

    fn request(message: &str, diff: &str) -> AnalysisRequest {
        AnalysisRequest {
            job_id: JobId::new(),
            repo_name: "acme/widgets".into(),
            commit_hash: "deadbeef".into(),
            commit_message: message.into(),
            diff: diff.into(),
            branch: "main".into(),
            author: "ada".into(),
        }
    }

    struct StaticLlm(&'static str);

    #[async_trait]
    impl LlmClient for StaticLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn falls_back_to_heuristic_when_llm_unavailable() {
        let analyzer = IntentAnalyzer::default();
        let diff = "+++ b/src/lib.rs\n+fn fixed() {}\n";
        let (verdict, _, payload) = analyzer.analyze(&request("fix: off by one", diff)).await.unwrap();
        assert_eq!(verdict, Verdict::Approve);
        assert_eq!(payload["source"], "heuristic");
    }

    #[tokio::test]
    async fn unknown_intent_from_message_warns_under_heuristic() {
        let analyzer = IntentAnalyzer::default();
        let diff = "+++ b/src/lib.rs\n+fn stuff() {}\n";
        let (verdict, _, _) = analyzer.analyze(&request("wip", diff)).await.unwrap();
        assert_eq!(verdict, Verdict::Warn);
    }

    #[tokio::test]
    async fn llm_reported_mismatch_warns() {
        let analyzer = IntentAnalyzer::new(Arc::new(StaticLlm("MISMATCH: message says docs, diff touches code")));
        let diff = "+++ b/src/lib.rs\n+fn stuff() {}\n";
        let (verdict, _, payload) = analyzer.analyze(&request("docs: typo", diff)).await.unwrap();
        assert_eq!(verdict, Verdict::Warn);
        assert_eq!(payload["source"], "llm");
    }
}
