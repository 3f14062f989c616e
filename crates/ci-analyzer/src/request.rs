// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The request every analyzer receives: a `code_analysis_requested` event,
//! unwrapped from its bus envelope.

use ci_core::JobId;

/// One commit submitted for analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub job_id: JobId,
    pub repo_name: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub diff: String,
    pub branch: String,
    pub author: String,
}

impl AnalysisRequest {
    /// The diff text, capped for prompt-bound heuristics (§5: "regex scans
    /// over a diff capped at ~4 KB for LLM prompts").
    pub fn diff_for_prompt(&self) -> &str {
        const PROMPT_CAP: usize = 4096;
        match self.diff.char_indices().nth(PROMPT_CAP) {
            Some((byte_index, _)) => &self.diff[..byte_index],
            None => &self.diff,
        }
    }
}
