// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The `analyze(request) -> (verdict, confidence, payload)` contract every
//! analyzer implements (§4.4).

use crate::error::AnalyzerError;
use crate::request::AnalysisRequest;
use async_trait::async_trait;
use ci_core::Verdict;
use serde_json::Value;

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable, lowercase identifier. Also names the analyzer's consumer
    /// group: `"<agent_name>_group"`.
    fn agent_name(&self) -> &str;

    /// Idempotent w.r.t. `request`: the same request must yield an
    /// equivalent verdict, confidence, and payload every time, since the
    /// bus may redeliver the same `code_analysis_requested` event.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<(Verdict, f64, Value), AnalyzerError>;
}
