// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The LLM seam (§9: "LLM is an external collaborator").
//!
//! Analyzers that want a model's opinion go through this trait rather than
//! calling a provider SDK directly, so the core pipeline never depends on
//! which provider is configured — or whether one is configured at all.
//! [`NullLlmClient`] is the default: it always reports the heuristic as
//! unavailable, which every analyzer in this workspace treats as "fall back
//! to the local heuristic", never as a fatal error.

use crate::error::LlmError;
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, returning the model's raw text response.
    ///
    /// Callers are responsible for wrapping this in their own deadline;
    /// this trait makes no timing guarantees of its own.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// The out-of-the-box `LlmClient`: no provider configured, every call
/// reports unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLlmClient;

#[async_trait]
impl LlmClient for NullLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_client_always_reports_unavailable() {
        let err = NullLlmClient.complete("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable));
    }
}
