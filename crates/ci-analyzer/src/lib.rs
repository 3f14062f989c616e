// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Analyzer Workers (§2's AW×N): the `Analyzer` trait, the worker loop that
//! drives it against a [`ci_bus::MessageBus`], and the five reference
//! implementations.

mod analyzer;
mod analyzers;
mod error;
mod llm;
mod request;
mod worker;

pub use analyzer::Analyzer;
pub use analyzers::{DiffAnalyzer, IntentAnalyzer, PerformanceAnalyzer, SecurityAnalyzer, TestAnalyzer};
pub use error::{AnalyzerError, LlmError};
pub use llm::{LlmClient, NullLlmClient};
pub use request::AnalysisRequest;
pub use worker::{agent_result_from_event, AnalyzerWorker, WorkerConfig};
