// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Categorizes the shape of a change: how many files, how many lines, and
//! what kind of files (db/api/ui/config/dependency/test/docs), then maps
//! that to a risk level. Never rejects on its own — only warns or approves.

use super::{changed_files, count_added_removed};
use crate::analyzer::Analyzer;
use crate::error::AnalyzerError;
use crate::request::AnalysisRequest;
use async_trait::async_trait;
use ci_core::Verdict;
use serde_json::json;

const DB_MARKERS: &[&str] = &["migration", "schema", "models.py", "alembic"];
const API_MARKERS: &[&str] = &["api", "endpoint", "route", "controller"];
const UI_MARKERS: &[&str] = &[".jsx", ".tsx", ".vue", ".html", ".css", "component"];
const CONFIG_MARKERS: &[&str] = &["config", ".env", ".yaml", ".yml", ".json", "settings"];
const DEPENDENCY_MARKERS: &[&str] = &["requirements.txt", "package.json", "go.mod", "cargo.toml"];
const TEST_MARKERS: &[&str] = &["test_", "_test.", "spec.", ".test.", "__test__"];
const DOCS_MARKERS: &[&str] = &[".md", "readme", "docs/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Default)]
pub struct DiffAnalyzer;

#[async_trait]
impl Analyzer for DiffAnalyzer {
    fn agent_name(&self) -> &str {
        "diff"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<(Verdict, f64, serde_json::Value), AnalyzerError> {
        let files = changed_files(&request.diff);
        let (added, removed) = count_added_removed(&request.diff);
        let total_lines = added + removed;
        let change_types = categorize(&files);
        let has_db = change_types.contains(&"db");
        let has_dependency = change_types.contains(&"dependency");
        let has_api = change_types.contains(&"api");

        let risk = if (has_db && files.len() > 1) || files.len() > 20 || total_lines > 1000 {
            RiskLevel::Critical
        } else if has_db || has_dependency || files.len() > 10 || total_lines > 500 {
            RiskLevel::High
        } else if has_api || files.len() > 5 {
            RiskLevel::Medium
        } else if change_types == ["test"] || change_types == ["docs"] {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };

        let verdict = match risk {
            RiskLevel::Critical | RiskLevel::High => Verdict::Warn,
            RiskLevel::Medium | RiskLevel::Low => Verdict::Approve,
        };

        let confidence = if files.is_empty() || request.diff.is_empty() {
            0.3
        } else if files.len() < 20 {
            0.85
        } else {
            0.65
        };

        let payload = json!({
            "files_changed": files.len(),
            "lines_added": added,
            "lines_deleted": removed,
            "change_types": change_types,
            "risk_level": risk.as_str(),
            "affected_modules": affected_modules(&files),
        });

        Ok((verdict, confidence, payload))
    }
}

fn categorize(files: &[String]) -> Vec<&'static str> {
    let mut types = Vec::new();
    let mut push = |label: &'static str| {
        if !types.contains(&label) {
            types.push(label);
        }
    };

    for file in files {
        let lower = file.to_lowercase();
        if DB_MARKERS.iter().any(|m| lower.contains(m)) {
            push("db");
        }
        if API_MARKERS.iter().any(|m| lower.contains(m)) {
            push("api");
        }
        if UI_MARKERS.iter().any(|m| lower.contains(m)) {
            push("ui");
        }
        if CONFIG_MARKERS.iter().any(|m| lower.contains(m)) {
            push("config");
        }
        if DEPENDENCY_MARKERS.iter().any(|m| lower.contains(m)) {
            push("dependency");
        }
        if TEST_MARKERS.iter().any(|m| lower.contains(m)) {
            push("test");
        }
        if DOCS_MARKERS.iter().any(|m| lower.contains(m)) {
            push("docs");
        }
    }

    if types.is_empty() {
        types.push("other");
    }
    types
}

fn affected_modules(files: &[String]) -> Vec<String> {
    let mut modules = Vec::new();
    for file in files {
        if let Some((top, _)) = file.split_once('/') {
            if !modules.iter().any(|m: &String| m == top) {
                modules.push(top.to_string());
            }
        }
    }
    modules
}
