// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! The static per-agent weight table that drives the weighted-voting rule.
//! Defaults mirror the prototype's fixed `AGENT_WEIGHTS`, configurable so a
//! deployment can retune without a code change.

use ci_core::AgentName;
use std::collections::HashMap;

/// Per-agent weight, plus which agents are "critical" — a `reject` from one
/// of these overrides the weighted score outright.
#[derive(Debug, Clone)]
pub struct AgentWeights {
    weights: HashMap<AgentName, f64>,
    critical: Vec<AgentName>,
}

impl Default for AgentWeights {
    fn default() -> Self {
        let weights = [
            ("security", 0.35),
            ("intent", 0.25),
            ("performance", 0.20),
            ("test", 0.20),
            ("diff", 0.10),
        ]
        .into_iter()
        .map(|(name, weight)| (AgentName::from(name), weight))
        .collect();

        Self { weights, critical: vec![AgentName::from("security"), AgentName::from("intent")] }
    }
}

impl AgentWeights {
    pub fn with_weights(weights: HashMap<AgentName, f64>, critical: Vec<AgentName>) -> Self {
        Self { weights, critical }
    }

    /// Zero for an agent this table doesn't know about, so an unexpected
    /// agent name contributes nothing to the weighted score rather than
    /// erroring out.
    pub fn weight_of(&self, agent_name: &str) -> f64 {
        self.weights.get(agent_name).copied().unwrap_or(0.0)
    }

    pub fn is_critical(&self, agent_name: &str) -> bool {
        self.critical.iter().any(|c| c.as_str() == agent_name)
    }

    /// The full roster the arbiter waits on before deciding early.
    pub fn expected_agents(&self) -> impl Iterator<Item = &AgentName> {
        self.weights.keys()
    }

    pub fn expected_count(&self) -> usize {
        self.weights.len()
    }
}
