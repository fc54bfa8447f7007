//! Flow-targeted exploration.
//!
//! `guided-coverage` biases navigation toward an externally supplied set of
//! target paths (a "flow" specification), falling back to any unvisited
//! candidate, then to the full list, while avoiding the recent-paths window
//! when that leaves anything to pick.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::candidates::{normalize_path_str, ExploreCandidate};
use crate::config::ExploreConfig;
use crate::error::ExploreError;
use crate::strategy::{
    dead_end_restart, scheduled_restart, CandidatePolicy, ExploreAction, InitOutcome, StepContext,
    Strategy,
};

/// Metadata block of a flow specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMeta {
    #[serde(default)]
    pub start_path: Option<String>,
}

/// A flow specification: a preferred start path and the pages a complete
/// walk of the application should reach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowData {
    #[serde(default)]
    pub meta: Option<FlowMeta>,
    #[serde(default)]
    pub pages: Option<Vec<String>>,
}

/// Supplies the flow specification to strategies that want one.
pub trait FlowLoader {
    fn load(&mut self) -> Result<FlowData, ExploreError>;
}

/// Loader for harnesses that don't configure a flow document. Strategies
/// that need one fail with a config-class error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFlowLoader;

impl FlowLoader for NullFlowLoader {
    fn load(&mut self) -> Result<FlowData, ExploreError> {
        Err(ExploreError::Flow(
            "no flow specification configured".to_string(),
        ))
    }
}

/// In-memory loader; the test-harness workhorse.
#[derive(Debug, Clone, Default)]
pub struct StaticFlowLoader(pub FlowData);

impl FlowLoader for StaticFlowLoader {
    fn load(&mut self) -> Result<FlowData, ExploreError> {
        Ok(self.0.clone())
    }
}

/// Reads and parses a JSON flow document from disk.
#[derive(Debug, Clone)]
pub struct JsonFileFlowLoader {
    path: PathBuf,
}

impl JsonFileFlowLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlowLoader for JsonFileFlowLoader {
    fn load(&mut self) -> Result<FlowData, ExploreError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            ExploreError::Flow(format!("read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| ExploreError::Flow(format!("parse {}: {e}", self.path.display())))
    }
}

/// Normalize flow target paths into the comparison form candidates use.
#[must_use]
pub fn normalize_flow_targets(pages: &[String]) -> BTreeSet<String> {
    pages.iter().map(|p| normalize_path_str(p)).collect()
}

/// Guided-coverage strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedCoverage;

impl GuidedCoverage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for GuidedCoverage {
    fn name(&self) -> &'static str {
        "guided-coverage"
    }

    fn candidate_policy(&self) -> CandidatePolicy {
        CandidatePolicy {
            limit: 400,
            dedupe_by_path: true,
            skip_self: true,
            skip_before_slice: false,
        }
    }

    fn init(
        &mut self,
        _config: &ExploreConfig,
        flow: &mut dyn FlowLoader,
    ) -> Result<InitOutcome, ExploreError> {
        let data = flow.load()?;
        let target_set = normalize_flow_targets(data.pages.as_deref().unwrap_or_default());
        let start_path = data
            .meta
            .and_then(|m| m.start_path)
            .map(|p| normalize_path_str(&p));
        Ok(InitOutcome {
            target_set: Some(target_set),
            start_path,
        })
    }

    fn next_action(&mut self, ctx: &mut StepContext<'_>) -> ExploreAction {
        if let Some(restart) = scheduled_restart(ctx.step_index, ctx.config.restart_every) {
            return restart;
        }
        if ctx.candidates.is_empty() {
            return dead_end_restart();
        }

        let empty = BTreeSet::new();
        let targets = ctx.target_set.unwrap_or(&empty);
        let unvisited_targets: Vec<&ExploreCandidate> = ctx
            .candidates
            .iter()
            .filter(|c| targets.contains(&c.path) && !ctx.visited.contains(&c.path))
            .collect();
        let unvisited_any: Vec<&ExploreCandidate> = ctx
            .candidates
            .iter()
            .filter(|c| !ctx.visited.contains(&c.path))
            .collect();

        let pool: Vec<&ExploreCandidate> = if !unvisited_targets.is_empty() {
            unvisited_targets
        } else if !unvisited_any.is_empty() {
            unvisited_any
        } else {
            ctx.candidates.iter().collect()
        };

        // Exclude the recent window unless that would leave nothing.
        let non_recent: Vec<&ExploreCandidate> = pool
            .iter()
            .copied()
            .filter(|c| !ctx.recent.contains(&c.path))
            .collect();
        let final_pool = if non_recent.is_empty() { &pool } else { &non_recent };

        let pick = final_pool[ctx.rng.next_index(final_pool.len())];
        ExploreAction::goto_candidate(pick, "guided-pick".to_string())
    }
}
