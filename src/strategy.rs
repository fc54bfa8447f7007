//! The pluggable strategy seam: what to do next, given the current page.
//!
//! A [`Strategy`] owns selection policy only. The run loop owns all mutable
//! run state (coverage, visited set, recent window) and hands strategies a
//! read-only [`StepContext`] plus the step's RNG; ties are always broken by
//! a uniform draw from that RNG, so a fixed seed reproduces a run exactly.
//!
//! Strategies are resolved by exact name from a closed registry
//! ([`resolve_strategy`]); unknown names fail fast, before any navigation,
//! with the full list of valid names.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bandit::{BanditSnapshot, RlBandit};
use crate::candidates::ExploreCandidate;
use crate::config::ExploreConfig;
use crate::coverage::CoverageState;
use crate::error::ExploreError;
use crate::guided::{FlowLoader, GuidedCoverage};
use crate::random_walk::RandomWalk;
use crate::reward::RewardMode;
use crate::rng::ExploreRng;
use crate::set_cover::SetCoverGreedy;

/// What a strategy decided to do this step. `Stop` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreAction {
    /// Navigate to a collected candidate.
    Goto {
        url: String,
        target_path: String,
        reason: String,
        via: String,
    },
    /// Navigate back to the start URL.
    Restart { reason: String, via: String },
    /// End the run.
    Stop { reason: String },
}

impl ExploreAction {
    pub(crate) fn restart(reason: &str, via: &str) -> Self {
        ExploreAction::Restart {
            reason: reason.to_string(),
            via: via.to_string(),
        }
    }

    pub(crate) fn goto_candidate(candidate: &ExploreCandidate, reason: String) -> Self {
        ExploreAction::Goto {
            url: candidate.abs.clone(),
            target_path: candidate.path.clone(),
            reason,
            via: "goto(link)".to_string(),
        }
    }
}

/// Coverage delta attributed to one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainCounts {
    pub new_pages: u32,
    pub new_routes: u32,
    pub new_apis: u32,
    pub new_assets: u32,
}

/// Which error classes a step triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFlags {
    pub http_status_ge_400: bool,
    pub pageerror: bool,
    pub console_error: bool,
}

impl ErrorFlags {
    #[must_use]
    pub fn any(self) -> bool {
        self.http_status_ge_400 || self.pageerror || self.console_error
    }
}

/// Feedback record for one completed navigation step (restarts included).
///
/// Produced by the run loop once the destination page's coverage is known;
/// consumed by a strategy's feedback hook (notably the bandit).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFeedback {
    pub from_path: String,
    pub to_path: String,
    pub reward: f64,
    pub gain: GainCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorFlags>,
    pub revisited: bool,
    pub recent_loop: bool,
    pub step_index: u64,
    pub reward_mode: RewardMode,
}

/// Candidate-collection behavior requested by a strategy.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePolicy {
    pub limit: usize,
    pub dedupe_by_path: bool,
    pub skip_self: bool,
    pub skip_before_slice: bool,
}

/// Result of a strategy's `init` hook.
#[derive(Debug, Clone, Default)]
pub struct InitOutcome {
    /// Paths the strategy is biased to reach first.
    pub target_set: Option<BTreeSet<String>>,
    /// Start-path override (e.g. from a flow specification).
    pub start_path: Option<String>,
}

/// Read-only view of the run handed to `next_action`, plus the step RNG.
pub struct StepContext<'a> {
    pub config: &'a ExploreConfig,
    pub rng: &'a mut ExploreRng,
    pub current_path: &'a str,
    pub candidates: &'a [ExploreCandidate],
    pub coverage: &'a CoverageState,
    pub visited: &'a BTreeSet<String>,
    pub recent: &'a [String],
    pub target_set: Option<&'a BTreeSet<String>>,
    pub step_index: u64,
}

/// A navigation policy. See the module docs for the ownership contract.
pub trait Strategy: std::fmt::Debug {
    /// Registry name (`random-walk`, `guided-coverage`, ...).
    fn name(&self) -> &'static str;

    /// Collection flags for this strategy's candidate lists.
    fn candidate_policy(&self) -> CandidatePolicy;

    /// One-time setup before the first navigation. The default does nothing.
    fn init(
        &mut self,
        _config: &ExploreConfig,
        _flow: &mut dyn FlowLoader,
    ) -> Result<InitOutcome, ExploreError> {
        Ok(InitOutcome::default())
    }

    /// Decide the next action for the current step.
    fn next_action(&mut self, ctx: &mut StepContext<'_>) -> ExploreAction;

    /// Observe the feedback for a completed step. The default ignores it.
    fn on_feedback(&mut self, _feedback: &StepFeedback) {}

    /// Run teardown (e.g. a final model flush). The default does nothing.
    fn on_end(&mut self) {}

    /// Observability hook: learned-policy snapshot, when the strategy has one.
    fn bandit_snapshot(&self) -> Option<BanditSnapshot> {
        None
    }
}

/// Scheduled restart shared by the guided, set-cover, and bandit strategies:
/// fires every `restart_every` recorded steps (never on step 0).
#[must_use]
pub(crate) fn scheduled_restart(step_index: u64, restart_every: u32) -> Option<ExploreAction> {
    if restart_every > 0 && step_index > 0 && step_index % u64::from(restart_every) == 0 {
        return Some(ExploreAction::restart("scheduled", "goto(restart)"));
    }
    None
}

/// Dead-end restart: no candidates on the current page.
#[must_use]
pub(crate) fn dead_end_restart() -> ExploreAction {
    ExploreAction::restart("dead-end", "goto(start)")
}

/// Sorted names accepted by [`resolve_strategy`].
pub const STRATEGY_NAMES: [&str; 4] = [
    "guided-coverage",
    "random-walk",
    "rl-bandit",
    "set-cover-greedy",
];

/// Resolve a strategy by exact name.
///
/// Fails eagerly (before any navigation) on unknown names, listing the
/// valid alternatives.
pub fn resolve_strategy(
    name: &str,
    config: &ExploreConfig,
) -> Result<Box<dyn Strategy>, ExploreError> {
    match name {
        "random-walk" => Ok(Box::new(RandomWalk::new())),
        "guided-coverage" => Ok(Box::new(GuidedCoverage::new())),
        "set-cover-greedy" => Ok(Box::new(SetCoverGreedy::new())),
        "rl-bandit" => Ok(Box::new(RlBandit::new(
            config.bandit.clone(),
            config.reward_mode,
        ))),
        other => Err(ExploreError::Config(format!(
            "unknown strategy `{other}`; available: {}",
            STRATEGY_NAMES.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExploreConfig;

    #[test]
    fn registry_resolves_all_known_names() {
        let config = ExploreConfig::default();
        for name in STRATEGY_NAMES {
            let s = resolve_strategy(name, &config).unwrap();
            assert_eq!(s.name(), name);
        }
    }

    #[test]
    fn registry_rejects_unknown_names_listing_alternatives() {
        let config = ExploreConfig::default();
        let err = resolve_strategy("depth-first", &config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("depth-first"));
        for name in STRATEGY_NAMES {
            assert!(msg.contains(name), "missing {name} in: {msg}");
        }
    }

    #[test]
    fn scheduled_restart_respects_cadence() {
        assert!(scheduled_restart(0, 2).is_none());
        assert!(scheduled_restart(1, 2).is_none());
        assert!(scheduled_restart(2, 2).is_some());
        assert!(scheduled_restart(4, 2).is_some());
        assert!(scheduled_restart(3, 0).is_none());
    }

    #[test]
    fn error_flags_any() {
        assert!(!ErrorFlags::default().any());
        assert!(ErrorFlags {
            console_error: true,
            ..ErrorFlags::default()
        }
        .any());
    }

    #[test]
    fn step_feedback_serializes_camel_case() {
        let fb = StepFeedback {
            from_path: "/a".to_string(),
            to_path: "/b".to_string(),
            reward: 1.5,
            gain: GainCounts::default(),
            errors: None,
            revisited: false,
            recent_loop: true,
            step_index: 3,
            reward_mode: RewardMode::Coverage,
        };
        let json = serde_json::to_value(&fb).unwrap();
        assert_eq!(json["fromPath"], "/a");
        assert_eq!(json["recentLoop"], true);
        assert_eq!(json["rewardMode"], "coverage");
        assert!(json.get("errors").is_none());
    }
}
