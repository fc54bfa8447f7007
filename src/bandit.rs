//! Per-state multi-armed bandit over navigation choices.
//!
//! Each from-path is an independent bandit problem whose arms are the
//! to-paths seen from it. The learner is seedless itself — selection draws
//! come from the run's RNG stream — and is owned by the `rl-bandit`
//! strategy instance, so concurrent runs stay isolated.
//!
//! The learned table persists as a versioned JSON document. Loads that fail
//! to parse (or carry an unknown version) silently fall back to an empty
//! model; saves go through a temp file and an atomic rename so readers
//! never observe a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::candidates::ExploreCandidate;
use crate::config::ExploreConfig;
use crate::error::ExploreError;
use crate::guided::FlowLoader;
use crate::reward::RewardMode;
use crate::rng::ExploreRng;
use crate::strategy::{
    dead_end_restart, scheduled_restart, CandidatePolicy, ExploreAction, InitOutcome, StepContext,
    StepFeedback, Strategy,
};

/// Selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BanditAlgo {
    #[default]
    #[serde(rename = "ucb1")]
    Ucb1,
    #[serde(rename = "eps-greedy")]
    EpsGreedy,
}

/// Bandit hyperparameters and persistence knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RlBanditOptions {
    pub algo: BanditAlgo,
    /// Exploration probability for `eps-greedy`.
    pub eps: f64,
    /// Exploration coefficient for UCB1.
    pub ucb_c: f64,
    /// Persist the model to `model_path` (off by default).
    pub persist: bool,
    pub model_path: PathBuf,
    /// Ignore any existing model file on init.
    pub reset: bool,
    /// Per-state arm-table cap; lowest `(pulls, mean)` arms are evicted.
    pub max_arms_per_state: usize,
    /// Persist after this many feedback events (1 = every event).
    pub persist_every: u32,
}

impl Default for RlBanditOptions {
    fn default() -> Self {
        Self {
            algo: BanditAlgo::Ucb1,
            eps: 0.1,
            ucb_c: 1.2,
            persist: false,
            model_path: PathBuf::from("rl-bandit-model.json"),
            reset: false,
            max_arms_per_state: 500,
            persist_every: 10,
        }
    }
}

/// One arm's pull count and running mean reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub n: u64,
    pub mean: f64,
}

impl Default for ArmStats {
    fn default() -> Self {
        Self { n: 0, mean: 0.0 }
    }
}

/// Model hyperparameters as persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanditParams {
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default = "default_ucb_c")]
    pub ucb_c: f64,
    #[serde(default)]
    pub reward_mode: RewardMode,
}

fn default_eps() -> f64 {
    0.1
}

fn default_ucb_c() -> f64 {
    1.2
}

impl Default for BanditParams {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            ucb_c: default_ucb_c(),
            reward_mode: RewardMode::default(),
        }
    }
}

const MODEL_VERSION: u32 = 1;

/// Persisted model document (schema version 1, camelCase fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanditModel {
    pub version: u32,
    #[serde(default)]
    pub algo: BanditAlgo,
    #[serde(default)]
    pub params: BanditParams,
    #[serde(default)]
    pub table: BTreeMap<String, BTreeMap<String, ArmStats>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Why a model save failed. Recovered locally (logged, never propagated).
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialize model: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write model: {0}")]
    Io(#[from] std::io::Error),
    #[error("replace model file: {0}")]
    Rename(#[from] tempfile::PersistError),
}

/// Best arm of one state, by running mean.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestArm {
    pub path: String,
    pub mean: f64,
    pub pulls: u64,
}

/// Per-state rollup in a snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub state: String,
    pub arms: usize,
    pub total_pulls: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_arm: Option<BestArm>,
}

/// Whole-model rollup in a snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub states: usize,
    pub total_arms: usize,
    pub total_pulls: u64,
    pub max_arms_per_state: usize,
}

/// Deep copy of the learned policy plus summaries, for reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanditSnapshot {
    pub algo: BanditAlgo,
    pub params: BanditParams,
    pub created_at: String,
    pub updated_at: String,
    pub summary: SnapshotSummary,
    pub states: Vec<StateSummary>,
    pub table: BTreeMap<String, BTreeMap<String, ArmStats>>,
}

/// Online per-state bandit with optional disk persistence.
#[derive(Debug, Clone)]
pub struct RlBanditLearner {
    options: RlBanditOptions,
    model: BanditModel,
    feedback_since_persist: u32,
}

impl RlBanditLearner {
    #[must_use]
    pub fn new(options: RlBanditOptions, reward_mode: RewardMode) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let model = BanditModel {
            version: MODEL_VERSION,
            algo: options.algo,
            params: BanditParams {
                eps: options.eps,
                ucb_c: options.ucb_c,
                reward_mode,
            },
            table: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        Self {
            options,
            model,
            feedback_since_persist: 0,
        }
    }

    /// Hydrate from the model file when persistence is on and `reset` is
    /// off. Any read/parse failure or version mismatch keeps the fresh
    /// in-memory model — hydration never fails the run.
    pub fn init(&mut self) {
        if !self.options.persist || self.options.reset {
            return;
        }
        let raw = match fs::read_to_string(&self.options.model_path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.options.model_path.display(), error = %e, "no bandit model to hydrate");
                return;
            }
        };
        match serde_json::from_str::<BanditModel>(&raw) {
            Ok(loaded) if loaded.version == MODEL_VERSION => {
                let created_at = if loaded.created_at.is_empty() {
                    self.model.created_at.clone()
                } else {
                    loaded.created_at.clone()
                };
                self.model = BanditModel {
                    created_at,
                    ..loaded
                };
            }
            Ok(loaded) => {
                debug!(version = loaded.version, "bandit model version mismatch; starting empty");
            }
            Err(e) => {
                debug!(error = %e, "bandit model unparseable; starting empty");
            }
        }
    }

    #[must_use]
    pub fn model(&self) -> &BanditModel {
        &self.model
    }

    fn arm_stats(&self, from_path: &str, to_path: &str) -> ArmStats {
        self.model
            .table
            .get(from_path)
            .and_then(|state| state.get(to_path))
            .copied()
            .unwrap_or_default()
    }

    fn pick_by_ucb<'a>(
        &self,
        from_path: &str,
        candidates: &'a [ExploreCandidate],
        rng: &mut ExploreRng,
    ) -> Option<&'a ExploreCandidate> {
        let stats: Vec<ArmStats> = candidates
            .iter()
            .map(|c| self.arm_stats(from_path, &c.path))
            .collect();

        // Forced exploration: any untried arm beats every tried one.
        let untried: Vec<&ExploreCandidate> = candidates
            .iter()
            .zip(&stats)
            .filter(|(_, s)| s.n == 0)
            .map(|(c, _)| c)
            .collect();
        if !untried.is_empty() {
            return Some(untried[rng.next_index(untried.len())]);
        }

        let total_pulls: u64 = 1 + stats.iter().map(|s| s.n).sum::<u64>();
        let mut best_score = f64::NEG_INFINITY;
        let mut best: Vec<&ExploreCandidate> = Vec::new();
        for (candidate, stat) in candidates.iter().zip(&stats) {
            let bonus = self.model.params.ucb_c
                * ((total_pulls as f64).ln() / stat.n as f64).sqrt();
            let score = stat.mean + bonus;
            if score > best_score {
                best_score = score;
                best.clear();
                best.push(candidate);
            } else if score == best_score {
                best.push(candidate);
            }
        }
        best.get(rng.next_index(best.len())).copied()
    }

    fn pick_by_eps_greedy<'a>(
        &self,
        from_path: &str,
        candidates: &'a [ExploreCandidate],
        rng: &mut ExploreRng,
    ) -> Option<&'a ExploreCandidate> {
        if candidates.len() == 1 {
            return candidates.first();
        }
        if rng.next() < self.model.params.eps {
            return Some(&candidates[rng.next_index(candidates.len())]);
        }

        let mut best_mean = f64::NEG_INFINITY;
        let mut best: Vec<&ExploreCandidate> = Vec::new();
        for candidate in candidates {
            let mean = self.arm_stats(from_path, &candidate.path).mean;
            if mean > best_mean {
                best_mean = mean;
                best.clear();
                best.push(candidate);
            } else if mean == best_mean {
                best.push(candidate);
            }
        }
        best.get(rng.next_index(best.len())).copied()
    }

    /// Choose a candidate for the given state. `None` only on empty input.
    pub fn select<'a>(
        &self,
        from_path: &str,
        candidates: &'a [ExploreCandidate],
        rng: &mut ExploreRng,
    ) -> Option<&'a ExploreCandidate> {
        if candidates.is_empty() {
            return None;
        }
        match self.model.algo {
            BanditAlgo::Ucb1 => self.pick_by_ucb(from_path, candidates, rng),
            BanditAlgo::EpsGreedy => self.pick_by_eps_greedy(from_path, candidates, rng),
        }
    }

    /// Fold one step's reward into the `(from, to)` arm, prune the state's
    /// table if it outgrew the cap, and persist on cadence.
    pub fn on_feedback(&mut self, feedback: &StepFeedback) {
        let state = self
            .model
            .table
            .entry(feedback.from_path.clone())
            .or_default();
        let arm = state.entry(feedback.to_path.clone()).or_default();
        let next_n = arm.n + 1;
        arm.mean += (feedback.reward - arm.mean) / next_n as f64;
        arm.n = next_n;
        self.model.updated_at = chrono::Utc::now().to_rfc3339();
        self.feedback_since_persist += 1;
        self.prune_state(&feedback.from_path);
        self.persist_if_due(false);
    }

    fn prune_state(&mut self, from_path: &str) {
        let max = self.options.max_arms_per_state;
        let Some(state) = self.model.table.get_mut(from_path) else {
            return;
        };
        if state.len() <= max {
            return;
        }
        let mut entries: Vec<(String, ArmStats)> =
            state.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| {
            a.1.n
                .cmp(&b.1.n)
                .then_with(|| a.1.mean.partial_cmp(&b.1.mean).unwrap_or(std::cmp::Ordering::Equal))
        });
        for (to_path, _) in entries.iter().take(entries.len() - max) {
            state.remove(to_path);
        }
    }

    fn persist_if_due(&mut self, force: bool) {
        if !self.options.persist {
            return;
        }
        if !force && self.feedback_since_persist < self.options.persist_every {
            return;
        }
        self.feedback_since_persist = 0;
        if let Err(e) = self.write_model() {
            // A failed save must not crash the run or touch the in-memory
            // model; the next due persist retries from scratch.
            warn!(path = %self.options.model_path.display(), error = %e, "bandit model save failed");
        }
    }

    fn write_model(&self) -> Result<(), PersistenceError> {
        let dir = parent_dir(&self.options.model_path);
        fs::create_dir_all(&dir)?;
        let payload = serde_json::to_string_pretty(&self.model)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(payload.as_bytes())?;
        tmp.persist(&self.options.model_path)?;
        Ok(())
    }

    /// Forced final flush.
    pub fn on_end(&mut self) {
        self.persist_if_due(true);
    }

    /// Deep copy of the table with per-state and whole-model rollups.
    #[must_use]
    pub fn snapshot(&self) -> BanditSnapshot {
        let table = self.model.table.clone();
        let mut states = Vec::with_capacity(table.len());
        let mut total_arms = 0usize;
        let mut total_pulls = 0u64;
        for (state, arms) in &table {
            let mut best: Option<BestArm> = None;
            let mut state_pulls = 0u64;
            for (path, stats) in arms {
                state_pulls += stats.n;
                let better = best.as_ref().map_or(true, |b| stats.mean > b.mean);
                if better {
                    best = Some(BestArm {
                        path: path.clone(),
                        mean: stats.mean,
                        pulls: stats.n,
                    });
                }
            }
            total_arms += arms.len();
            total_pulls += state_pulls;
            states.push(StateSummary {
                state: state.clone(),
                arms: arms.len(),
                total_pulls: state_pulls,
                best_arm: best,
            });
        }
        BanditSnapshot {
            algo: self.model.algo,
            params: self.model.params,
            created_at: self.model.created_at.clone(),
            updated_at: self.model.updated_at.clone(),
            summary: SnapshotSummary {
                states: states.len(),
                total_arms,
                total_pulls,
                max_arms_per_state: self.options.max_arms_per_state,
            },
            states,
            table,
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// The `rl-bandit` strategy: scheduled-restart/dead-end handling around the
/// learner's selection, with feedback and end-of-run flush wired through.
#[derive(Debug, Clone)]
pub struct RlBandit {
    learner: RlBanditLearner,
}

impl RlBandit {
    #[must_use]
    pub fn new(options: RlBanditOptions, reward_mode: RewardMode) -> Self {
        Self {
            learner: RlBanditLearner::new(options, reward_mode),
        }
    }

    #[must_use]
    pub fn learner(&self) -> &RlBanditLearner {
        &self.learner
    }
}

impl Strategy for RlBandit {
    fn name(&self) -> &'static str {
        "rl-bandit"
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
        _flow: &mut dyn FlowLoader,
    ) -> Result<InitOutcome, ExploreError> {
        self.learner.init();
        Ok(InitOutcome::default())
    }

    fn next_action(&mut self, ctx: &mut StepContext<'_>) -> ExploreAction {
        if let Some(restart) = scheduled_restart(ctx.step_index, ctx.config.restart_every) {
            return restart;
        }
        if ctx.candidates.is_empty() {
            return dead_end_restart();
        }
        match self.learner.select(ctx.current_path, ctx.candidates, ctx.rng) {
            Some(pick) => ExploreAction::goto_candidate(pick, "rl-bandit-pick".to_string()),
            None => dead_end_restart(),
        }
    }

    fn on_feedback(&mut self, feedback: &StepFeedback) {
        self.learner.on_feedback(feedback);
    }

    fn on_end(&mut self) {
        self.learner.on_end();
    }

    fn bandit_snapshot(&self) -> Option<BanditSnapshot> {
        Some(self.learner.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::GainCounts;
    use proptest::prelude::*;

    fn candidate(path: &str) -> ExploreCandidate {
        ExploreCandidate {
            href: path.to_string(),
            abs: format!("http://example.com{path}"),
            path: path.to_string(),
        }
    }

    fn feedback(from: &str, to: &str, reward: f64) -> StepFeedback {
        StepFeedback {
            from_path: from.to_string(),
            to_path: to.to_string(),
            reward,
            gain: GainCounts::default(),
            errors: None,
            revisited: false,
            recent_loop: false,
            step_index: 0,
            reward_mode: RewardMode::Coverage,
        }
    }

    fn memory_options() -> RlBanditOptions {
        RlBanditOptions {
            persist: false,
            persist_every: 1,
            ..RlBanditOptions::default()
        }
    }

    #[test]
    fn prefers_untried_arms_then_ucb1_score() {
        let mut learner = RlBanditLearner::new(memory_options(), RewardMode::Coverage);
        learner.init();

        learner.on_feedback(&feedback("/from", "/a", 1.0));
        learner.on_feedback(&feedback("/from", "/a", 1.0));
        learner.on_feedback(&feedback("/from", "/b", 3.0));
        learner.on_feedback(&feedback("/from", "/b", 2.0));

        let candidates = vec![candidate("/a"), candidate("/b"), candidate("/c")];

        let mut rng = ExploreRng::new(7);
        let pick = learner.select("/from", &candidates, &mut rng).unwrap();
        assert_eq!(pick.path, "/c");

        // Once every arm has pulls, the highest UCB score wins.
        learner.on_feedback(&feedback("/from", "/c", 0.5));
        let mut rng = ExploreRng::new(11);
        let pick = learner.select("/from", &candidates, &mut rng).unwrap();
        assert_eq!(pick.path, "/b");
    }

    #[test]
    fn incremental_mean_and_count() {
        let mut learner = RlBanditLearner::new(memory_options(), RewardMode::Coverage);
        learner.on_feedback(&feedback("/state", "/next", 1.0));
        learner.on_feedback(&feedback("/state", "/next", 3.0));

        let stats = learner.model().table["/state"]["/next"];
        assert_eq!(stats.n, 2);
        assert!((stats.mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn eps_greedy_exploits_best_mean_when_not_exploring() {
        let options = RlBanditOptions {
            algo: BanditAlgo::EpsGreedy,
            eps: 0.0, // never explore: pure exploitation
            ..memory_options()
        };
        let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
        learner.on_feedback(&feedback("/s", "/low", 0.1));
        learner.on_feedback(&feedback("/s", "/high", 4.0));

        let candidates = vec![candidate("/low"), candidate("/high")];
        let mut rng = ExploreRng::new(3);
        let pick = learner.select("/s", &candidates, &mut rng).unwrap();
        assert_eq!(pick.path, "/high");
    }

    #[test]
    fn eps_greedy_single_candidate_short_circuits() {
        let options = RlBanditOptions {
            algo: BanditAlgo::EpsGreedy,
            eps: 1.0,
            ..memory_options()
        };
        let learner = RlBanditLearner::new(options, RewardMode::Coverage);
        let candidates = vec![candidate("/only")];
        let mut rng = ExploreRng::new(1);
        assert_eq!(
            learner.select("/s", &candidates, &mut rng).unwrap().path,
            "/only"
        );
    }

    #[test]
    fn select_on_empty_candidates_is_none() {
        let learner = RlBanditLearner::new(memory_options(), RewardMode::Coverage);
        let mut rng = ExploreRng::new(1);
        assert!(learner.select("/s", &[], &mut rng).is_none());
    }

    #[test]
    fn prunes_lowest_pull_lowest_mean_arms_first() {
        let options = RlBanditOptions {
            max_arms_per_state: 2,
            ..memory_options()
        };
        let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
        learner.on_feedback(&feedback("/s", "/keep-hot", 5.0));
        learner.on_feedback(&feedback("/s", "/keep-hot", 5.0));
        learner.on_feedback(&feedback("/s", "/keep-warm", 2.0));
        learner.on_feedback(&feedback("/s", "/evict-cold", 0.1));
        // Third arm pushed the table over the cap of 2; /evict-cold and
        // /keep-warm both have n=1, the lower mean goes first.
        let state = &learner.model().table["/s"];
        assert_eq!(state.len(), 2);
        assert!(state.contains_key("/keep-hot"));
        assert!(state.contains_key("/keep-warm"));
        assert!(!state.contains_key("/evict-cold"));
    }

    #[test]
    fn saves_and_reloads_model_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("bandit-model.json");
        let options = RlBanditOptions {
            persist: true,
            persist_every: 1,
            model_path: model_path.clone(),
            ..RlBanditOptions::default()
        };

        let mut learner = RlBanditLearner::new(options.clone(), RewardMode::Coverage);
        learner.init();
        learner.on_feedback(&feedback("/s", "/t", 4.0));
        learner.on_end();

        let raw = fs::read_to_string(&model_path).unwrap();
        assert!(raw.contains("/t"));
        assert!(raw.contains("\"version\": 1"));

        let mut reloaded = RlBanditLearner::new(options, RewardMode::Coverage);
        reloaded.init();
        let stats = reloaded.model().table["/s"]["/t"];
        assert_eq!(stats.n, 1);
        assert!((stats.mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn tolerates_broken_json_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("broken-model.json");
        fs::write(&model_path, "{not-json").unwrap();

        let options = RlBanditOptions {
            persist: true,
            model_path,
            ..RlBanditOptions::default()
        };
        let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
        learner.init();
        assert!(learner.model().table.is_empty());
    }

    #[test]
    fn ignores_version_mismatched_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("v2-model.json");
        fs::write(
            &model_path,
            r#"{"version":2,"algo":"ucb1","table":{"/s":{"/t":{"n":9,"mean":1.0}}}}"#,
        )
        .unwrap();

        let options = RlBanditOptions {
            persist: true,
            model_path,
            ..RlBanditOptions::default()
        };
        let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
        learner.init();
        assert!(learner.model().table.is_empty());
    }

    #[test]
    fn reset_skips_hydration() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let options = RlBanditOptions {
            persist: true,
            persist_every: 1,
            model_path: model_path.clone(),
            ..RlBanditOptions::default()
        };
        let mut learner = RlBanditLearner::new(options.clone(), RewardMode::Coverage);
        learner.on_feedback(&feedback("/s", "/t", 1.0));
        learner.on_end();

        let reset_options = RlBanditOptions {
            reset: true,
            ..options
        };
        let mut fresh = RlBanditLearner::new(reset_options, RewardMode::Coverage);
        fresh.init();
        assert!(fresh.model().table.is_empty());
    }

    #[test]
    fn save_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the model path makes the final rename fail.
        let model_path = dir.path().join("model-as-dir");
        fs::create_dir_all(&model_path).unwrap();

        let options = RlBanditOptions {
            persist: true,
            persist_every: 1,
            model_path,
            ..RlBanditOptions::default()
        };
        let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
        learner.on_feedback(&feedback("/s", "/t", 1.0));
        learner.on_end();
        // In-memory model is intact despite the failed writes.
        assert_eq!(learner.model().table["/s"]["/t"].n, 1);
    }

    #[test]
    fn snapshot_summarizes_states_and_best_arms() {
        let mut learner = RlBanditLearner::new(memory_options(), RewardMode::Coverage);
        learner.on_feedback(&feedback("/s", "/a", 1.0));
        learner.on_feedback(&feedback("/s", "/b", 3.0));
        learner.on_feedback(&feedback("/other", "/c", 2.0));

        let snap = learner.snapshot();
        assert_eq!(snap.summary.states, 2);
        assert_eq!(snap.summary.total_arms, 3);
        assert_eq!(snap.summary.total_pulls, 3);
        let s = snap.states.iter().find(|s| s.state == "/s").unwrap();
        assert_eq!(s.best_arm.as_ref().unwrap().path, "/b");
    }

    proptest! {
        #[test]
        fn table_never_exceeds_cap_and_means_stay_finite(
            cap in 1usize..6,
            rewards in prop::collection::vec((0usize..10, -5.0f64..5.0f64), 0..80),
        ) {
            let options = RlBanditOptions {
                max_arms_per_state: cap,
                ..memory_options()
            };
            let mut learner = RlBanditLearner::new(options, RewardMode::Coverage);
            for (arm, reward) in rewards {
                learner.on_feedback(&feedback("/s", &format!("/arm{arm}"), reward));
            }
            if let Some(state) = learner.model().table.get("/s") {
                prop_assert!(state.len() <= cap);
                for stats in state.values() {
                    prop_assert!(stats.mean.is_finite());
                }
            }
        }

        #[test]
        fn select_always_returns_a_member(
            seed in any::<u32>(),
            pulls in prop::collection::vec((0usize..4, 0.0f64..3.0f64), 0..20),
        ) {
            let mut learner = RlBanditLearner::new(memory_options(), RewardMode::Coverage);
            let candidates: Vec<ExploreCandidate> =
                (0..4).map(|i| candidate(&format!("/c{i}"))).collect();
            for (arm, reward) in pulls {
                learner.on_feedback(&feedback("/s", &format!("/c{arm}"), reward));
            }
            let mut rng = ExploreRng::new(seed);
            let pick = learner.select("/s", &candidates, &mut rng).unwrap();
            prop_assert!(candidates.iter().any(|c| c.path == pick.path));
        }
    }
}
