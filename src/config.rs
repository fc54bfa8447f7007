//! Run configuration.
//!
//! Plain values only — how they get populated (env, CLI, config file) is
//! the harness's business. Defaults mirror the production harness:
//! two-minute runs, restart every 15 steps, coverage-mode rewards.

use serde::{Deserialize, Serialize};

use crate::bandit::RlBanditOptions;
use crate::driver::NoiseFilter;
use crate::reward::{RewardMode, RewardWeights};

/// Configuration for one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreConfig {
    /// Origin anchor and base for resolving the start path.
    pub base_url: String,
    /// Path navigated to first and on every restart.
    pub start_path: String,
    /// Wall-clock budget; the loop stops cleanly at the deadline.
    pub seconds: u64,
    /// RNG seed; recorded in run artifacts so failures replay exactly.
    pub seed: u32,
    /// Force a restart every N recorded steps (0 disables).
    pub restart_every: u32,
    /// Registry name of the active strategy.
    pub strategy: String,
    /// What the reward signal optimizes for.
    #[serde(default)]
    pub reward_mode: RewardMode,
    /// Optional path-prefix allowlist for candidates (`/` allows all).
    #[serde(default)]
    pub allowed_path_prefixes: Option<Vec<String>>,
    /// Optional step budget on top of the deadline (`None` = deadline only).
    #[serde(default)]
    pub max_steps: Option<u64>,
    /// Bandit hyperparameters (only read by the `rl-bandit` strategy).
    #[serde(default)]
    pub bandit: RlBanditOptions,
    /// Reward composition weights.
    #[serde(default)]
    pub reward_weights: RewardWeights,
    /// Console-noise policy for error classification.
    #[serde(default)]
    pub noise: NoiseFilter,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            start_path: "/".to_string(),
            seconds: 120,
            seed: 1,
            restart_every: 15,
            strategy: "random-walk".to_string(),
            reward_mode: RewardMode::Coverage,
            allowed_path_prefixes: None,
            max_steps: None,
            bandit: RlBanditOptions::default(),
            reward_weights: RewardWeights::default(),
            noise: NoiseFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_harness_conventions() {
        let cfg = ExploreConfig::default();
        assert_eq!(cfg.seconds, 120);
        assert_eq!(cfg.restart_every, 15);
        assert_eq!(cfg.strategy, "random-walk");
        assert_eq!(cfg.reward_mode, RewardMode::Coverage);
        assert!(cfg.max_steps.is_none());
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ExploreConfig {
            allowed_path_prefixes: Some(vec!["/docs".to_string()]),
            max_steps: Some(40),
            ..ExploreConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"baseUrl\""));
        assert!(json.contains("\"restartEvery\""));
        let back: ExploreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_steps, Some(40));
        assert_eq!(back.allowed_path_prefixes, Some(vec!["/docs".to_string()]));
    }
}
