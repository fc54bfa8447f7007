//! Reward composition for step feedback.
//!
//! The run loop turns each navigation's coverage delta and error outcome
//! into a scalar reward for the learning strategies. The magnitudes are the
//! tuned-in-production defaults; they are plain config values, not
//! constants, so a harness can reshape the signal without forking the crate.

use serde::{Deserialize, Serialize};

use crate::strategy::GainCounts;

/// What the run is optimizing for.
///
/// `Bughunt` rewards error discovery (+`error_bonus`); `Coverage` penalizes
/// it (−`error_penalty`) and favors stable breadth-first discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardMode {
    #[default]
    Coverage,
    Bughunt,
}

impl RewardMode {
    /// Wire name, as stored in the bandit model file.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RewardMode::Coverage => "coverage",
            RewardMode::Bughunt => "bughunt",
        }
    }
}

/// Per-component reward weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardWeights {
    pub new_page: f64,
    pub new_route: f64,
    pub new_api: f64,
    pub new_asset: f64,
    pub revisit_penalty: f64,
    pub recent_loop_penalty: f64,
    /// Added when a step found an error under [`RewardMode::Bughunt`].
    pub error_bonus: f64,
    /// Subtracted when a step found an error under [`RewardMode::Coverage`].
    pub error_penalty: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            new_page: 2.0,
            new_route: 1.0,
            new_api: 0.5,
            new_asset: 0.2,
            revisit_penalty: 0.3,
            recent_loop_penalty: 0.6,
            error_bonus: 5.0,
            error_penalty: 3.0,
        }
    }
}

impl RewardWeights {
    /// Compose the scalar reward for one completed step.
    #[must_use]
    pub fn compose(
        &self,
        gain: &GainCounts,
        revisited: bool,
        recent_loop: bool,
        found_error: bool,
        mode: RewardMode,
    ) -> f64 {
        let mut reward = self.new_page * gain.new_pages as f64
            + self.new_route * gain.new_routes as f64
            + self.new_api * gain.new_apis as f64
            + self.new_asset * gain.new_assets as f64;
        if revisited {
            reward -= self.revisit_penalty;
        }
        if recent_loop {
            reward -= self.recent_loop_penalty;
        }
        if found_error {
            reward += match mode {
                RewardMode::Bughunt => self.error_bonus,
                RewardMode::Coverage => -self.error_penalty,
            };
        }
        reward
    }
}
