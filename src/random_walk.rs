//! Uniform-random exploration.
//!
//! The baseline strategy: pick any current candidate with equal
//! probability, restart on dead ends. No target set, no dedupe, no memory.

use crate::strategy::{dead_end_restart, CandidatePolicy, ExploreAction, StepContext, Strategy};

/// Random-walk strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalk;

impl RandomWalk {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RandomWalk {
    fn name(&self) -> &'static str {
        "random-walk"
    }

    fn candidate_policy(&self) -> CandidatePolicy {
        CandidatePolicy {
            limit: 200,
            dedupe_by_path: false,
            skip_self: false,
            skip_before_slice: true,
        }
    }

    fn next_action(&mut self, ctx: &mut StepContext<'_>) -> ExploreAction {
        if ctx.candidates.is_empty() {
            return dead_end_restart();
        }
        let pick = &ctx.candidates[ctx.rng.next_index(ctx.candidates.len())];
        ExploreAction::goto_candidate(pick, "random-pick".to_string())
    }
}
