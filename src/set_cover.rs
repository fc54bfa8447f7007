//! Greedy marginal-gain exploration.
//!
//! `set-cover-greedy` scores each candidate by the inverse-df weight of the
//! coverage items it is expected to add (known observation set for visited
//! paths, `route:` minimum for fresh ones) and follows the best one. When
//! every candidate's marginal gain is zero the pick degrades to uniform
//! random, tagged `set-cover-fallback` so run logs show the degradation.

use crate::candidates::ExploreCandidate;
use crate::coverage::{compute_gain, estimate_coverage_for_candidate, CoverageState};
use crate::rng::ExploreRng;
use crate::strategy::{
    dead_end_restart, scheduled_restart, CandidatePolicy, ExploreAction, StepContext, Strategy,
};

struct GainPick<'a> {
    candidate: &'a ExploreCandidate,
    gain: f64,
    all_zero: bool,
}

fn pick_by_gain<'a>(
    pool: &[&'a ExploreCandidate],
    coverage: &CoverageState,
    rng: &mut ExploreRng,
) -> GainPick<'a> {
    let mut best_gain = f64::NEG_INFINITY;
    let mut all_zero = true;
    let mut best: Vec<(&ExploreCandidate, f64)> = Vec::new();

    for &candidate in pool {
        let items = estimate_coverage_for_candidate(candidate, coverage);
        let gain = compute_gain(&items, coverage);
        if gain > 0.0 {
            all_zero = false;
        }
        if gain > best_gain {
            best_gain = gain;
            best.clear();
            best.push((candidate, gain));
        } else if gain == best_gain {
            best.push((candidate, gain));
        }
    }

    let (candidate, gain) = best[rng.next_index(best.len())];
    GainPick {
        candidate,
        gain,
        all_zero,
    }
}

/// Set-cover-greedy strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetCoverGreedy;

impl SetCoverGreedy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SetCoverGreedy {
    fn name(&self) -> &'static str {
        "set-cover-greedy"
    }

    fn candidate_policy(&self) -> CandidatePolicy {
        CandidatePolicy {
            limit: 400,
            dedupe_by_path: true,
            skip_self: true,
            skip_before_slice: false,
        }
    }

    fn next_action(&mut self, ctx: &mut StepContext<'_>) -> ExploreAction {
        if let Some(restart) = scheduled_restart(ctx.step_index, ctx.config.restart_every) {
            return restart;
        }
        if ctx.candidates.is_empty() {
            return dead_end_restart();
        }

        let non_recent: Vec<&ExploreCandidate> = ctx
            .candidates
            .iter()
            .filter(|c| !ctx.recent.contains(&c.path))
            .collect();
        let pool: Vec<&ExploreCandidate> = if non_recent.is_empty() {
            ctx.candidates.iter().collect()
        } else {
            non_recent
        };

        let pick = pick_by_gain(&pool, ctx.coverage, ctx.rng);
        if pick.all_zero {
            let fallback = pool[ctx.rng.next_index(pool.len())];
            return ExploreAction::goto_candidate(fallback, "set-cover-fallback".to_string());
        }

        ExploreAction::goto_candidate(pick.candidate, format!("set-cover-gain:{:.4}", pick.gain))
    }
}
