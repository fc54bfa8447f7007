//! Coverage bookkeeping and set-cover-style gain estimation.
//!
//! A [`CoverageState`] records which tagged surface tokens (`route:`,
//! `api:`, `asset:`) each visited page exposed, and how many distinct pages
//! exposed each token (document frequency). Mutation happens only through
//! the state's own methods, driven by the run loop; the gain helpers are
//! pure queries so strategies can score candidates without touching state.

use std::collections::{BTreeMap, BTreeSet};

use crate::candidates::ExploreCandidate;

/// A string-tagged observation token: `route:<path>`, `api:<METHOD> <path>`,
/// or `asset:<path>`. Uniqueness is exact string equality.
pub type CoverageItem = String;

/// Build a `route:` item for a normalized path.
#[must_use]
pub fn route_item(path: &str) -> CoverageItem {
    format!("route:{path}")
}

/// Build an `api:` item for a method/path pair.
#[must_use]
pub fn api_item(method: &str, path: &str) -> CoverageItem {
    format!("api:{method} {path}")
}

/// Build an `asset:` item for a path.
#[must_use]
pub fn asset_item(path: &str) -> CoverageItem {
    format!("asset:{path}")
}

/// Counts of covered items by tag, used for gain snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagCounts {
    pub routes: u64,
    pub apis: u64,
    pub assets: u64,
}

/// Per-run mutable coverage aggregate.
///
/// Invariants: `df[x] <= page_count` for all `x`; `covered` is exactly the
/// key set of `df`.
#[derive(Debug, Clone, Default)]
pub struct CoverageState {
    covered: BTreeSet<CoverageItem>,
    df: BTreeMap<CoverageItem, u64>,
    page_count: u64,
    path_to_observed: BTreeMap<String, BTreeSet<CoverageItem>>,
    candidate_seen_count: BTreeMap<String, u64>,
}

impl CoverageState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed page: bumps `page_count`, stores the page's
    /// observation set (last write wins per path), and folds each item into
    /// `covered`/document frequency.
    pub fn update(&mut self, path: &str, observed: &BTreeSet<CoverageItem>) {
        self.page_count += 1;
        self.path_to_observed
            .insert(path.to_string(), observed.clone());
        for item in observed {
            self.covered.insert(item.clone());
            *self.df.entry(item.clone()).or_insert(0) += 1;
        }
    }

    /// Bump the exposure counter for every candidate in this step's list.
    pub fn record_candidates_seen(&mut self, candidates: &[ExploreCandidate]) {
        for candidate in candidates {
            *self
                .candidate_seen_count
                .entry(candidate.path.clone())
                .or_insert(0) += 1;
        }
    }

    #[must_use]
    pub fn covered(&self) -> &BTreeSet<CoverageItem> {
        &self.covered
    }

    #[must_use]
    pub fn document_frequency(&self, item: &str) -> u64 {
        self.df.get(item).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    #[must_use]
    pub fn observed_for_path(&self, path: &str) -> Option<&BTreeSet<CoverageItem>> {
        self.path_to_observed.get(path)
    }

    #[must_use]
    pub fn candidate_seen_count(&self, path: &str) -> u64 {
        self.candidate_seen_count.get(path).copied().unwrap_or(0)
    }

    /// Forge a cached observation set without touching `covered`/df.
    /// Test seam for exercising gain estimation against stale caches.
    #[cfg(test)]
    pub(crate) fn force_observed_for_path(&mut self, path: &str, observed: &BTreeSet<CoverageItem>) {
        self.path_to_observed
            .insert(path.to_string(), observed.clone());
    }

    /// Covered-item counts by tag. Cheap snapshot input for the run loop's
    /// before/after gain computation.
    #[must_use]
    pub fn tag_counts(&self) -> TagCounts {
        let mut counts = TagCounts::default();
        for item in &self.covered {
            if item.starts_with("route:") {
                counts.routes += 1;
            } else if item.starts_with("api:") {
                counts.apis += 1;
            } else if item.starts_with("asset:") {
                counts.assets += 1;
            }
        }
        counts
    }
}

/// Inverse-frequency weight `1/(df+1)`; strictly decreasing in `df`.
#[must_use]
pub fn weight_for_df(df: u64) -> f64 {
    1.0 / (df as f64 + 1.0)
}

/// Expected observation set for a candidate: the last known set for a
/// visited path, else the guaranteed-minimum `{route:<path>}`.
#[must_use]
pub fn estimate_coverage_for_candidate(
    candidate: &ExploreCandidate,
    coverage: &CoverageState,
) -> BTreeSet<CoverageItem> {
    if let Some(known) = coverage.observed_for_path(&candidate.path) {
        return known.clone();
    }
    let mut set = BTreeSet::new();
    set.insert(route_item(&candidate.path));
    set
}

/// Set-cover marginal gain: uncovered items contribute their inverse-df
/// weight, covered items contribute nothing.
#[must_use]
pub fn compute_gain(items: &BTreeSet<CoverageItem>, coverage: &CoverageState) -> f64 {
    let mut gain = 0.0;
    for item in items {
        if coverage.covered().contains(item) {
            continue;
        }
        gain += weight_for_df(coverage.document_frequency(item));
    }
    gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn items(list: &[&str]) -> BTreeSet<CoverageItem> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn candidate(path: &str) -> ExploreCandidate {
        ExploreCandidate {
            href: path.to_string(),
            abs: format!("http://example.com{path}"),
            path: path.to_string(),
        }
    }

    #[test]
    fn update_tracks_df_and_page_count() {
        let mut state = CoverageState::new();
        state.update("/a", &items(&["route:/a", "asset:/shared.js"]));
        state.update("/b", &items(&["route:/b", "asset:/shared.js"]));

        assert_eq!(state.page_count(), 2);
        assert_eq!(state.document_frequency("asset:/shared.js"), 2);
        assert_eq!(state.document_frequency("route:/a"), 1);
        assert_eq!(state.document_frequency("route:/missing"), 0);
        assert!(state.covered().contains("route:/b"));
    }

    #[test]
    fn update_is_last_write_wins_per_path() {
        let mut state = CoverageState::new();
        state.update("/a", &items(&["route:/a", "api:GET /api/x"]));
        state.update("/a", &items(&["route:/a"]));
        assert_eq!(state.observed_for_path("/a").unwrap(), &items(&["route:/a"]));
        // Coverage never shrinks even when the per-path set does.
        assert!(state.covered().contains("api:GET /api/x"));
    }

    #[test]
    fn weight_is_strictly_decreasing() {
        assert!(weight_for_df(0) > weight_for_df(2));
        assert!(weight_for_df(2) > weight_for_df(10));
    }

    #[test]
    fn gain_ignores_covered_items() {
        let mut state = CoverageState::new();
        state.update("/known", &items(&["route:/known"]));
        // df for route:/known is now 1 and it is covered.
        let gain = compute_gain(&items(&["route:/known", "asset:/bundle.js"]), &state);
        assert!((gain - weight_for_df(0)).abs() < 1e-12);
    }

    #[test]
    fn estimate_uses_known_observations_when_visited() {
        let mut state = CoverageState::new();
        state.update("/seen", &items(&["route:/seen", "asset:/app.js"]));
        let est = estimate_coverage_for_candidate(&candidate("/seen"), &state);
        assert_eq!(est, items(&["route:/seen", "asset:/app.js"]));

        let est = estimate_coverage_for_candidate(&candidate("/fresh"), &state);
        assert_eq!(est, items(&["route:/fresh"]));
    }

    #[test]
    fn tag_counts_split_by_prefix() {
        let mut state = CoverageState::new();
        state.update(
            "/a",
            &items(&["route:/a", "api:GET /api/x", "asset:/a.js", "asset:/b.js"]),
        );
        let counts = state.tag_counts();
        assert_eq!(
            counts,
            TagCounts {
                routes: 1,
                apis: 1,
                assets: 2
            }
        );
    }

    #[test]
    fn candidate_seen_counter_accumulates() {
        let mut state = CoverageState::new();
        let cands = vec![candidate("/x"), candidate("/y")];
        state.record_candidates_seen(&cands);
        state.record_candidates_seen(&cands[..1]);
        assert_eq!(state.candidate_seen_count("/x"), 2);
        assert_eq!(state.candidate_seen_count("/y"), 1);
        assert_eq!(state.candidate_seen_count("/z"), 0);
    }

    proptest! {
        #[test]
        fn df_never_exceeds_page_count(
            pages in prop::collection::vec(
                prop::collection::btree_set("(route:/[a-c]|asset:/[a-c])", 0..4),
                0..12,
            ),
        ) {
            let mut state = CoverageState::new();
            for (i, observed) in pages.iter().enumerate() {
                state.update(&format!("/p{i}"), observed);
            }
            for item in state.covered().clone() {
                prop_assert!(state.document_frequency(&item) <= state.page_count());
                prop_assert!(state.document_frequency(&item) >= 1);
            }
        }

        #[test]
        fn gain_is_nonnegative_and_zero_when_fully_covered(
            observed in prop::collection::btree_set("(route:|api:GET |asset:)/[a-d]", 0..8),
        ) {
            let empty = CoverageState::new();
            let g = compute_gain(&observed, &empty);
            prop_assert!(g >= 0.0);

            let mut full = CoverageState::new();
            full.update("/all", &observed);
            prop_assert_eq!(compute_gain(&observed, &full), 0.0);
        }
    }
}
