//! The run loop / navigator.
//!
//! One run = one strictly sequential loop: process the current page's
//! observations into coverage, settle the previous step's feedback, collect
//! candidates, ask the strategy for an action, navigate, repeat until the
//! wall-clock deadline (or step budget) runs out or the strategy stops.
//!
//! Feedback for a step is deferred until the destination page's coverage
//! has been merged, so gain counts reflect what the navigation actually
//! uncovered. When a navigation fails, the in-flight feedback is finalized
//! immediately — error flags set — before the error propagates, so the
//! bandit still learns from the failing step. Artifacts (seed, history,
//! error log) are delivered to the sink on every run, failed ones included.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::bandit::BanditSnapshot;
use crate::candidates::{collect_candidates, normalize_path, CollectOptions};
use crate::config::ExploreConfig;
use crate::coverage::{api_item, asset_item, route_item, CoverageItem, CoverageState, TagCounts};
use crate::driver::{ArtifactSink, BrowserDriver, PageObservations, ResourceKind};
use crate::error::ExploreError;
use crate::guided::FlowLoader;
use crate::rng::ExploreRng;
use crate::strategy::{
    ErrorFlags, ExploreAction, GainCounts, StepContext, StepFeedback, Strategy,
};

/// Loop-avoidance window size.
const RECENT_WINDOW: usize = 5;

/// One dispatched navigation in the step log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub from: String,
    pub to: String,
    pub via: String,
}

/// Run parameters echoed into the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub base_url: String,
    pub seed: u32,
    pub seconds: u64,
    pub start_path: String,
    pub restart_every: u32,
    pub strategy: String,
    pub generated_at: String,
}

/// Summary of a successful run. Formatting and publishing are the
/// harness's job; this is plain data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreReport {
    pub meta: ReportMeta,
    pub targets_count: usize,
    pub visited_count: usize,
    /// Fraction of targets visited; 1.0 when there are no targets.
    pub coverage: f64,
    pub visited: Vec<String>,
    pub uncovered: Vec<String>,
    pub steps: Vec<StepRecord>,
    pub blocked_external_requests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandit: Option<BanditSnapshot>,
}

/// A step whose feedback waits for the destination page's coverage merge.
struct PendingFeedback {
    from_path: String,
    to_path: String,
    step_index: u64,
    revisited: bool,
    recent_loop: bool,
    counts_before: TagCounts,
    visited_count_before: u64,
    flags: ErrorFlags,
}

struct RunState {
    rng: ExploreRng,
    coverage: CoverageState,
    visited: BTreeSet<String>,
    recent: Vec<String>,
    history: Vec<String>,
    errors: Vec<String>,
    steps: Vec<StepRecord>,
    blocked: Vec<String>,
    pending: Option<PendingFeedback>,
    pending_obs: Option<PageObservations>,
    last_processed: Option<String>,
    last_nav_flags: ErrorFlags,
}

impl RunState {
    fn new(seed: u32) -> Self {
        Self {
            rng: ExploreRng::new(seed),
            coverage: CoverageState::new(),
            visited: BTreeSet::new(),
            recent: Vec::new(),
            history: Vec::new(),
            errors: Vec::new(),
            steps: Vec::new(),
            blocked: Vec::new(),
            pending: None,
            pending_obs: None,
            last_processed: None,
            last_nav_flags: ErrorFlags::default(),
        }
    }
}

/// Drive one exploration run to completion.
///
/// Returns the coverage report on clean termination (deadline, step budget,
/// or a `Stop` action). The first navigation-class error aborts the run and
/// propagates after pending feedback is settled and artifacts are attached.
pub fn run_explore(
    driver: &mut dyn BrowserDriver,
    strategy: &mut dyn Strategy,
    flow: &mut dyn FlowLoader,
    sink: &mut dyn ArtifactSink,
    config: &ExploreConfig,
) -> Result<ExploreReport, ExploreError> {
    let base = Url::parse(&config.base_url).map_err(|e| {
        ExploreError::Config(format!("invalid baseURL `{}`: {e}", config.base_url))
    })?;

    let init = strategy.init(config, flow)?;
    let start_path_raw = init
        .start_path
        .clone()
        .unwrap_or_else(|| config.start_path.clone());
    let start_url = base.join(&start_path_raw).map_err(|e| {
        ExploreError::Config(format!("invalid start path `{start_path_raw}`: {e}"))
    })?;
    let start_path = normalize_path(&start_url);
    let target_set = init.target_set;

    info!(
        strategy = strategy.name(),
        seed = config.seed,
        start = %start_path,
        "exploration run starting"
    );

    let mut state = RunState::new(config.seed);
    let deadline = Instant::now() + Duration::from_secs(config.seconds);

    let outcome = run_loop(
        driver,
        strategy,
        config,
        &base,
        &start_url,
        &start_path,
        target_set.as_ref(),
        deadline,
        &mut state,
    );

    strategy.on_end();
    attach_artifacts(sink, config, &state);

    match outcome {
        Ok(()) => {
            let report = build_report(config, strategy, &start_path, target_set.as_ref(), &state);
            info!(
                visited = report.visited_count,
                steps = report.steps.len(),
                coverage = report.coverage,
                "exploration run finished"
            );
            Ok(report)
        }
        Err(e) => {
            warn!(error = %e, "exploration run failed");
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    driver: &mut dyn BrowserDriver,
    strategy: &mut dyn Strategy,
    config: &ExploreConfig,
    base: &Url,
    start_url: &Url,
    start_path: &str,
    target_set: Option<&BTreeSet<String>>,
    deadline: Instant,
    state: &mut RunState,
) -> Result<(), ExploreError> {
    navigate(driver, config, state, start_url.as_str())?;

    loop {
        if Instant::now() >= deadline {
            break;
        }
        if let Some(max) = config.max_steps {
            if state.steps.len() as u64 >= max {
                break;
            }
        }

        let current_url_raw = driver.current_url();
        let current_url = Url::parse(&current_url_raw).map_err(|e| {
            ExploreError::Config(format!(
                "driver reported unparseable URL `{current_url_raw}`: {e}"
            ))
        })?;
        let current_path = normalize_path(&current_url);

        // Process each URL once; a no-op navigation must not recount it.
        let nav_obs = state.pending_obs.take();
        if state.last_processed.as_deref() != Some(current_url_raw.as_str()) {
            let obs = nav_obs.unwrap_or_else(|| driver.drain_observations());
            let items = assemble_items(&obs, base, &current_path);
            state.coverage.update(&current_path, &items);
            state.visited.insert(current_path.clone());
            remember_recent(&mut state.recent, &current_path);
            state.last_processed = Some(current_url_raw.clone());
        }

        // The previous step's feedback waited for this page's coverage.
        if let Some(pending) = state.pending.take() {
            finalize_feedback(strategy, config, &state.coverage, state.visited.len() as u64, pending);
        }

        let hrefs = driver.anchor_hrefs().map_err(|e| ExploreError::Navigation {
            url: current_url_raw.clone(),
            source: e,
        })?;
        let policy = strategy.candidate_policy();
        let candidates = collect_candidates(
            &hrefs,
            &CollectOptions {
                base,
                current_url: &current_url,
                current_path: &current_path,
                limit: policy.limit,
                dedupe_by_path: policy.dedupe_by_path,
                skip_self: policy.skip_self,
                skip_before_slice: policy.skip_before_slice,
                allowed_path_prefixes: config.allowed_path_prefixes.as_deref(),
            },
        );
        state.coverage.record_candidates_seen(&candidates);

        let step_index = state.steps.len() as u64;
        let action = {
            let mut ctx = StepContext {
                config,
                rng: &mut state.rng,
                current_path: &current_path,
                candidates: &candidates,
                coverage: &state.coverage,
                visited: &state.visited,
                recent: &state.recent,
                target_set,
                step_index,
            };
            strategy.next_action(&mut ctx)
        };

        let (to_path, target_url, via) = match action {
            ExploreAction::Stop { reason } => {
                debug!(reason = %reason, "strategy requested stop");
                break;
            }
            ExploreAction::Restart { reason, via } => {
                debug!(reason = %reason, from = %current_path, "restart");
                (start_path.to_string(), start_url.to_string(), via)
            }
            ExploreAction::Goto {
                url,
                target_path,
                reason,
                via,
            } => {
                debug!(reason = %reason, from = %current_path, to = %target_path, "goto");
                (target_path, url, via)
            }
        };

        state.pending = Some(PendingFeedback {
            from_path: current_path.clone(),
            to_path: to_path.clone(),
            step_index,
            revisited: state.visited.contains(&to_path),
            recent_loop: state.recent.contains(&to_path),
            counts_before: state.coverage.tag_counts(),
            visited_count_before: state.visited.len() as u64,
            flags: ErrorFlags::default(),
        });
        state.steps.push(StepRecord {
            from: current_path,
            to: to_path,
            via,
        });

        if let Err(e) = navigate(driver, config, state, &target_url) {
            // The failing step still teaches the bandit, flags set.
            if let Some(mut pending) = state.pending.take() {
                pending.flags = state.last_nav_flags;
                finalize_feedback(strategy, config, &state.coverage, state.visited.len() as u64, pending);
            }
            return Err(e);
        }
    }

    // Deadline or stop with a step in flight: settle it against the final
    // coverage snapshot.
    if let Some(pending) = state.pending.take() {
        finalize_feedback(strategy, config, &state.coverage, state.visited.len() as u64, pending);
    }
    Ok(())
}

/// Execute one navigation and classify its outcome.
///
/// On success the drained observations are stashed for the next processing
/// pass. HTTP >= 400, uncaught page exceptions, and non-noise console
/// errors are recorded in the run's error log and returned as errors;
/// `state.last_nav_flags` always reflects this navigation.
fn navigate(
    driver: &mut dyn BrowserDriver,
    config: &ExploreConfig,
    state: &mut RunState,
    url: &str,
) -> Result<(), ExploreError> {
    state.last_nav_flags = ErrorFlags::default();

    let status = match driver.goto(url) {
        Ok(status) => status,
        Err(source) => {
            state.errors.push(format!("navigation: {source}"));
            return Err(ExploreError::Navigation {
                url: url.to_string(),
                source,
            });
        }
    };
    state.history.push(url.to_string());

    let obs = driver.drain_observations();
    let blocked_this_nav = !obs.blocked_external.is_empty();
    state.blocked.extend(obs.blocked_external.iter().cloned());

    let fatal_console: Vec<String> = obs
        .console_errors
        .iter()
        .filter(|m| !config.noise.is_noise(m, blocked_this_nav))
        .cloned()
        .collect();

    let flags = ErrorFlags {
        http_status_ge_400: status >= 400,
        pageerror: !obs.page_errors.is_empty(),
        console_error: !fatal_console.is_empty(),
    };
    state.last_nav_flags = flags;

    if flags.http_status_ge_400 {
        state.errors.push(format!("HTTP {status} at {url}"));
    }
    for m in &obs.page_errors {
        state.errors.push(format!("pageerror: {m}"));
    }
    for m in &fatal_console {
        state.errors.push(format!("console: {m}"));
    }

    let page_error_message = obs.page_errors.join(" | ");
    state.pending_obs = Some(obs);

    if flags.http_status_ge_400 {
        return Err(ExploreError::NavigationHttp {
            status,
            url: url.to_string(),
        });
    }
    if flags.pageerror {
        return Err(ExploreError::PageRuntime {
            url: url.to_string(),
            message: page_error_message,
        });
    }
    if flags.console_error {
        return Err(ExploreError::Console {
            url: url.to_string(),
            message: fatal_console.join(" | "),
        });
    }
    Ok(())
}

/// Turn one navigation's observations into coverage items. Only
/// same-origin requests count; the current page always contributes at
/// least its own `route:` item.
fn assemble_items(obs: &PageObservations, base: &Url, current_path: &str) -> BTreeSet<CoverageItem> {
    let mut items = BTreeSet::new();
    items.insert(route_item(current_path));
    for req in &obs.requests {
        let Ok(url) = Url::parse(&req.url) else {
            continue;
        };
        if url.origin() != base.origin() {
            continue;
        }
        let path = normalize_path(&url);
        match req.kind {
            ResourceKind::Document => {
                items.insert(route_item(&path));
            }
            ResourceKind::XhrOrFetch => {
                items.insert(api_item(&req.method, &path));
            }
            ResourceKind::ScriptOrStyle => {
                items.insert(asset_item(&path));
            }
            ResourceKind::Other => {}
        }
    }
    items
}

fn remember_recent(recent: &mut Vec<String>, path: &str) {
    recent.push(path.to_string());
    if recent.len() > RECENT_WINDOW {
        recent.remove(0);
    }
}

fn finalize_feedback(
    strategy: &mut dyn Strategy,
    config: &ExploreConfig,
    coverage: &CoverageState,
    visited_count_after: u64,
    pending: PendingFeedback,
) {
    let after = coverage.tag_counts();
    let before = pending.counts_before;
    let gain = GainCounts {
        new_pages: (visited_count_after - pending.visited_count_before) as u32,
        new_routes: (after.routes - before.routes) as u32,
        new_apis: (after.apis - before.apis) as u32,
        new_assets: (after.assets - before.assets) as u32,
    };
    let found_error = pending.flags.any();
    let reward = config.reward_weights.compose(
        &gain,
        pending.revisited,
        pending.recent_loop,
        found_error,
        config.reward_mode,
    );
    let feedback = StepFeedback {
        from_path: pending.from_path,
        to_path: pending.to_path,
        reward,
        gain,
        errors: found_error.then_some(pending.flags),
        revisited: pending.revisited,
        recent_loop: pending.recent_loop,
        step_index: pending.step_index,
        reward_mode: config.reward_mode,
    };
    strategy.on_feedback(&feedback);
}

fn attach_artifacts(sink: &mut dyn ArtifactSink, config: &ExploreConfig, state: &RunState) {
    sink.attach_text("explore-seed.txt", &config.seed.to_string());
    sink.attach_text("explore-history.txt", &state.history.join("\n"));
    if !state.errors.is_empty() {
        sink.attach_text("explore-errors.txt", &state.errors.join("\n"));
    }
}

fn build_report(
    config: &ExploreConfig,
    strategy: &dyn Strategy,
    start_path: &str,
    target_set: Option<&BTreeSet<String>>,
    state: &RunState,
) -> ExploreReport {
    let visited: Vec<String> = state.visited.iter().cloned().collect();
    let targets: Vec<String> = target_set
        .map(|t| t.iter().cloned().collect())
        .unwrap_or_default();
    let uncovered: Vec<String> = targets
        .iter()
        .filter(|t| !state.visited.contains(*t))
        .cloned()
        .collect();
    let coverage = if targets.is_empty() {
        1.0
    } else {
        let hit = targets.iter().filter(|t| state.visited.contains(*t)).count();
        hit as f64 / targets.len() as f64
    };
    let blocked: Vec<String> = state
        .blocked
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ExploreReport {
        meta: ReportMeta {
            base_url: config.base_url.clone(),
            seed: config.seed,
            seconds: config.seconds,
            start_path: start_path.to_string(),
            restart_every: config.restart_every,
            strategy: strategy.name().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
        targets_count: targets.len(),
        visited_count: visited.len(),
        coverage,
        visited,
        uncovered,
        steps: state.steps.clone(),
        blocked_external_requests: blocked,
        bandit: strategy.bandit_snapshot(),
    }
}
