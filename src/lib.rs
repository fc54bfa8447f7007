//! `roamer`: deterministic web-exploration primitives.
//!
//! Given a running web application and a browser driver, `roamer` walks the
//! app's link graph without a human-authored script: it discovers reachable
//! pages, builds coverage statistics over the routes / API calls / assets
//! each page exposes, and flags failures (HTTP errors, uncaught page
//! exceptions, console errors) the moment they appear. Which link to follow
//! next is a pluggable [`Strategy`]; the interesting ones learn online.
//!
//! **Goals:**
//! - **Deterministic by default**: one seeded xorshift stream drives every
//!   stochastic choice — same seed + same app ⇒ same walk. Failed runs
//!   record the seed so they replay exactly.
//! - **Strategy-pluggable**: a closed, name-keyed registry of four
//!   policies; the run loop is identical for all of them.
//! - **Feedback-driven**: every navigation produces a [`StepFeedback`]
//!   (coverage gain, revisit/loop flags, error flags, scalar reward) that
//!   learning strategies consume.
//! - **Small surface**: the browser itself, artifact publishing, and
//!   config loading stay behind the [`BrowserDriver`], [`ArtifactSink`],
//!   and plain-value [`ExploreConfig`] seams.
//!
//! **Strategies:**
//! - [`RandomWalk`] (`random-walk`): uniform pick among current candidates.
//! - [`GuidedCoverage`] (`guided-coverage`): biased toward an externally
//!   supplied target-path set (a "flow" specification), then unvisited
//!   candidates, avoiding the recent-paths window.
//! - [`SetCoverGreedy`] (`set-cover-greedy`): greedy marginal coverage gain
//!   with inverse document-frequency weighting.
//! - [`RlBandit`] (`rl-bandit`): per-state UCB1 or epsilon-greedy bandit
//!   over (from-path → to-path) arms, learned online from step rewards and
//!   optionally persisted across runs.
//!
//! **Non-goals:**
//! - Not a browser: bring a [`BrowserDriver`] (the integration tests script
//!   one in plain Rust).
//! - No HTML understanding beyond anchor hrefs and resource kinds.
//! - No session/auth handling, no visual diffing, no report rendering.
//!
//! # Example
//!
//! ```rust
//! use roamer::{resolve_strategy, ExploreConfig};
//!
//! let config = ExploreConfig {
//!     strategy: "set-cover-greedy".to_string(),
//!     seed: 42,
//!     ..ExploreConfig::default()
//! };
//! let strategy = resolve_strategy(&config.strategy, &config).unwrap();
//! assert_eq!(strategy.name(), "set-cover-greedy");
//! ```
//!
//! A full run wires a driver, a strategy, a flow loader, and an artifact
//! sink into [`run_explore`], which returns the [`ExploreReport`] on clean
//! termination and propagates the first navigation-class failure otherwise
//! (artifacts are delivered either way).

#![forbid(unsafe_code)]

mod bandit;
pub use bandit::*;

mod candidates;
pub use candidates::*;

mod config;
pub use config::*;

mod coverage;
pub use coverage::*;

mod driver;
pub use driver::*;

mod error;
pub use error::*;

mod guided;
pub use guided::*;

mod random_walk;
pub use random_walk::*;

mod reward;
pub use reward::*;

mod rng;
pub use rng::*;

mod runner;
pub use runner::*;

mod set_cover;
pub use set_cover::*;

mod strategy;
pub use strategy::*;
