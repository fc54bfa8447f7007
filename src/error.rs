//! Error taxonomy for exploration runs.
//!
//! Navigation-class errors (`NavigationHttp`, `PageRuntime`, `Console`,
//! `Navigation`) abort the run on first occurrence — the harness driving the
//! run owns retry/reporting policy, the engine never suppresses one to keep
//! going. `Config` errors are raised before any navigation happens.
//! Persistence failures are recovered locally by the bandit learner and do
//! not appear here as a run-fatal variant.

use thiserror::Error;

/// Failure reported by a [`BrowserDriver`][crate::driver::BrowserDriver]
/// implementation (timeouts, protocol breakage, closed sessions).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

/// Errors surfaced by the exploration engine.
#[derive(Debug, Error)]
pub enum ExploreError {
    /// Navigation completed with an HTTP status >= 400.
    #[error("HTTP {status} at {url}")]
    NavigationHttp { status: u16, url: String },

    /// Uncaught exception during page execution.
    #[error("page error at {url}: {message}")]
    PageRuntime { url: String, message: String },

    /// Error-level console message that survived the noise policy.
    #[error("console error at {url}: {message}")]
    Console { url: String, message: String },

    /// Navigation failed before a response was observed (timeout, driver).
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    /// Invalid configuration (unknown strategy, malformed flow, bad URL).
    #[error("config error: {0}")]
    Config(String),

    /// Flow specification could not be loaded or parsed.
    #[error("flow specification error: {0}")]
    Flow(String),
}
