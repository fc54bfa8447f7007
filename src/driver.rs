//! Collaborator seams: the browser driver, artifact sink, and the
//! console-noise policy.
//!
//! The engine never talks to a real browser; it drives any
//! [`BrowserDriver`] implementation (Playwright/CDP bridges, or the
//! scripted fakes the integration tests use). Drivers accumulate page
//! events between navigations and hand them over in one
//! [`PageObservations`] batch per `drain_observations` call.

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Resource class of a completed network request, as reported by the
/// driver. Determines the coverage-item tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Top-level document loads (`route:` items).
    Document,
    /// Scripts and stylesheets (`asset:` items).
    ScriptOrStyle,
    /// XHR / fetch calls (`api:` items).
    XhrOrFetch,
    /// Anything else; ignored by coverage.
    Other,
}

/// One completed network request observed since the last drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRequest {
    pub method: String,
    pub url: String,
    pub kind: ResourceKind,
}

/// Everything the driver observed since the previous drain: uncaught page
/// exceptions, error-level console messages, completed requests, and
/// cross-origin requests that were blocked.
#[derive(Debug, Clone, Default)]
pub struct PageObservations {
    pub page_errors: Vec<String>,
    pub console_errors: Vec<String>,
    pub requests: Vec<ObservedRequest>,
    pub blocked_external: Vec<String>,
}

/// Minimal browser surface the run loop needs.
///
/// `goto` blocks until the navigation settles and returns the HTTP status
/// of the main response; timeouts and protocol failures surface as
/// [`DriverError`] and follow the normal failed-navigation path.
pub trait BrowserDriver {
    fn goto(&mut self, url: &str) -> Result<u16, DriverError>;
    fn current_url(&self) -> String;
    fn anchor_hrefs(&mut self) -> Result<Vec<String>, DriverError>;
    fn drain_observations(&mut self) -> PageObservations;
}

/// Receives run artifacts (seed, history, error log). File layout and
/// report publishing belong to the harness, not the engine.
pub trait ArtifactSink {
    fn attach_text(&mut self, name: &str, content: &str);
}

/// Sink that drops everything; for harnesses that only want the report.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardArtifacts;

impl ArtifactSink for DiscardArtifacts {
    fn attach_text(&mut self, _name: &str, _content: &str) {}
}

/// Policy deciding which error-level console messages are benign noise.
///
/// The common case: intentionally blocked third-party requests make the
/// browser log "Failed to load resource" errors that say nothing about the
/// application under test. Matching is substring-based and the
/// blocked-correlation requirement is a switch, so over- or
/// under-filtering is a config change rather than a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseFilter {
    /// A message containing any of these substrings is a noise candidate.
    pub substrings: Vec<String>,
    /// Only treat matches as noise while blocked external requests were
    /// actually observed this navigation.
    pub only_when_blocked: bool,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            substrings: vec!["Failed to load resource".to_string()],
            only_when_blocked: true,
        }
    }
}

impl NoiseFilter {
    /// Is this console message benign, given whether blocked external
    /// requests were seen on the current navigation?
    #[must_use]
    pub fn is_noise(&self, message: &str, blocked_external_seen: bool) -> bool {
        let matched = self.substrings.iter().any(|s| message.contains(s));
        matched && (!self.only_when_blocked || blocked_external_seen)
    }
}
