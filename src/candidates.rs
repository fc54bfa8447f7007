//! Outbound-link candidate collection.
//!
//! The run loop hands the raw `href` attributes of the current page to
//! [`collect_candidates`], which trims, filters, resolves, and normalizes
//! them into same-origin [`ExploreCandidate`]s. The function is pure over
//! its inputs; DOM access stays in the browser driver.

use std::collections::BTreeSet;

use url::Url;

/// One navigable link on the current page.
///
/// Produced fresh per step; never persisted. `path` is the normalized
/// comparison key used by strategies, coverage state, and the bandit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreCandidate {
    /// Raw attribute value as found in the DOM.
    pub href: String,
    /// Resolved absolute URL.
    pub abs: String,
    /// Normalized path (no query/hash, trailing slash collapsed).
    pub path: String,
}

/// Normalize a URL to its comparison path: query and fragment dropped,
/// trailing slashes collapsed, root preserved as `/`.
#[must_use]
pub fn normalize_path(url: &Url) -> String {
    let trimmed = url.path().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize a bare path string the same way flow targets and prefix
/// filters are normalized: leading slash ensured, trailing slashes
/// collapsed, root preserved.
#[must_use]
pub fn normalize_path_str(path: &str) -> String {
    let p = path.trim();
    let with_slash = if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{p}")
    };
    let trimmed = with_slash.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// True for hrefs that cannot produce a same-origin navigation: empty,
/// fragment-only, `mailto:`, `tel:`, `javascript:`.
#[must_use]
pub fn is_skippable_href(href: &str) -> bool {
    let h = href.trim();
    h.is_empty()
        || h.starts_with('#')
        || h.starts_with("mailto:")
        || h.starts_with("tel:")
        || h.starts_with("javascript:")
}

/// Collection behavior, supplied by the active strategy plus run config.
#[derive(Debug, Clone)]
pub struct CollectOptions<'a> {
    /// Origin anchor: only candidates sharing this origin survive.
    pub base: &'a Url,
    /// URL relative hrefs resolve against.
    pub current_url: &'a Url,
    /// Normalized path of the current page (for `skip_self`).
    pub current_path: &'a str,
    /// Max anchors considered.
    pub limit: usize,
    /// Keep only the first candidate per normalized path.
    pub dedupe_by_path: bool,
    /// Drop candidates pointing at the current path.
    pub skip_self: bool,
    /// Filter skippable hrefs before truncating to `limit` (vs. after).
    pub skip_before_slice: bool,
    /// Optional path-prefix allowlist; `/` allows everything.
    pub allowed_path_prefixes: Option<&'a [String]>,
}

fn normalized_prefixes(raw: Option<&[String]>) -> Vec<String> {
    raw.unwrap_or_default()
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| normalize_path_str(p))
        .collect()
}

fn passes_prefixes(path: &str, prefixes: &[String]) -> bool {
    if prefixes.is_empty() {
        return true;
    }
    prefixes
        .iter()
        .any(|prefix| prefix == "/" || path == prefix || path.starts_with(&format!("{prefix}/")))
}

/// Produce the deduplicated, filtered, normalized candidate list for one
/// step, preserving DOM order (subject to the truncation policy).
///
/// Guarantee: every returned candidate is same-origin, non-skippable, and
/// normalized.
#[must_use]
pub fn collect_candidates(hrefs: &[String], opts: &CollectOptions<'_>) -> Vec<ExploreCandidate> {
    let trimmed: Vec<&str> = hrefs.iter().map(|h| h.trim()).collect();
    let pre_filtered: Vec<&str> = if opts.skip_before_slice {
        trimmed.into_iter().filter(|h| !is_skippable_href(h)).collect()
    } else {
        trimmed.into_iter().filter(|h| !h.is_empty()).collect()
    };
    let sliced = &pre_filtered[..pre_filtered.len().min(opts.limit)];

    let prefixes = normalized_prefixes(opts.allowed_path_prefixes);
    let mut seen_paths = BTreeSet::new();
    let mut results = Vec::new();

    for &href in sliced {
        if !opts.skip_before_slice && is_skippable_href(href) {
            continue;
        }
        let Ok(abs) = opts.current_url.join(href) else {
            continue;
        };
        if abs.origin() != opts.base.origin() {
            continue;
        }
        let path = normalize_path(&abs);
        if !passes_prefixes(&path, &prefixes) {
            continue;
        }
        if opts.skip_self && path == opts.current_path {
            continue;
        }
        if opts.dedupe_by_path && !seen_paths.insert(path.clone()) {
            continue;
        }
        results.push(ExploreCandidate {
            href: href.to_string(),
            abs: abs.to_string(),
            path,
        });
    }

    results
}
