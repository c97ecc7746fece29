//! Page-range expressions: `"1,3,5-7"` → explicit, sorted page set.
//!
//! The grammar is a comma-separated list of tokens; each token is either a
//! single page (`5`) or an inclusive pair (`5-7`). Tokens are unioned, so
//! order and repetition in the input never matter: `"7,1-3,2"` and
//! `"1,2,3,7"` describe the same [`PageSet`].
//!
//! Pages are 1-based. `0` and reversed pairs (`"5-2"`) are rejected as
//! malformed rather than silently ignored or swapped.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Highest addressable page (pdfium indexes pages with `u16`).
pub const MAX_PAGE: u32 = u16::MAX as u32;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*(?:-\s*(\d+)\s*)?$").expect("valid token regex"));

/// Ascending, duplicate-free set of 1-based page numbers.
///
/// Only constructible through [`parse_page_range`] (or [`PageSet::from_pages`]),
/// so the invariants hold for every value in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSet(Vec<u32>);

impl PageSet {
    /// Build a set from arbitrary page numbers, sorting and deduplicating.
    ///
    /// Returns `None` if `pages` is empty or contains `0`.
    pub fn from_pages(pages: impl IntoIterator<Item = u32>) -> Option<Self> {
        let set: BTreeSet<u32> = pages.into_iter().collect();
        if set.is_empty() || set.contains(&0) {
            return None;
        }
        Some(Self(set.into_iter().collect()))
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: an empty scope is a [`ExtractError::MissingScope`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest requested page.
    pub fn first(&self) -> u32 {
        self.0[0]
    }

    /// Highest requested page.
    pub fn last(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    pub fn contains(&self, page: u32) -> bool {
        self.0.binary_search(&page).is_ok()
    }
}

impl fmt::Display for PageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parse a page-range expression.
///
/// # Errors
/// * [`ExtractError::MissingScope`] — `input` is `None`, empty or blank.
/// * [`ExtractError::MalformedRange`] — a token is non-numeric, `0`,
///   reversed (`5-2`), empty (`1,,2`) or beyond [`MAX_PAGE`].
pub fn parse_page_range(input: Option<&str>) -> Result<PageSet, ExtractError> {
    let raw = match input {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(ExtractError::MissingScope),
    };

    let malformed = |token: &str, reason: &str| ExtractError::MalformedRange {
        input: raw.to_string(),
        token: token.trim().to_string(),
        reason: reason.to_string(),
    };

    let mut pages = BTreeSet::new();
    for token in raw.split(',') {
        let caps = TOKEN
            .captures(token)
            .ok_or_else(|| malformed(token, "is not a page number or start-end pair"))?;

        let start: u32 = caps[1]
            .parse()
            .map_err(|_| malformed(token, "is too large"))?;
        let end: u32 = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| malformed(token, "is too large"))?,
            None => start,
        };

        if start == 0 {
            return Err(malformed(token, "is not a valid page (pages are 1-indexed)"));
        }
        if start > end {
            return Err(malformed(token, "is reversed (start must be <= end)"));
        }
        if end > MAX_PAGE {
            return Err(malformed(token, "exceeds the maximum page number 65535"));
        }
        pages.extend(start..=end);
    }

    Ok(PageSet(pages.into_iter().collect()))
}
