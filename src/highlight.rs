use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Whitespace separated terms of a search query, deduplicated ignoring case.
pub fn query_terms(query: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .filter(|term| seen.insert(term.to_lowercase()))
        .collect()
}

/// Case-insensitive matcher for the terms of `query`, longest term first so
/// that overlapping terms highlight the widest match. `None` for a blank query.
pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    let mut terms = query_terms(query);
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = terms
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}
