//! Exact, case-sensitive keyword counting. No case folding or whitespace normalization is applied;
//! "Top-Up" and "top up" are different keywords here.

use crate::types::MatchResult;

/// Counts non-overlapping occurrences of `keyword` in `text`.
pub fn scan(text: &str, keyword: &str) -> MatchResult {
	if keyword.is_empty() {
		return MatchResult::default()
	}
	let occurrences = text.matches(keyword).count();
	MatchResult { found: occurrences > 0, occurrences }
}
