use capa_domain::{KnowledgeRecord, keyword};

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
	pub index: usize,
	pub matched: Vec<String>,
}

/// Lexical floor under the semantic funnel: records whose issue description contains at least one
/// query keyword, in pool order, capped at `limit`.
pub fn keyword_fallback(
	pool: &[KnowledgeRecord],
	issue_description: &str,
	min_keyword_chars: usize,
	limit: usize,
) -> Vec<KeywordHit> {
	let keywords = keyword::keywords(issue_description, min_keyword_chars);

	if keywords.is_empty() || limit == 0 {
		return Vec::new();
	}

	pool.iter()
		.enumerate()
		.filter_map(|(index, record)| {
			let matched = keyword::matched_keywords(&keywords, &record.issue_description);

			(!matched.is_empty()).then_some(KeywordHit { index, matched })
		})
		.take(limit)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pool(issues: &[&str]) -> Vec<KnowledgeRecord> {
		issues
			.iter()
			.enumerate()
			.map(|(idx, issue)| KnowledgeRecord::new(idx as i64 + 1, *issue))
			.collect()
	}

	#[test]
	fn matches_substrings_case_insensitively_in_pool_order() {
		let pool = pool(&["Conveyor BELT slip", "ink smear", "belt tension low"]);
		let hits = keyword_fallback(&pool, "belt problem", 4, 5);

		assert_eq!(hits.iter().map(|hit| hit.index).collect::<Vec<_>>(), vec![0, 2]);
		assert_eq!(hits[0].matched, vec!["belt".to_string()]);
	}

	#[test]
	fn short_tokens_never_match() {
		let pool = pool(&["jam on line 3"]);

		assert!(keyword_fallback(&pool, "jam", 4, 5).is_empty());
	}

	#[test]
	fn respects_limit() {
		let pool = pool(&["printer a", "printer b", "printer c"]);

		assert_eq!(keyword_fallback(&pool, "printer", 4, 2).len(), 2);
		assert!(keyword_fallback(&pool, "printer", 4, 0).is_empty());
	}
}
