use std::collections::HashSet;

/// Lowercased whitespace tokens with at least `min_chars` characters, first occurrence first.
///
/// Edge punctuation is stripped before the length check so that `jam,` and `jam` agree.
pub fn keywords(text: &str, min_chars: usize) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for raw in text.split_whitespace() {
		let token = raw.trim_matches(|ch: char| !ch.is_alphanumeric()).to_lowercase();

		if token.chars().count() < min_chars {
			continue;
		}
		if seen.insert(token.clone()) {
			out.push(token);
		}
	}

	out
}

/// Keywords that occur as substrings of `text`, compared case-insensitively.
pub fn matched_keywords(keywords: &[String], text: &str) -> Vec<String> {
	if keywords.is_empty() {
		return Vec::new();
	}

	let haystack = text.to_lowercase();

	keywords.iter().filter(|keyword| haystack.contains(keyword.as_str())).cloned().collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_tokens_are_dropped() {
		assert_eq!(keywords("printer paper jam", 4), vec![
			"printer".to_string(),
			"paper".to_string()
		]);
	}

	#[test]
	fn tokens_are_lowercased_deduplicated_and_trimmed() {
		assert_eq!(keywords("Roller, roller ROLLER; (seal)", 4), vec![
			"roller".to_string(),
			"seal".to_string()
		]);
	}

	#[test]
	fn matching_is_substring_and_case_insensitive() {
		let keys = keywords("printer smear", 4);

		assert_eq!(matched_keywords(&keys, "Printers jam on line 3"), vec!["printer".to_string()]);
		assert!(matched_keywords(&keys, "ink defect").is_empty());
		assert!(matched_keywords(&[], "anything").is_empty());
	}
}
