/// Cosine similarity between two embeddings.
///
/// Returns `0.0` when either side is absent. That value means "no opinion", so callers that
/// need to tell it apart from a genuinely low score should check presence with [`cosine`].
pub fn similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
	match (a, b) {
		(Some(a), Some(b)) => cosine(a, b).unwrap_or(0.0),
		_ => 0.0,
	}
}

/// `None` when the vectors cannot be compared: empty, different dimensions, zero norm, or
/// non-finite components.
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
	if a.is_empty() || a.len() != b.len() {
		return None;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return None;
	}

	let score = dot / (norm_a.sqrt() * norm_b.sqrt());

	if !score.is_finite() {
		return None;
	}

	Some(score.clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_vectors_score_one() {
		let v = [0.3, -1.2, 4.0];

		assert!((similarity(Some(&v[..]), Some(&v[..])) - 1.0).abs() < 1e-6);
	}

	#[test]
	fn opposite_vectors_score_minus_one() {
		let a = [1.0, 2.0];
		let b = [-1.0, -2.0];

		assert!((similarity(Some(&a[..]), Some(&b[..])) + 1.0).abs() < 1e-6);
	}

	#[test]
	fn orthogonal_vectors_score_zero() {
		assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
	}

	#[test]
	fn absent_side_scores_zero_in_both_positions() {
		let v = [0.5, 0.5];

		assert_eq!(similarity(None, Some(&v[..])), 0.0);
		assert_eq!(similarity(Some(&v[..]), None), 0.0);
		assert_eq!(similarity(None, None), 0.0);
	}

	#[test]
	fn incomparable_vectors_have_no_cosine() {
		assert_eq!(cosine(&[], &[]), None);
		assert_eq!(cosine(&[1.0], &[1.0, 2.0]), None);
		assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), None);
		assert_eq!(cosine(&[f32::NAN, 1.0], &[1.0, 2.0]), None);
	}
}
