use crate::EmbeddingProvider;

/// Per-text view over an [`EmbeddingProvider`]: one output slot per input, `None` wherever no
/// vector could be produced. Provider errors are logged and never returned.
pub struct EmbeddingAdapter<'a> {
	provider: &'a dyn EmbeddingProvider,
}
impl<'a> EmbeddingAdapter<'a> {
	pub fn new(provider: &'a dyn EmbeddingProvider) -> Self {
		Self { provider }
	}

	pub fn is_available(&self) -> bool {
		self.provider.is_available()
	}

	pub async fn embed(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
		let mut out = vec![None; texts.len()];

		if !self.is_available() {
			return out;
		}

		let (positions, batch): (Vec<usize>, Vec<String>) = texts
			.iter()
			.enumerate()
			.filter(|(_, text)| !text.trim().is_empty())
			.map(|(idx, text)| (idx, text.clone()))
			.unzip();

		if batch.is_empty() {
			return out;
		}

		match self.provider.embed(&batch).await {
			Ok(vectors) if vectors.len() == batch.len() =>
				for (idx, vector) in positions.into_iter().zip(vectors) {
					if !vector.is_empty() {
						out[idx] = Some(vector);
					}
				},
			Ok(vectors) => {
				tracing::warn!(
					requested = batch.len(),
					returned = vectors.len(),
					"Embedding provider returned a mismatched vector count. Treating batch as empty."
				);
			},
			Err(err) => {
				tracing::warn!(error = %err, inputs = batch.len(), "Embedding call failed.");
			},
		}

		out
	}

	pub async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
		self.embed(&[text.to_string()]).await.into_iter().next().flatten()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use super::*;
	use crate::{BoxFuture, Error, Result};

	struct Lengths {
		calls: Arc<AtomicUsize>,
	}
	impl EmbeddingProvider for Lengths {
		fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let vectors = texts.iter().map(|text| vec![text.len() as f32, 1.0]).collect();

			Box::pin(async move { Ok(vectors) })
		}
	}

	struct Short;
	impl EmbeddingProvider for Short {
		fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			Box::pin(async move { Ok(vec![vec![1.0]]) })
		}
	}

	struct Failing;
	impl EmbeddingProvider for Failing {
		fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
			Box::pin(async move { Err(Error::Provider { message: "quota".to_string() }) })
		}
	}

	fn texts(items: &[&str]) -> Vec<String> {
		items.iter().map(|item| item.to_string()).collect()
	}

	#[tokio::test]
	async fn blanks_map_to_none_and_order_is_kept() {
		let calls = Arc::new(AtomicUsize::new(0));
		let provider = Lengths { calls: calls.clone() };
		let adapter = EmbeddingAdapter::new(&provider);
		let out = adapter.embed(&texts(&["ab", "  ", "abcd"])).await;

		assert_eq!(out, vec![Some(vec![2.0, 1.0]), None, Some(vec![4.0, 1.0])]);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn all_blank_input_skips_the_provider() {
		let calls = Arc::new(AtomicUsize::new(0));
		let provider = Lengths { calls: calls.clone() };
		let adapter = EmbeddingAdapter::new(&provider);

		assert_eq!(adapter.embed(&texts(&["", " \t"])).await, vec![None, None]);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn failures_and_count_mismatches_degrade_to_none() {
		let input = texts(&["a", "b"]);

		assert_eq!(EmbeddingAdapter::new(&Failing).embed(&input).await, vec![None, None]);
		assert_eq!(EmbeddingAdapter::new(&Short).embed(&input).await, vec![None, None]);
	}

	#[tokio::test]
	async fn disabled_provider_yields_none() {
		let adapter = EmbeddingAdapter::new(&crate::DisabledEmbedding);

		assert!(!adapter.is_available());
		assert_eq!(adapter.embed_one("printer jam").await, None);
	}
}
