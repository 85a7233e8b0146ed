pub mod capture;
pub mod embedding;
pub mod fallback;
pub mod filter;
pub mod funnel;
pub mod retrieve;
pub mod store;

mod error;

pub use capture::{CaptureOutcome, ClosureInput};
pub use embedding::EmbeddingAdapter;
pub use error::{Error, Result};
pub use retrieve::{MatchKind, MatchedField, RankedCandidate};
pub use store::{KnowledgeStore, MemoryStore, RecordFilter};

use std::{future::Future, pin::Pin, sync::Arc};

use capa_config::{Config, EmbeddingProviderConfig};
use capa_providers::embedding::EmbeddingClient;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text to vector seam. One instance is built at startup and shared by every query.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// `false` means semantic retrieval is off and every query goes to the keyword fallback.
	fn is_available(&self) -> bool {
		true
	}

	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub struct HttpEmbedding {
	client: EmbeddingClient,
}
impl HttpEmbedding {
	pub fn new(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		Ok(Self { client: EmbeddingClient::new(cfg)? })
	}
}
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(self.client.embed(texts).await?) })
	}
}

/// Stands in when no provider could be built.
pub struct DisabledEmbedding;
impl EmbeddingProvider for DisabledEmbedding {
	fn is_available(&self) -> bool {
		false
	}

	fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Err(Error::Provider { message: "Embedding provider is disabled.".to_string() })
		})
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}

	pub fn disabled() -> Self {
		Self { embedding: Arc::new(DisabledEmbedding) }
	}

	/// Never fails. A blank key or a client that cannot be built leaves semantic retrieval off for
	/// the process lifetime.
	pub fn from_config(cfg: &EmbeddingProviderConfig) -> Self {
		if cfg.api_key.trim().is_empty() {
			tracing::warn!(
				provider_id = %cfg.provider_id,
				"Embedding api_key is blank. Semantic retrieval is disabled."
			);

			return Self::disabled();
		}

		match HttpEmbedding::new(cfg) {
			Ok(provider) => Self::new(Arc::new(provider)),
			Err(err) => {
				tracing::warn!(
					provider_id = %cfg.provider_id,
					error = %err,
					"Failed to build embedding provider. Semantic retrieval is disabled."
				);

				Self::disabled()
			},
		}
	}
}

pub struct CapaService {
	pub cfg: Config,
	pub store: Arc<dyn KnowledgeStore>,
	pub providers: Providers,
}
impl CapaService {
	pub fn new(cfg: Config, store: Arc<dyn KnowledgeStore>) -> Self {
		let providers = Providers::from_config(&cfg.providers.embedding);

		Self { cfg, store, providers }
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn KnowledgeStore>, providers: Providers) -> Self {
		Self { cfg, store, providers }
	}
}
