use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// A blank key leaves semantic search disabled for the process lifetime.
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_auth_header")]
	pub auth_header: String,
	pub path: String,
	pub model: String,
	/// Optional. Sent to the provider only when set.
	pub dimensions: Option<u32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retrieval {
	/// Shortlist size kept after issue-description similarity.
	#[serde(default = "default_stage1_keep")]
	pub stage1_keep: u32,
	/// Final cut kept after the second, more specific similarity pass.
	#[serde(default = "default_stage2_keep")]
	pub stage2_keep: u32,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	/// Keyword fallback tokens must have at least this many characters.
	#[serde(default = "default_min_keyword_chars")]
	pub min_keyword_chars: u32,
	/// When true, the keyword fallback ignores the machine filter.
	#[serde(default)]
	pub fallback_relax_machine: bool,
	/// Optional. Upper bound for the semantic stage; expiry counts as provider failure.
	pub timeout_ms: Option<u64>,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			stage1_keep: default_stage1_keep(),
			stage2_keep: default_stage2_keep(),
			default_limit: default_limit(),
			min_keyword_chars: default_min_keyword_chars(),
			fallback_relax_machine: false,
			timeout_ms: None,
		}
	}
}

fn default_auth_header() -> String {
	"authorization".to_string()
}

fn default_stage1_keep() -> u32 {
	5
}

fn default_stage2_keep() -> u32 {
	3
}

fn default_limit() -> u32 {
	5
}

fn default_min_keyword_chars() -> u32 {
	4
}
