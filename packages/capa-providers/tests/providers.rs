use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use capa_config::EmbeddingProviderConfig;
use capa_providers::{Error, embedding::EmbeddingClient};

fn provider_config(api_key: &str) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: api_key.to_string(),
		auth_header: "authorization".to_string(),
		path: "/v1/embeddings".to_string(),
		model: "m".to_string(),
		dimensions: None,
		timeout_ms: 500,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers = capa_providers::auth_headers("secret", "authorization", &Map::new())
		.expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
	assert!(value.is_sensitive());
}

#[test]
fn builds_google_api_key_header() {
	let headers = capa_providers::auth_headers("secret", "x-goog-api-key", &Map::new())
		.expect("Failed to build headers.");

	assert_eq!(headers.get("x-goog-api-key").expect("Missing api key header."), "secret");
	assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn default_headers_must_be_strings() {
	let mut defaults = Map::new();

	defaults.insert("x-trace".to_string(), Value::from(1));

	let err = capa_providers::auth_headers("secret", "authorization", &defaults)
		.expect_err("Expected invalid default header.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn client_requires_an_api_key() {
	let err = EmbeddingClient::new(&provider_config("  ")).expect_err("Expected missing key error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[tokio::test]
async fn unreachable_provider_is_an_error_not_a_panic() {
	let client = EmbeddingClient::new(&provider_config("secret")).expect("Failed to build client.");
	let result = client.embed(&["printer jam".to_string()]).await;

	assert!(result.is_err());
}

#[tokio::test]
async fn empty_batch_skips_the_network() {
	let client = EmbeddingClient::new(&provider_config("secret")).expect("Failed to build client.");
	let vectors = client.embed(&[]).await.expect("Empty batch must succeed.");

	assert!(vectors.is_empty());
}
