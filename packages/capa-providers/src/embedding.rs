use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{Error, Result};
use capa_config::EmbeddingProviderConfig;

/// HTTP embedding client. Built once per process and shared; `reqwest::Client` pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
	client: Client,
	url: String,
	headers: HeaderMap,
	model: String,
	dimensions: Option<u32>,
}
impl EmbeddingClient {
	pub fn new(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		if cfg.api_key.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "Embedding provider api_key is empty.".to_string(),
			});
		}

		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(&cfg.api_key, &cfg.auth_header, &cfg.default_headers)?;

		Ok(Self {
			client,
			url: format!("{}{}", cfg.api_base, cfg.path),
			headers,
			model: cfg.model.clone(),
			dimensions: cfg.dimensions,
		})
	}

	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let body = request_body(&self.model, self.dimensions, texts);
		let res =
			self.client.post(&self.url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let vectors = parse_embedding_response(json)?;

		if vectors.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding response has {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		tracing::debug!(inputs = texts.len(), model = %self.model, "Embedded batch.");

		Ok(vectors)
	}
}

fn request_body(model: &str, dimensions: Option<u32>, texts: &[String]) -> Value {
	let mut body = serde_json::json!({
		"model": model,
		"input": texts,
	});

	if let Some(dimensions) = dimensions {
		body["dimensions"] = Value::from(dimensions);
	}

	body
}

/// Accepts the OpenAI-compatible `data[].embedding` shape (ordered by `index`) and the Gemini
/// batch `embeddings[].values` shape.
pub fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	if let Some(data) = json.get("data").and_then(Value::as_array) {
		let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

		for (fallback_index, item) in data.iter().enumerate() {
			let index = item
				.get("index")
				.and_then(Value::as_u64)
				.map(|v| v as usize)
				.unwrap_or(fallback_index);
			let embedding = item.get("embedding").ok_or_else(|| Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			})?;

			indexed.push((index, parse_vector(embedding)?));
		}

		indexed.sort_by_key(|(index, _)| *index);

		return Ok(indexed.into_iter().map(|(_, vec)| vec).collect());
	}
	if let Some(embeddings) = json.get("embeddings").and_then(Value::as_array) {
		return embeddings
			.iter()
			.map(|item| {
				let values = item.get("values").ok_or_else(|| Error::InvalidResponse {
					message: "Embedding item missing values array.".to_string(),
				})?;

				parse_vector(values)
			})
			.collect();
	}

	Err(Error::InvalidResponse {
		message: "Embedding response is missing data or embeddings array.".to_string(),
	})
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
	let values = value.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Embedding must be an array.".to_string(),
	})?;
	let mut vec = Vec::with_capacity(values.len());

	for value in values {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vec.push(number as f32);
	}

	Ok(vec)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_openai_shape_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn parses_gemini_batch_shape() {
		let json = serde_json::json!({
			"embeddings": [
				{ "values": [0.1, 0.2] },
				{ "values": [0.3, 0.4] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[1], vec![0.3_f32, 0.4_f32]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "embedding": ["x"] }] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn rejects_unknown_shapes() {
		let json = serde_json::json!({ "error": { "code": 429 } });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn dimensions_are_sent_only_when_set() {
		let texts = vec!["a".to_string()];

		assert!(request_body("m", None, &texts).get("dimensions").is_none());
		assert_eq!(request_body("m", Some(768), &texts)["dimensions"], 768);
	}
}
