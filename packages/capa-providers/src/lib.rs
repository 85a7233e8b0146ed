pub mod embedding;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

const GOOGLE_API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds request headers for a provider. `auth_header` selects between a bearer token and
/// Google's API key header; the key itself is marked sensitive.
pub fn auth_headers(
	api_key: &str,
	auth_header: &str,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	let (name, raw) = match auth_header {
		"authorization" => (AUTHORIZATION, format!("Bearer {api_key}")),
		GOOGLE_API_KEY_HEADER => (HeaderName::from_static(GOOGLE_API_KEY_HEADER), api_key.to_string()),
		other => {
			return Err(Error::InvalidConfig {
				message: format!("Unsupported auth header {other:?}."),
			});
		},
	};
	let mut value = HeaderValue::from_str(&raw)?;

	value.set_sensitive(true);
	headers.insert(name, value);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
