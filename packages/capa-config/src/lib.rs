mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Postgres, Providers, Retrieval, Service, Storage,
};

use std::{fs, path::Path};

pub const AUTH_HEADERS: [&str; 2] = ["authorization", "x-goog-api-key"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		ParseFailure::Toml(source) => Error::ParseConfig { path: path.to_path_buf(), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	parse(raw).map_err(|err| match err {
		ParseFailure::Toml(source) =>
			Error::ParseConfig { path: Path::new("<inline>").to_path_buf(), source },
		ParseFailure::Invalid(err) => err,
	})
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation { message: "service.log_level must be non-empty.".to_string() });
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let embedding = &cfg.providers.embedding;

	if embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !AUTH_HEADERS.contains(&embedding.auth_header.as_str()) {
		return Err(Error::Validation {
			message: "providers.embedding.auth_header must be one of authorization or x-goog-api-key."
				.to_string(),
		});
	}
	if embedding.dimensions == Some(0) {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero when set."
				.to_string(),
		});
	}
	if embedding.default_headers.values().any(|value| !value.is_string()) {
		return Err(Error::Validation {
			message: "providers.embedding.default_headers values must be strings.".to_string(),
		});
	}

	let retrieval = &cfg.retrieval;

	if retrieval.stage1_keep == 0 {
		return Err(Error::Validation {
			message: "retrieval.stage1_keep must be greater than zero.".to_string(),
		});
	}
	if retrieval.stage2_keep == 0 {
		return Err(Error::Validation {
			message: "retrieval.stage2_keep must be greater than zero.".to_string(),
		});
	}
	if retrieval.stage2_keep > retrieval.stage1_keep {
		return Err(Error::Validation {
			message: "retrieval.stage2_keep must not exceed retrieval.stage1_keep.".to_string(),
		});
	}
	if retrieval.min_keyword_chars == 0 {
		return Err(Error::Validation {
			message: "retrieval.min_keyword_chars must be greater than zero.".to_string(),
		});
	}
	if retrieval.timeout_ms == Some(0) {
		return Err(Error::Validation {
			message: "retrieval.timeout_ms must be greater than zero when set.".to_string(),
		});
	}

	Ok(())
}

enum ParseFailure {
	Toml(toml::de::Error),
	Invalid(Error),
}

fn parse(raw: &str) -> std::result::Result<Config, ParseFailure> {
	let mut cfg: Config = toml::from_str(raw).map_err(ParseFailure::Toml)?;

	normalize(&mut cfg);

	validate(&cfg).map_err(ParseFailure::Invalid)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	let embedding = &mut cfg.providers.embedding;

	embedding.api_key = embedding.api_key.trim().to_string();
	embedding.auth_header = embedding.auth_header.trim().to_ascii_lowercase();

	embedding.api_base = embedding.api_base.trim_end_matches('/').to_string();

	if !embedding.path.is_empty() && !embedding.path.starts_with('/') {
		embedding.path = format!("/{}", embedding.path);
	}
}
