mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	BillingProviderConfig, Blobs, Chunking, CompletionProviderConfig, Config,
	EmbeddingProviderConfig, Indexing, Postgres, Providers, Qdrant, Quota, Security, Service,
	Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.storage.blobs.root.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.blobs.root must be non-empty.".to_string(),
		});
	}
	if cfg.storage.blobs.max_bytes == 0 {
		return Err(Error::Validation {
			message: "storage.blobs.max_bytes must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.quota.pro_limit <= cfg.quota.free_limit {
		return Err(Error::Validation {
			message: "quota.pro_limit must be greater than quota.free_limit.".to_string(),
		});
	}
	if cfg.chunking.max_chars == 0 {
		return Err(Error::Validation {
			message: "chunking.max_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_chars >= cfg.chunking.max_chars {
		return Err(Error::Validation {
			message: "chunking.overlap_chars must be less than chunking.max_chars.".to_string(),
		});
	}
	if cfg.indexing.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "indexing.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "indexing.lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.retrieval_top_k == 0 {
		return Err(Error::Validation {
			message: "indexing.retrieval_top_k must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("completion", &cfg.providers.completion.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	while cfg.storage.blobs.public_base_url.ends_with('/') {
		cfg.storage.blobs.public_base_url.pop();
	}
}
