use serde_json::Map;

use crate::TestDatabase;
use paperchat_config::{
	BillingProviderConfig, Blobs, Chunking, CompletionProviderConfig, Config,
	EmbeddingProviderConfig, Indexing, Providers, Qdrant, Quota, Security, Service, Storage,
};

/// Full service configuration pointing at the test stores.
///
/// Provider endpoints are unroutable placeholders; tests that exercise the
/// answer pipeline inject stub providers instead of calling them. Quota and
/// chunking numbers are small so the limits are reachable in a few calls.
pub fn service_config(
	db: &TestDatabase,
	qdrant_url: &str,
	collection: String,
	blob_root: &str,
	vector_dim: u32,
) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: db.postgres(2),
			qdrant: Qdrant { url: qdrant_url.to_string(), collection, vector_dim },
			blobs: Blobs {
				root: blob_root.to_string(),
				public_base_url: "http://127.0.0.1:8080/blobs".to_string(),
				max_bytes: 1_048_576,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/".to_string(),
				model: "test".to_string(),
				dimensions: vector_dim,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			completion: CompletionProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/".to_string(),
				model: "test".to_string(),
				temperature: 0.1,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			billing: BillingProviderConfig {
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/plans".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		quota: Quota { free_limit: 2, pro_limit: 20 },
		chunking: Chunking { max_chars: 200, overlap_chars: 40 },
		indexing: Indexing {
			max_attempts: 3,
			poll_interval_ms: 50,
			lease_seconds: 30,
			retrieval_top_k: 4,
		},
		security: Security { bind_localhost_only: true, api_auth_token: None },
	}
}
