use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, PaperchatService, Result, UpstreamKind, now_utc};
use paperchat_domain::{DocumentStatus, chunking};
use paperchat_storage::documents;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexReport {
	pub document_id: Uuid,
	pub chunks: usize,
}

impl PaperchatService {
	/// Builds the vector namespace for one stored document and marks it ready.
	///
	/// Runs from outbox jobs, so it looks the document up by id alone. Stale
	/// vectors from a previous attempt are dropped before the new upsert, which
	/// keeps retries idempotent.
	pub async fn index_document(&self, document_id: Uuid) -> Result<IndexReport> {
		let document = documents::get_document_by_id(&self.db.pool, document_id)
			.await?
			.ok_or_else(|| Error::NotFound {
				message: format!("Document {document_id} does not exist."),
			})?;
		let Some(blob_key) = document.blob_key.as_deref() else {
			return Err(Error::InvalidRequest {
				message: "Document has no stored blob to index.".to_string(),
			});
		};
		let bytes = self.blobs.read(blob_key).await.map_err(|err| match err {
			paperchat_storage::Error::NotFound(message) => Error::NotFound { message },
			err => Error::Upstream { which: UpstreamKind::Blob, message: err.to_string() },
		})?;
		let text = String::from_utf8(bytes).map_err(|_| Error::InvalidRequest {
			message: "Document content is not valid UTF-8 text.".to_string(),
		})?;
		let chunks =
			chunking::split_text(&text, self.cfg.chunking.max_chars, self.cfg.chunking.overlap_chars);

		if chunks.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Document produced no indexable text.".to_string(),
			});
		}

		let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
		let vectors = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &texts)
			.await
			.map_err(|err| Error::Upstream {
				which: UpstreamKind::Vector,
				message: err.to_string(),
			})?;

		if vectors.len() != chunks.len() {
			return Err(Error::Upstream {
				which: UpstreamKind::Vector,
				message: format!(
					"Embedding provider returned {} vectors for {} chunks.",
					vectors.len(),
					chunks.len()
				),
			});
		}
		if let Some(vector) = vectors.first()
			&& vector.len() != self.cfg.storage.qdrant.vector_dim as usize
		{
			return Err(Error::Upstream {
				which: UpstreamKind::Vector,
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		self.qdrant.delete_document_points(document_id).await?;
		self.qdrant.upsert_chunks(&document.owner_id, document_id, &chunks, &vectors).await?;

		documents::set_document_status(
			&self.db.pool,
			document_id,
			DocumentStatus::Ready.as_str(),
			now_utc(),
		)
		.await?;

		tracing::info!(
			document_id = %document_id,
			chunks = chunks.len(),
			"Document indexed and marked ready."
		);

		Ok(IndexReport { document_id, chunks: chunks.len() })
	}

	/// Marks the document failed after indexing gave up for good.
	pub async fn mark_indexing_failed(&self, document_id: Uuid, reason: &str) -> Result<()> {
		documents::set_document_failed(&self.db.pool, document_id, reason, now_utc()).await?;

		Ok(())
	}
}
