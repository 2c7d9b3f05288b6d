use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{Error, PaperchatService, Result, UpstreamKind, now_utc, require_owner};
use paperchat_domain::DocumentStatus;
use paperchat_storage::{
	blob::{FsBlobStore, StoredBlob},
	documents,
	models::DocumentRecord,
	outbox,
};

/// Phases reported to the uploading client, in order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum UploadProgress {
	Uploading { fraction: f32 },
	Uploaded,
	Saving,
	Generating,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadRequest {
	pub owner_id: String,
	pub name: String,
	pub mime_type: String,
	pub data: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResponse {
	pub document_id: Uuid,
	pub status: DocumentStatus,
	pub download_url: String,
}

impl PaperchatService {
	/// Accepts raw document bytes and walks the record through
	/// `uploading -> uploaded -> saving -> generating`. Indexing finishes
	/// asynchronously via the outbox; `ready` is set by the index worker.
	pub async fn upload(
		&self,
		req: UploadRequest,
		progress: Option<&watch::Sender<UploadProgress>>,
	) -> Result<UploadResponse> {
		let owner_id = require_owner(&req.owner_id)?.to_string();
		let name = req.name.trim();

		if name.is_empty() {
			return Err(Error::InvalidRequest { message: "Document name is required.".to_string() });
		}
		if req.mime_type.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "MIME type is required.".to_string() });
		}
		if req.data.is_empty() {
			return Err(Error::InvalidRequest { message: "Document is empty.".to_string() });
		}

		let now = now_utc();
		let document_id = Uuid::new_v4();
		let record = DocumentRecord {
			document_id,
			owner_id: owner_id.clone(),
			name: name.to_string(),
			mime_type: req.mime_type.trim().to_string(),
			status: DocumentStatus::Uploading.as_str().to_string(),
			size_bytes: 0,
			content_hash: None,
			blob_key: None,
			download_url: None,
			failure_reason: None,
			created_at: now,
			updated_at: now,
		};

		documents::insert_document(&self.db.pool, &record).await?;

		if let Some(progress) = progress {
			let _ = progress.send(UploadProgress::Uploading { fraction: 0. });
		}

		let key = FsBlobStore::key_for(&owner_id, document_id);
		let total = req.data.len() as u64;
		let (fraction_tx, fraction_rx) = watch::channel(0_f32);
		let forwarder = progress.map(|progress| {
			let progress = progress.clone();
			let mut fraction_rx = fraction_rx;

			tokio::spawn(async move {
				while fraction_rx.changed().await.is_ok() {
					let fraction = *fraction_rx.borrow_and_update();
					let _ = progress.send(UploadProgress::Uploading { fraction });
				}
			})
		});
		let stored = self
			.blobs
			.put_stream(
				&key,
				Box::pin(std::io::Cursor::new(req.data)),
				Some(total),
				Some(&fraction_tx),
			)
			.await;

		drop(fraction_tx);

		if let Some(forwarder) = forwarder {
			let _ = forwarder.await;
		}

		let stored = match stored {
			Ok(stored) => stored,
			Err(paperchat_storage::Error::InvalidArgument(message)) => {
				self.fail_upload(document_id, &message).await;

				return Err(Error::InvalidRequest { message });
			},
			Err(err) => {
				let message = err.to_string();

				self.fail_upload(document_id, &message).await;

				return Err(Error::Upstream { which: UpstreamKind::Blob, message });
			},
		};

		let download_url = self.blobs.download_url(&key);

		// A metadata failure past this point still marks the document failed;
		// the stored blob alone must not leave it stuck mid-lifecycle.
		if let Err(err) = self.finalize_upload(document_id, &stored, &download_url, progress).await {
			self.fail_upload(document_id, &err.to_string()).await;

			return Err(err);
		}

		tracing::info!(
			document_id = %document_id,
			owner_id = %owner_id,
			size_bytes = stored.size_bytes,
			"Document stored; indexing enqueued."
		);

		Ok(UploadResponse { document_id, status: DocumentStatus::Generating, download_url })
	}

	/// Walks the stored document from `uploaded` through `generating` and
	/// enqueues indexing.
	async fn finalize_upload(
		&self,
		document_id: Uuid,
		stored: &StoredBlob,
		download_url: &str,
		progress: Option<&watch::Sender<UploadProgress>>,
	) -> Result<()> {
		documents::set_document_status(
			&self.db.pool,
			document_id,
			DocumentStatus::Uploaded.as_str(),
			now_utc(),
		)
		.await?;

		if let Some(progress) = progress {
			let _ = progress.send(UploadProgress::Uploaded);
		}

		documents::set_document_status(
			&self.db.pool,
			document_id,
			DocumentStatus::Saving.as_str(),
			now_utc(),
		)
		.await?;

		if let Some(progress) = progress {
			let _ = progress.send(UploadProgress::Saving);
		}

		documents::set_document_blob(
			&self.db.pool,
			document_id,
			stored.size_bytes as i64,
			&stored.content_hash,
			&stored.key,
			download_url,
			now_utc(),
		)
		.await?;

		// Metadata and the indexing job land together so a saved document is
		// always picked up by the worker.
		let mut tx = self.db.pool.begin().await?;

		documents::set_document_status(
			&mut *tx,
			document_id,
			DocumentStatus::Generating.as_str(),
			now_utc(),
		)
		.await?;
		outbox::enqueue_indexing(&mut *tx, document_id, now_utc()).await?;
		tx.commit().await?;

		if let Some(progress) = progress {
			let _ = progress.send(UploadProgress::Generating);
		}

		Ok(())
	}

	async fn fail_upload(&self, document_id: Uuid, reason: &str) {
		if let Err(err) =
			documents::set_document_failed(&self.db.pool, document_id, reason, now_utc()).await
		{
			tracing::error!(
				error = %err,
				document_id = %document_id,
				"Failed to mark document as failed."
			);
		}
	}
}
