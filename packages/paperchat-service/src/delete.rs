use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, PaperchatService, Result, require_owner};
use paperchat_storage::{blob::FsBlobStore, chat, documents, outbox};

/// Independent, idempotent stages of a full deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
	Metadata,
	Blob,
	Vector,
}
impl DeletionStep {
	pub const ALL: [Self; 3] = [Self::Metadata, Self::Blob, Self::Vector];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Metadata => "metadata",
			Self::Blob => "blob",
			Self::Vector => "vector",
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub owner_id: String,
	pub document_id: Uuid,
	/// Restricts the run to these steps. `None` runs all of them; a retry
	/// after a partial failure passes the failed subset.
	#[serde(default)]
	pub steps: Option<Vec<DeletionStep>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub document_id: Uuid,
	pub completed: Vec<DeletionStep>,
}

impl PaperchatService {
	/// Removes a document across all three stores.
	///
	/// Only the owner may delete. Every step runs even when an earlier one
	/// fails; failures are collected and reported together so the caller can
	/// retry exactly the residue. The blob key is derived from the owner and
	/// document ids, so a targeted retry still works after the metadata row is
	/// gone.
	pub async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
		let owner_id = require_owner(&req.owner_id)?.to_string();

		// A missing row is acceptable only on a targeted retry, where the
		// metadata step may already have completed; a row owned by someone
		// else never is.
		match documents::get_document_by_id(&self.db.pool, req.document_id).await? {
			Some(document) if document.owner_id != owner_id =>
				return Err(Error::NotFound {
					message: format!("Document {} does not exist.", req.document_id),
				}),
			None if req.steps.is_none() =>
				return Err(Error::NotFound {
					message: format!("Document {} does not exist.", req.document_id),
				}),
			_ => {},
		}

		let steps = match &req.steps {
			Some(steps) if steps.is_empty() =>
				return Err(Error::InvalidRequest {
					message: "At least one deletion step is required.".to_string(),
				}),
			Some(steps) => {
				let mut ordered = Vec::new();

				for step in DeletionStep::ALL {
					if steps.contains(&step) {
						ordered.push(step);
					}
				}

				ordered
			},
			None => DeletionStep::ALL.to_vec(),
		};
		let mut completed = Vec::new();
		let mut failed = Vec::new();

		for step in steps {
			let result = match step {
				DeletionStep::Metadata => self.delete_metadata(&owner_id, req.document_id).await,
				DeletionStep::Blob => self
					.blobs
					.delete(&FsBlobStore::key_for(&owner_id, req.document_id))
					.await
					.map(|_| ()),
				DeletionStep::Vector =>
					self.qdrant.delete_document_points(req.document_id).await,
			};

			match result {
				Ok(()) => completed.push(step),
				Err(err) => {
					tracing::error!(
						error = %err,
						document_id = %req.document_id,
						step = step.as_str(),
						"Deletion step failed."
					);
					failed.push(step);
				},
			}
		}

		if !failed.is_empty() {
			return Err(Error::PartialDeletion { failed });
		}

		self.streams.forget(req.document_id);

		tracing::info!(
			document_id = %req.document_id,
			owner_id = %owner_id,
			"Document deleted."
		);

		Ok(DeleteResponse { document_id: req.document_id, completed })
	}

	/// Chat log, pending outbox jobs, and the document row go in one
	/// transaction. Already-deleted rows are not an error.
	async fn delete_metadata(
		&self,
		owner_id: &str,
		document_id: Uuid,
	) -> paperchat_storage::Result<()> {
		let mut tx = self.db.pool.begin().await?;

		chat::delete_messages_for_document(&mut *tx, document_id).await?;
		outbox::delete_outbox_for_document(&mut *tx, document_id).await?;
		documents::delete_document_row(&mut *tx, owner_id, document_id).await?;
		tx.commit().await?;

		Ok(())
	}
}
