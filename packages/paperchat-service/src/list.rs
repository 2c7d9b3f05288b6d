use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, PaperchatService, Result, require_owner};
use paperchat_domain::DocumentStatus;
use paperchat_storage::documents;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListRequest {
	pub owner_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
	pub document_id: Uuid,
	pub name: String,
	pub mime_type: String,
	pub status: DocumentStatus,
	pub size_bytes: i64,
	pub download_url: Option<String>,
	pub failure_reason: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
	pub documents: Vec<DocumentSummary>,
}

impl PaperchatService {
	/// Owner's documents, newest first.
	pub async fn list_documents(&self, req: ListRequest) -> Result<ListResponse> {
		let owner_id = require_owner(&req.owner_id)?;
		let records = documents::list_documents(&self.db.pool, owner_id).await?;
		let mut summaries = Vec::with_capacity(records.len());

		for record in records {
			let status = DocumentStatus::parse(&record.status).ok_or_else(|| Error::Storage {
				message: format!("Unknown persisted status {:?}.", record.status),
			})?;

			summaries.push(DocumentSummary {
				document_id: record.document_id,
				name: record.name,
				mime_type: record.mime_type,
				status,
				size_bytes: record.size_bytes,
				download_url: record.download_url,
				failure_reason: record.failure_reason,
				created_at: record.created_at,
			});
		}

		Ok(ListResponse { documents: summaries })
	}
}
