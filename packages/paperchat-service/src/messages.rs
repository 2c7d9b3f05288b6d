use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
	ChatSnapshot, Error, PaperchatService, Result, entry_from_record, require_owner,
};
use paperchat_domain::ChatEntry;
use paperchat_storage::{chat, documents};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListMessagesRequest {
	pub owner_id: String,
	pub document_id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListMessagesResponse {
	pub document_id: Uuid,
	pub entries: Vec<ChatEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscribeRequest {
	pub owner_id: String,
	pub document_id: Uuid,
}

impl PaperchatService {
	pub async fn list_messages(&self, req: ListMessagesRequest) -> Result<ListMessagesResponse> {
		let owner_id = require_owner(&req.owner_id)?;

		self.require_document(owner_id, req.document_id).await?;

		let records = chat::list_messages(&self.db.pool, req.document_id).await?;
		let entries = records.iter().map(entry_from_record).collect::<Result<Vec<_>>>()?;

		Ok(ListMessagesResponse { document_id: req.document_id, entries })
	}

	/// Live snapshot stream for one document's chat. The receiver starts at
	/// the current persisted log and then observes every append.
	pub async fn subscribe(&self, req: SubscribeRequest) -> Result<watch::Receiver<ChatSnapshot>> {
		let owner_id = require_owner(&req.owner_id)?;

		self.require_document(owner_id, req.document_id).await?;

		let records = chat::list_messages(&self.db.pool, req.document_id).await?;
		let entries = records.iter().map(entry_from_record).collect::<Result<Vec<_>>>()?;
		let mut receiver = self.streams.subscribe(req.document_id, ChatSnapshot { entries });

		// A snapshot published between the DB read and the subscription is
		// already in the channel; mark it unseen so the caller picks it up.
		receiver.mark_changed();

		Ok(receiver)
	}

	async fn require_document(&self, owner_id: &str, document_id: Uuid) -> Result<()> {
		documents::get_document(&self.db.pool, owner_id, document_id)
			.await?
			.map(|_| ())
			.ok_or_else(|| Error::NotFound {
				message: format!("Document {document_id} does not exist."),
			})
	}
}
