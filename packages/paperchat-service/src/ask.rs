use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Error, PaperchatService, Result, UpstreamKind, entry_from_record, now_utc, quota_policy,
	require_owner,
};
use paperchat_domain::{ChatEntry, DocumentStatus, Plan, Role, quota};
use paperchat_storage::{chat, documents};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskRequest {
	pub owner_id: String,
	pub document_id: Uuid,
	pub question: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskResponse {
	pub document_id: Uuid,
	pub human: ChatEntry,
	pub ai: ChatEntry,
}

impl PaperchatService {
	/// Admits, persists, and answers one question.
	///
	/// The quota check, the fresh human-message count, and the question insert
	/// run in one transaction holding the document row lock, so two racing
	/// submissions cannot both slip under the limit. The question is durable
	/// once the transaction commits; a completion failure afterwards surfaces
	/// as an error without retracting it.
	pub async fn ask(&self, req: AskRequest) -> Result<AskResponse> {
		let owner_id = require_owner(&req.owner_id)?.to_string();
		let question = req.question.trim().to_string();

		if question.is_empty() {
			return Err(Error::InvalidRequest { message: "Question is required.".to_string() });
		}

		let has_active_membership = self
			.providers
			.billing
			.get_plan(&self.cfg.providers.billing, &owner_id)
			.await
			.map_err(|err| Error::Upstream {
				which: UpstreamKind::Plan,
				message: err.to_string(),
			})?;
		let plan = Plan { has_active_membership };
		let policy = quota_policy(&self.cfg);

		let mut tx = self.db.pool.begin().await?;
		let document = documents::get_document_for_update(&mut *tx, &owner_id, req.document_id)
			.await?
			.ok_or_else(|| Error::NotFound {
				message: format!("Document {} does not exist.", req.document_id),
			})?;

		if document.status != DocumentStatus::Ready.as_str() {
			return Err(Error::InvalidRequest {
				message: format!("Document is not ready; status is {:?}.", document.status),
			});
		}

		let human_count = chat::count_human_messages(&mut *tx, req.document_id).await?;

		if let Err(denial) = quota::admit(human_count, plan, &policy) {
			return Err(Error::QuotaExceeded { denial });
		}

		let human = chat::append_message(
			&mut *tx,
			Uuid::new_v4(),
			req.document_id,
			&owner_id,
			Role::Human.as_str(),
			&question,
			now_utc(),
		)
		.await?;

		tx.commit().await?;

		self.publish_chat_snapshot(req.document_id).await?;

		let answer = self.answer(req.document_id, &question).await?;
		let ai = chat::append_message(
			&self.db.pool,
			Uuid::new_v4(),
			req.document_id,
			&owner_id,
			Role::Ai.as_str(),
			&answer,
			now_utc(),
		)
		.await?;

		self.publish_chat_snapshot(req.document_id).await?;

		tracing::info!(
			document_id = %req.document_id,
			owner_id = %owner_id,
			"Question answered."
		);

		Ok(AskResponse {
			document_id: req.document_id,
			human: entry_from_record(&human)?,
			ai: entry_from_record(&ai)?,
		})
	}

	/// Retrieval-augmented answer for a persisted question.
	async fn answer(&self, document_id: Uuid, question: &str) -> Result<String> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[question.to_string()])
			.await
			.map_err(|err| Error::Upstream {
				which: UpstreamKind::Vector,
				message: err.to_string(),
			})?;
		let Some(vector) = embeddings.into_iter().next() else {
			return Err(Error::Upstream {
				which: UpstreamKind::Vector,
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let context = self
			.qdrant
			.search_document(document_id, vector, self.cfg.indexing.retrieval_top_k)
			.await
			.map_err(|err| Error::Upstream {
				which: UpstreamKind::Vector,
				message: err.to_string(),
			})?;

		self.providers
			.completion
			.complete(&self.cfg.providers.completion, question, &context)
			.await
			.map_err(|err| Error::Upstream {
				which: UpstreamKind::Completion,
				message: err.to_string(),
			})
	}
}
