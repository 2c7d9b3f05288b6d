use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct DocumentRecord {
	pub document_id: Uuid,
	pub owner_id: String,
	pub name: String,
	pub mime_type: String,
	pub status: String,
	pub size_bytes: i64,
	pub content_hash: Option<String>,
	pub blob_key: Option<String>,
	pub download_url: Option<String>,
	pub failure_reason: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChatMessageRecord {
	pub message_id: Uuid,
	pub document_id: Uuid,
	pub owner_id: String,
	pub role: String,
	pub body: String,
	pub seq: i64,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct IndexingOutboxEntry {
	pub outbox_id: Uuid,
	pub document_id: Uuid,
	pub op: String,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
