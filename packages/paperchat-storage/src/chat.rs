use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::ChatMessageRecord};

pub async fn append_message<'e, E>(
	executor: E,
	message_id: Uuid,
	document_id: Uuid,
	owner_id: &str,
	role: &str,
	body: &str,
	now: OffsetDateTime,
) -> Result<ChatMessageRecord>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, ChatMessageRecord>(
		"\
INSERT INTO chat_messages (message_id, document_id, owner_id, role, body, created_at)
VALUES ($1,$2,$3,$4,$5,$6)
RETURNING message_id, document_id, owner_id, role, body, seq, created_at",
	)
	.bind(message_id)
	.bind(document_id)
	.bind(owner_id)
	.bind(role)
	.bind(body)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(row)
}

/// Full log for one document, oldest first. `seq` breaks ties between
/// messages sharing a timestamp so a question always precedes its answer.
pub async fn list_messages<'e, E>(executor: E, document_id: Uuid) -> Result<Vec<ChatMessageRecord>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ChatMessageRecord>(
		"\
SELECT message_id, document_id, owner_id, role, body, seq, created_at
FROM chat_messages
WHERE document_id = $1
ORDER BY created_at ASC, seq ASC",
	)
	.bind(document_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn count_human_messages<'e, E>(executor: E, document_id: Uuid) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM chat_messages WHERE document_id = $1 AND role = 'human'",
	)
	.bind(document_id)
	.fetch_one(executor)
	.await?;

	Ok(count as u64)
}

pub async fn delete_messages_for_document<'e, E>(executor: E, document_id: Uuid) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM chat_messages WHERE document_id = $1")
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}
