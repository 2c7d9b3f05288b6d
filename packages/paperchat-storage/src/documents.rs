use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::DocumentRecord};

pub async fn insert_document<'e, E>(executor: E, doc: &DocumentRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO documents (
\tdocument_id,
\towner_id,
\tname,
\tmime_type,
\tstatus,
\tsize_bytes,
\tcontent_hash,
\tblob_key,
\tdownload_url,
\tfailure_reason,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
	)
	.bind(doc.document_id)
	.bind(doc.owner_id.as_str())
	.bind(doc.name.as_str())
	.bind(doc.mime_type.as_str())
	.bind(doc.status.as_str())
	.bind(doc.size_bytes)
	.bind(doc.content_hash.as_deref())
	.bind(doc.blob_key.as_deref())
	.bind(doc.download_url.as_deref())
	.bind(doc.failure_reason.as_deref())
	.bind(doc.created_at)
	.bind(doc.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_document<'e, E>(
	executor: E,
	owner_id: &str,
	document_id: Uuid,
) -> Result<Option<DocumentRecord>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, DocumentRecord>(
		"\
SELECT
\tdocument_id,
\towner_id,
\tname,
\tmime_type,
\tstatus,
\tsize_bytes,
\tcontent_hash,
\tblob_key,
\tdownload_url,
\tfailure_reason,
\tcreated_at,
\tupdated_at
FROM documents
WHERE owner_id = $1 AND document_id = $2
LIMIT 1",
	)
	.bind(owner_id)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Owner-agnostic lookup for the indexing path, which works from outbox jobs
/// rather than authenticated requests.
pub async fn get_document_by_id<'e, E>(
	executor: E,
	document_id: Uuid,
) -> Result<Option<DocumentRecord>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, DocumentRecord>(
		"\
SELECT
\tdocument_id,
\towner_id,
\tname,
\tmime_type,
\tstatus,
\tsize_bytes,
\tcontent_hash,
\tblob_key,
\tdownload_url,
\tfailure_reason,
\tcreated_at,
\tupdated_at
FROM documents
WHERE document_id = $1
LIMIT 1",
	)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Locks the document row for the duration of the surrounding transaction.
/// Quota admission reads the human-message count under this lock.
pub async fn get_document_for_update<'e, E>(
	executor: E,
	owner_id: &str,
	document_id: Uuid,
) -> Result<Option<DocumentRecord>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, DocumentRecord>(
		"\
SELECT
\tdocument_id,
\towner_id,
\tname,
\tmime_type,
\tstatus,
\tsize_bytes,
\tcontent_hash,
\tblob_key,
\tdownload_url,
\tfailure_reason,
\tcreated_at,
\tupdated_at
FROM documents
WHERE owner_id = $1 AND document_id = $2
LIMIT 1
FOR UPDATE",
	)
	.bind(owner_id)
	.bind(document_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn list_documents<'e, E>(executor: E, owner_id: &str) -> Result<Vec<DocumentRecord>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, DocumentRecord>(
		"\
SELECT
\tdocument_id,
\towner_id,
\tname,
\tmime_type,
\tstatus,
\tsize_bytes,
\tcontent_hash,
\tblob_key,
\tdownload_url,
\tfailure_reason,
\tcreated_at,
\tupdated_at
FROM documents
WHERE owner_id = $1
ORDER BY created_at DESC",
	)
	.bind(owner_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn set_document_status<'e, E>(
	executor: E,
	document_id: Uuid,
	status: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE documents SET status = $1, updated_at = $2 WHERE document_id = $3")
		.bind(status)
		.bind(now)
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn set_document_failed<'e, E>(
	executor: E,
	document_id: Uuid,
	reason: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE documents
SET status = 'failed', failure_reason = $1, updated_at = $2
WHERE document_id = $3",
	)
	.bind(reason)
	.bind(now)
	.bind(document_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn set_document_blob<'e, E>(
	executor: E,
	document_id: Uuid,
	size_bytes: i64,
	content_hash: &str,
	blob_key: &str,
	download_url: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE documents
SET size_bytes = $1,
\tcontent_hash = $2,
\tblob_key = $3,
\tdownload_url = $4,
\tupdated_at = $5
WHERE document_id = $6",
	)
	.bind(size_bytes)
	.bind(content_hash)
	.bind(blob_key)
	.bind(download_url)
	.bind(now)
	.bind(document_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Removes the metadata row. Returns `false` when the row was already gone.
pub async fn delete_document_row<'e, E>(
	executor: E,
	owner_id: &str,
	document_id: Uuid,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM documents WHERE owner_id = $1 AND document_id = $2")
		.bind(owner_id)
		.bind(document_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}
