//! Bootstrap DDL. Statements are split on `;` by [`crate::db::Db::ensure_schema`],
//! so none of them may contain an embedded semicolon.

const DOCUMENTS: &str = "\
CREATE TABLE IF NOT EXISTS documents (
	document_id    uuid PRIMARY KEY,
	owner_id       text NOT NULL,
	name           text NOT NULL,
	mime_type      text NOT NULL,
	status         text NOT NULL,
	size_bytes     bigint NOT NULL DEFAULT 0,
	content_hash   text,
	blob_key       text,
	download_url   text,
	failure_reason text,
	created_at     timestamptz NOT NULL,
	updated_at     timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents (owner_id, created_at DESC);
";

const CHAT_MESSAGES: &str = "\
CREATE TABLE IF NOT EXISTS chat_messages (
	message_id  uuid PRIMARY KEY,
	document_id uuid NOT NULL,
	owner_id    text NOT NULL,
	role        text NOT NULL,
	body        text NOT NULL,
	seq         bigserial,
	created_at  timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_messages_document ON chat_messages (document_id, created_at ASC, seq ASC);
";

const INDEXING_OUTBOX: &str = "\
CREATE TABLE IF NOT EXISTS indexing_outbox (
	outbox_id    uuid PRIMARY KEY,
	document_id  uuid NOT NULL,
	op           text NOT NULL,
	status       text NOT NULL,
	attempts     int NOT NULL DEFAULT 0,
	last_error   text,
	available_at timestamptz NOT NULL,
	created_at   timestamptz NOT NULL,
	updated_at   timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_indexing_outbox_claim ON indexing_outbox (status, available_at ASC);
";

pub fn render_schema() -> String {
	[DOCUMENTS, CHAT_MESSAGES, INDEXING_OUTBOX].concat()
}
