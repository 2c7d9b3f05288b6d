pub mod ask;
pub mod delete;
pub mod index;
pub mod list;
pub mod messages;
pub mod upload;

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};

use time::OffsetDateTime;
use tokio::sync::watch;
use uuid::Uuid;

pub use ask::{AskRequest, AskResponse};
pub use delete::{DeleteRequest, DeleteResponse, DeletionStep};
pub use index::IndexReport;
pub use list::{DocumentSummary, ListRequest, ListResponse};
pub use messages::{ListMessagesRequest, ListMessagesResponse, SubscribeRequest};
pub use upload::{UploadProgress, UploadRequest, UploadResponse};

use paperchat_config::Config;
use paperchat_domain::{ChatEntry, QuotaDenial, QuotaPolicy, Role};
use paperchat_providers::{billing, completion, embedding};
use paperchat_storage::{
	blob::FsBlobStore, db::Db, models::ChatMessageRecord, qdrant::QdrantStore,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which upstream collaborator failed while serving a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
	Blob,
	Log,
	Vector,
	Completion,
	Plan,
}
impl UpstreamKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Blob => "blob",
			Self::Log => "log",
			Self::Vector => "vector",
			Self::Completion => "completion",
			Self::Plan => "plan",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Caller is not authenticated.")]
	Unauthenticated,
	#[error("{message}")]
	NotFound { message: String },
	#[error("{denial}")]
	QuotaExceeded { denial: QuotaDenial },
	#[error("Upstream {} is unavailable: {message}", which.as_str())]
	Upstream { which: UpstreamKind, message: String },
	#[error("Deletion left residue; failed steps: {failed:?}.")]
	PartialDeletion { failed: Vec<DeletionStep> },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Vector store error: {message}")]
	Vector { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<paperchat_storage::Error> for Error {
	fn from(err: paperchat_storage::Error) -> Self {
		match err {
			paperchat_storage::Error::NotFound(message) => Self::NotFound { message },
			paperchat_storage::Error::Qdrant(err) => Self::Vector { message: err.to_string() },
			err => Self::Storage { message: err.to_string() },
		}
	}
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a paperchat_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, paperchat_providers::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a paperchat_config::CompletionProviderConfig,
		question: &'a str,
		context: &'a [String],
	) -> BoxFuture<'a, paperchat_providers::Result<String>>;
}

pub trait BillingProvider
where
	Self: Send + Sync,
{
	fn get_plan<'a>(
		&'a self,
		cfg: &'a paperchat_config::BillingProviderConfig,
		owner_id: &'a str,
	) -> BoxFuture<'a, paperchat_providers::Result<bool>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub billing: Arc<dyn BillingProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
		billing: Arc<dyn BillingProvider>,
	) -> Self {
		Self { embedding, completion, billing }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), completion: provider.clone(), billing: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a paperchat_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, paperchat_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a paperchat_config::CompletionProviderConfig,
		question: &'a str,
		context: &'a [String],
	) -> BoxFuture<'a, paperchat_providers::Result<String>> {
		Box::pin(completion::complete(cfg, question, context))
	}
}
impl BillingProvider for DefaultProviders {
	fn get_plan<'a>(
		&'a self,
		cfg: &'a paperchat_config::BillingProviderConfig,
		owner_id: &'a str,
	) -> BoxFuture<'a, paperchat_providers::Result<bool>> {
		Box::pin(billing::get_plan(cfg, owner_id))
	}
}

/// Full ordered chat log of one document, as pushed to live subscribers.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ChatSnapshot {
	pub entries: Vec<ChatEntry>,
}

/// Per-document broadcast of chat snapshots. Senders are kept alive for the
/// process so late subscribers immediately see the latest snapshot.
#[derive(Default)]
pub struct ChatStreams {
	senders: Mutex<HashMap<Uuid, watch::Sender<ChatSnapshot>>>,
}
impl ChatStreams {
	pub fn publish(&self, document_id: Uuid, snapshot: ChatSnapshot) {
		let mut senders = self.senders.lock().unwrap_or_else(|err| err.into_inner());
		let sender = senders.entry(document_id).or_insert_with(|| {
			let (tx, _) = watch::channel(ChatSnapshot::default());

			tx
		});

		sender.send_replace(snapshot);
	}

	pub fn subscribe(
		&self,
		document_id: Uuid,
		initial: ChatSnapshot,
	) -> watch::Receiver<ChatSnapshot> {
		let mut senders = self.senders.lock().unwrap_or_else(|err| err.into_inner());

		match senders.get(&document_id) {
			Some(sender) => sender.subscribe(),
			None => {
				let (tx, rx) = watch::channel(initial);

				senders.insert(document_id, tx);

				rx
			},
		}
	}

	pub fn forget(&self, document_id: Uuid) {
		let mut senders = self.senders.lock().unwrap_or_else(|err| err.into_inner());

		senders.remove(&document_id);
	}
}

pub struct PaperchatService {
	pub cfg: Config,
	pub db: Db,
	pub blobs: FsBlobStore,
	pub qdrant: QdrantStore,
	pub providers: Providers,
	pub streams: ChatStreams,
}
impl PaperchatService {
	pub fn new(cfg: Config, db: Db, blobs: FsBlobStore, qdrant: QdrantStore) -> Self {
		Self::with_providers(cfg, db, blobs, qdrant, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		blobs: FsBlobStore,
		qdrant: QdrantStore,
		providers: Providers,
	) -> Self {
		Self { cfg, db, blobs, qdrant, providers, streams: ChatStreams::default() }
	}

	pub(crate) async fn publish_chat_snapshot(&self, document_id: Uuid) -> Result<()> {
		let records = paperchat_storage::chat::list_messages(&self.db.pool, document_id).await?;
		let entries = records.iter().map(entry_from_record).collect::<Result<Vec<_>>>()?;

		self.streams.publish(document_id, ChatSnapshot { entries });

		Ok(())
	}
}

pub(crate) fn require_owner(owner_id: &str) -> Result<&str> {
	let trimmed = owner_id.trim();

	if trimmed.is_empty() {
		return Err(Error::Unauthenticated);
	}

	Ok(trimmed)
}

pub(crate) fn quota_policy(cfg: &Config) -> QuotaPolicy {
	QuotaPolicy { free_limit: cfg.quota.free_limit, pro_limit: cfg.quota.pro_limit }
}

pub(crate) fn entry_from_record(record: &ChatMessageRecord) -> Result<ChatEntry> {
	let role = Role::parse_persisted(&record.role).ok_or_else(|| Error::Storage {
		message: format!("Unknown persisted role {:?}.", record.role),
	})?;

	Ok(ChatEntry {
		id: Some(record.message_id),
		role,
		body: record.body.clone(),
		created_at: record.created_at,
	})
}

pub(crate) fn now_utc() -> OffsetDateTime {
	OffsetDateTime::now_utc()
}
