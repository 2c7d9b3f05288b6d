use std::sync::Arc;

use paperchat_service::PaperchatService;
use paperchat_storage::{blob::FsBlobStore, db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PaperchatService>,
}
impl AppState {
	pub async fn new(config: paperchat_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let blobs = FsBlobStore::new(&config.storage.blobs).await?;
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = PaperchatService::new(config, db, blobs, qdrant);

		Ok(Self { service: Arc::new(service) })
	}
}
