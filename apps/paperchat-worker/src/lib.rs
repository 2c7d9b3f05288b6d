pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paperchat_service::PaperchatService;
use paperchat_storage::{blob::FsBlobStore, db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = paperchat_cli::VERSION,
	rename_all = "kebab",
	styles = paperchat_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = paperchat_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let blobs = FsBlobStore::new(&config.storage.blobs).await?;
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let service = PaperchatService::new(config, db, blobs, qdrant);

	tracing::info!("Indexing worker started.");

	worker::run_worker(service).await
}
