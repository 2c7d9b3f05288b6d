mod config;
mod error;

pub use config::service_config;
pub use error::{Error, Result};

use std::{collections::HashSet, env, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

pub fn env_dsn() -> Option<String> {
	env::var("PAPERCHAT_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("PAPERCHAT_QDRANT_URL").ok()
}

/// Both external store endpoints, or `None` when either is unset. Tests that
/// need Postgres and Qdrant gate on this and skip otherwise.
pub struct TestEnv {
	pub pg_dsn: String,
	pub qdrant_url: String,
}
impl TestEnv {
	pub fn from_env() -> Option<Self> {
		Some(Self { pg_dsn: env_dsn()?, qdrant_url: env_qdrant_url()? })
	}
}

/// One throwaway Postgres database named `paperchat_test_<uuid>`.
///
/// Dropped again on [`TestDatabase::cleanup`], together with every Qdrant
/// collection handed out through [`TestDatabase::collection_name`]. A test
/// that panics before cleanup still tears down via `Drop`.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	torn_down: bool,
	collections: Mutex<HashSet<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base: PgConnectOptions = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::BadDsn(err.to_string()))?;
		let (admin, mut conn) = admin_connection(&base).await?;
		let name = format!("paperchat_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, torn_down: false, collections: Mutex::new(HashSet::new()) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn postgres(&self, pool_max_conns: u32) -> paperchat_config::Postgres {
		paperchat_config::Postgres { dsn: self.dsn.clone(), pool_max_conns }
	}

	/// Unique per-database collection name, registered for teardown.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);

		self.collections
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(collection.clone());

		collection
	}

	pub async fn cleanup(mut self) -> Result<()> {
		let result = teardown(&self.name, &self.admin, &self.tracked_collections()).await;

		self.torn_down = true;

		result
	}

	fn tracked_collections(&self) -> Vec<String> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner()).iter().cloned().collect()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.torn_down {
			return;
		}

		let name = self.name.clone();
		let admin = self.admin.clone();
		let collections = self.tracked_collections();
		// Teardown needs a runtime of its own; the test's runtime cannot be
		// re-entered from drop.
		let cleanup = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test teardown runtime unavailable: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(teardown(&name, &admin, &collections)) {
				eprintln!("Test teardown failed for {name}: {err}");
			}
		});
		let _ = cleanup.join();
	}
}

async fn admin_connection(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last = None;

	for database in ["postgres", "template1"] {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last = Some(err),
		}
	}

	Err(Error::AdminConnect(format!("{last:?}")))
}

async fn teardown(name: &str, admin: &PgConnectOptions, collections: &[String]) -> Result<()> {
	let qdrant_result = drop_collections(collections).await;
	let mut conn = PgConnection::connect_with(admin).await?;

	// Kick lingering pool connections off the database before dropping it.
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await?;

	qdrant_result
}

async fn drop_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set PAPERCHAT_QDRANT_URL to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url).build()?;

	for collection in collections {
		let mut last = None;

		for _ in 0..5 {
			match time::timeout(
				Duration::from_secs(10),
				client.delete_collection(collection.clone()),
			)
			.await
			{
				Ok(Ok(_)) => {
					last = None;

					break;
				},
				// A collection a test registered but never created is fine.
				Ok(Err(err)) if is_missing_collection(&err) => {
					last = None;

					break;
				},
				Ok(Err(err)) => last = Some(Error::from(err)),
				Err(_) => last = Some(Error::QdrantTimeout(collection.clone())),
			}

			time::sleep(Duration::from_millis(250)).await;
		}

		if let Some(err) = last {
			return Err(err);
		}
	}

	Ok(())
}

fn is_missing_collection(err: &qdrant_client::QdrantError) -> bool {
	let message = err.to_string().to_lowercase();

	message.contains("not found") || message.contains("doesn't exist")
}
