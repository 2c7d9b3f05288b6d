use std::{
	io::ErrorKind,
	path::{Path, PathBuf},
	pin::Pin,
};

use tokio::{
	fs,
	io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader},
	sync::watch,
};
use uuid::Uuid;

use crate::{Error, Result};

pub type BoxReader = Pin<Box<dyn AsyncRead + Send>>;

/// Outcome of one stored upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
	pub key: String,
	pub size_bytes: u64,
	pub content_hash: String,
}

/// Filesystem-backed blob store for raw document bytes.
///
/// Blobs are keyed `{owner_id}/{document_id}` so one owner's documents share a
/// directory. Writes go through a temp file and a rename, so a key never holds
/// a partially-written blob.
pub struct FsBlobStore {
	root: PathBuf,
	public_base_url: String,
	max_bytes: u64,
}
impl FsBlobStore {
	pub async fn new(cfg: &paperchat_config::Blobs) -> Result<Self> {
		let root = PathBuf::from(&cfg.root);

		fs::create_dir_all(&root).await?;
		fs::create_dir_all(root.join(".tmp")).await?;

		Ok(Self { root, public_base_url: cfg.public_base_url.clone(), max_bytes: cfg.max_bytes })
	}

	pub fn key_for(owner_id: &str, document_id: Uuid) -> String {
		format!("{owner_id}/{document_id}")
	}

	pub fn download_url(&self, key: &str) -> String {
		format!("{}/{key}", self.public_base_url)
	}

	fn blob_path(&self, key: &str) -> PathBuf {
		self.root.join(key)
	}

	fn temp_path(&self) -> PathBuf {
		self.root.join(".tmp").join(Uuid::new_v4().to_string())
	}

	/// Streams `reader` into the blob at `key`.
	///
	/// `total_bytes`, when known, drives the optional `progress` channel as a
	/// fraction in `[0, 1]`. The size cap is enforced while streaming so an
	/// oversized upload never lands on disk.
	pub async fn put_stream(
		&self,
		key: &str,
		mut reader: BoxReader,
		total_bytes: Option<u64>,
		progress: Option<&watch::Sender<f32>>,
	) -> Result<StoredBlob> {
		let temp_path = self.temp_path();
		let mut temp_file = fs::File::create(&temp_path).await?;
		let mut hasher = blake3::Hasher::new();
		let mut written: u64 = 0;
		let mut buf = vec![0_u8; 64 * 1024];

		loop {
			let n = match reader.read(&mut buf).await {
				Ok(n) => n,
				Err(err) => {
					drop(temp_file);

					let _ = fs::remove_file(&temp_path).await;

					return Err(err.into());
				},
			};

			if n == 0 {
				break;
			}

			written += n as u64;

			if written > self.max_bytes {
				drop(temp_file);

				let _ = fs::remove_file(&temp_path).await;

				return Err(Error::InvalidArgument(format!(
					"Blob exceeds the size cap of {} bytes.",
					self.max_bytes
				)));
			}

			hasher.update(&buf[..n]);
			temp_file.write_all(&buf[..n]).await?;

			if let (Some(progress), Some(total)) = (progress, total_bytes)
				&& total > 0
			{
				let _ = progress.send((written as f64 / total as f64).min(1.) as f32);
			}
		}

		temp_file.flush().await?;
		drop(temp_file);

		let blob_path = self.blob_path(key);

		if let Some(parent) = blob_path.parent() {
			fs::create_dir_all(parent).await?;
		}
		if let Err(err) = fs::rename(&temp_path, &blob_path).await {
			let _ = fs::remove_file(&temp_path).await;

			return Err(err.into());
		}
		if let Some(progress) = progress {
			let _ = progress.send(1.);
		}

		Ok(StoredBlob {
			key: key.to_string(),
			size_bytes: written,
			content_hash: hasher.finalize().to_hex().to_string(),
		})
	}

	pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
		match fs::read(self.blob_path(key)).await {
			Ok(bytes) => Ok(bytes),
			Err(err) if err.kind() == ErrorKind::NotFound =>
				Err(Error::NotFound(format!("Blob {key} does not exist."))),
			Err(err) => Err(err.into()),
		}
	}

	pub async fn open(&self, key: &str) -> Result<BoxReader> {
		match fs::File::open(self.blob_path(key)).await {
			Ok(file) => Ok(Box::pin(BufReader::new(file))),
			Err(err) if err.kind() == ErrorKind::NotFound =>
				Err(Error::NotFound(format!("Blob {key} does not exist."))),
			Err(err) => Err(err.into()),
		}
	}

	/// Removes the blob at `key`. Returns `false` when it was already gone, so
	/// deletion retries stay idempotent.
	pub async fn delete(&self, key: &str) -> Result<bool> {
		match fs::remove_file(self.blob_path(key)).await {
			Ok(()) => {
				// Best-effort cleanup of the now-possibly-empty owner directory.
				if let Some(parent) = self.blob_path(key).parent()
					&& parent != self.root.as_path()
				{
					let _ = fs::remove_dir(parent).await;
				}

				Ok(true)
			},
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}
}
