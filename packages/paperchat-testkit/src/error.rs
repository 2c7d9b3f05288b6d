pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid Postgres DSN: {0}.")]
	BadDsn(String),

	#[error("No admin database accepted a connection: {0}.")]
	AdminConnect(String),

	#[error("Timed out deleting Qdrant collection {0:?}.")]
	QdrantTimeout(String),

	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),

	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
