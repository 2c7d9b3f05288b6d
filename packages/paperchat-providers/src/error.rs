pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Provider request timed out.")]
	Timeout,
}
impl Error {
	/// Surfaces reqwest timeouts as their own variant so callers can report
	/// them distinctly from other transport failures.
	pub fn classify(err: reqwest::Error) -> Self {
		if err.is_timeout() { Self::Timeout } else { Self::Reqwest(err) }
	}
}
