pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structured kind + message errors; nothing else crosses the component
/// boundary. Degradable failures (one retrieval channel down) never surface
/// here, only as the `partial` response flag.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Embedding unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Retrieval error: {message}")]
	Retrieval { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}

impl Error {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::InvalidArgument { .. } => "invalid_argument",
			Self::NotFound { .. } => "not_found",
			Self::EmbeddingUnavailable { .. } => "embedding_unavailable",
			Self::Retrieval { .. } => "retrieval_error",
			Self::Timeout { .. } => "timeout",
			Self::Storage { .. } => "storage_error",
		}
	}

	/// Whether the caller may retry with backoff. Client errors and storage
	/// faults are not retryable as-is.
	pub fn retryable(&self) -> bool {
		matches!(
			self,
			Self::EmbeddingUnavailable { .. } | Self::Retrieval { .. } | Self::Timeout { .. }
		)
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<mercato_storage::Error> for Error {
	fn from(err: mercato_storage::Error) -> Self {
		match err {
			mercato_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			mercato_storage::Error::Qdrant(inner) => Self::Retrieval { message: inner.to_string() },
		}
	}
}

impl From<mercato_providers::Error> for Error {
	fn from(err: mercato_providers::Error) -> Self {
		match err {
			mercato_providers::Error::Timeout { message } => Self::Timeout { message },
			mercato_providers::Error::Unavailable { message }
			| mercato_providers::Error::InvalidResponse { message }
			| mercato_providers::Error::InvalidConfig { message } =>
				Self::EmbeddingUnavailable { message },
		}
	}
}

impl From<mercato_domain::InvalidHandle> for Error {
	fn from(err: mercato_domain::InvalidHandle) -> Self {
		Self::InvalidArgument { message: err.to_string() }
	}
}
