pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Embedding call timed out: {message}")]
	Timeout { message: String },
	#[error("Embedding provider unavailable: {message}")]
	Unavailable { message: String },
	#[error("Invalid embedding response: {message}")]
	InvalidResponse { message: String },
	#[error("Invalid provider config: {message}")]
	InvalidConfig { message: String },
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			Self::Timeout { message: err.to_string() }
		} else if err.is_decode() {
			Self::InvalidResponse { message: err.to_string() }
		} else {
			Self::Unavailable { message: err.to_string() }
		}
	}
}

impl From<reqwest::header::InvalidHeaderName> for Error {
	fn from(err: reqwest::header::InvalidHeaderName) -> Self {
		Self::InvalidConfig { message: err.to_string() }
	}
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
	fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
		Self::InvalidConfig { message: err.to_string() }
	}
}
