pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
}

impl From<strand_storage::Error> for Error {
	fn from(err: strand_storage::Error) -> Self {
		match err {
			strand_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			strand_storage::Error::NotFound(message) => Self::NotFound { message },
			strand_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<strand_index::Error> for Error {
	fn from(err: strand_index::Error) -> Self {
		Self::Index { message: err.to_string() }
	}
}

impl From<strand_providers::Error> for Error {
	fn from(err: strand_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<strand_config::Error> for Error {
	fn from(err: strand_config::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
