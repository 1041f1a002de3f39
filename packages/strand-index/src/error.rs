pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Vector dimension must be greater than zero.")]
	ZeroDimension,
	#[error("Vector dimension mismatch: index expects {expected}, got {actual}.")]
	DimensionMismatch { expected: usize, actual: usize },
	#[error("Invalid vector: {message}")]
	InvalidVector { message: String },
}
