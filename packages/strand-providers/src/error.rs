#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error("Invalid header: {message}")]
	InvalidHeader { message: String },
	#[error("Invalid provider response: {message}")]
	InvalidResponse { message: String },
}
